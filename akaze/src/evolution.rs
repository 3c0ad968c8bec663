use crate::{fed_tau, Akaze, GrayFloatImage};
use log::*;

/// Images smaller than this on either side carry no detectable structure at the coarsest scale
/// the detector uses, so no evolution is built for them.
pub const MIN_EVOLUTION_SIZE: usize = 40;

/// One level of the nonlinear scale space.
#[derive(Debug)]
pub struct EvolutionStep {
    /// Evolution time.
    pub etime: f64,
    /// Evolution sigma. For linear diffusion `t = sigma^2 / 2`.
    pub esigma: f64,
    pub octave: u32,
    /// Sublevel within the octave.
    pub sublevel: u32,
    /// The diffused image.
    pub lt: GrayFloatImage,
    /// Gaussian smoothed copy of `lt`, the input of every derivative.
    pub smooth: GrayFloatImage,
    pub lx: GrayFloatImage,
    pub ly: GrayFloatImage,
    pub lxx: GrayFloatImage,
    pub lyy: GrayFloatImage,
    pub lxy: GrayFloatImage,
    /// Conductivity of the diffusion.
    pub flow: GrayFloatImage,
    /// Determinant of the Hessian, the detector response.
    pub det: GrayFloatImage,
    /// FED step sizes leading from the previous evolution to this one.
    pub fed_tau_steps: Vec<f64>,
}

impl EvolutionStep {
    fn new(octave: u32, sublevel: u32, options: &Akaze) -> Self {
        let exponent = f64::from(sublevel) / f64::from(options.num_sublevels) + f64::from(octave);
        let esigma = options.base_scale_offset * 2.0f64.powf(exponent);
        Self {
            etime: 0.5 * esigma * esigma,
            esigma,
            octave,
            sublevel,
            lt: GrayFloatImage::new(0, 0),
            smooth: GrayFloatImage::new(0, 0),
            lx: GrayFloatImage::new(0, 0),
            ly: GrayFloatImage::new(0, 0),
            lxx: GrayFloatImage::new(0, 0),
            lyy: GrayFloatImage::new(0, 0),
            lxy: GrayFloatImage::new(0, 0),
            flow: GrayFloatImage::new(0, 0),
            det: GrayFloatImage::new(0, 0),
            fed_tau_steps: vec![],
        }
    }

    /// Ratio between full resolution pixels and pixels of this evolution.
    pub fn ratio(&self) -> f64 {
        f64::from(1u32 << self.octave)
    }
}

impl Akaze {
    /// Lays out the evolutions of the scale space for an image of the given size.
    ///
    /// Octaves stop once their smaller side drops under [`MIN_EVOLUTION_SIZE`]. Octaves with a
    /// smaller side under twice that hold a single sublevel. The result is empty when the image
    /// itself is too small.
    pub fn allocate_evolutions(&self, width: usize, height: usize) -> Vec<EvolutionStep> {
        let mut evolutions: Vec<EvolutionStep> = (0..self.max_octave_evolution)
            .map_while(|octave| {
                let smallest = width.min(height) >> octave;
                if smallest < MIN_EVOLUTION_SIZE {
                    return None;
                }
                let sublevels = if smallest < 2 * MIN_EVOLUTION_SIZE {
                    1
                } else {
                    self.num_sublevels
                };
                Some(
                    (0..sublevels).map(move |sublevel| EvolutionStep::new(octave, sublevel, self)),
                )
            })
            .flatten()
            .collect();
        for i in 1..evolutions.len() {
            let ttime = evolutions[i].etime - evolutions[i - 1].etime;
            evolutions[i].fed_tau_steps = fed_tau::fed_tau_by_process_time(ttime, 1, 0.25, true);
            trace!(
                "{} FED steps in evolution {}",
                evolutions[i].fed_tau_steps.len(),
                i
            );
        }
        evolutions
    }
}
