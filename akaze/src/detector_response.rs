use crate::{derivatives, evolution::EvolutionStep, image::GrayFloatImage, Akaze};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

impl Akaze {
    /// Size of the derivative filters for `evolution`, in pixels of its octave.
    pub(crate) fn derivative_sigma(&self, evolution: &EvolutionStep) -> f64 {
        (evolution.esigma * self.derivative_factor / evolution.ratio()).round()
    }

    fn compute_multiscale_derivatives(&self, evolutions: &mut [EvolutionStep]) {
        let process_evolution = |evolution: &mut EvolutionStep| {
            let sigma_size = self.derivative_sigma(evolution) as u32;
            compute_multiscale_derivatives_for_evolution(evolution, sigma_size);
        };
        #[cfg(not(feature = "rayon"))]
        for evolution in evolutions.iter_mut() {
            process_evolution(evolution);
        }
        #[cfg(feature = "rayon")]
        evolutions.into_par_iter().for_each(process_evolution);
    }

    /// Computes the scale normalized determinant of the Hessian of every evolution into its `det`.
    pub fn detector_response(&self, evolutions: &mut [EvolutionStep]) {
        self.compute_multiscale_derivatives(evolutions);
        let process_evolution = |evolution: &mut EvolutionStep| {
            let sigma_size_quat = self.derivative_sigma(evolution).powi(4) as f32;
            let mut det = GrayFloatImage::new(evolution.lxx.width(), evolution.lxx.height());
            for (((d, &xx), &yy), &xy) in det
                .iter_mut()
                .zip(evolution.lxx.as_raw().iter())
                .zip(evolution.lyy.as_raw().iter())
                .zip(evolution.lxy.as_raw().iter())
            {
                *d = (xx * yy - xy * xy) * sigma_size_quat;
            }
            evolution.det = det;
        };
        #[cfg(not(feature = "rayon"))]
        for evolution in evolutions.iter_mut() {
            process_evolution(evolution);
        }
        #[cfg(feature = "rayon")]
        evolutions.into_par_iter().for_each(process_evolution);
    }
}

fn compute_multiscale_derivatives_for_evolution(evolution: &mut EvolutionStep, sigma_size: u32) {
    #[cfg(not(feature = "rayon"))]
    {
        evolution.lx = derivatives::scharr_horizontal(&evolution.smooth, sigma_size);
        evolution.ly = derivatives::scharr_vertical(&evolution.smooth, sigma_size);
        evolution.lxx = derivatives::scharr_horizontal(&evolution.lx, sigma_size);
        evolution.lyy = derivatives::scharr_vertical(&evolution.ly, sigma_size);
        evolution.lxy = derivatives::scharr_vertical(&evolution.lx, sigma_size);
    }
    #[cfg(feature = "rayon")]
    {
        (evolution.lx, evolution.ly) = rayon::join(
            || derivatives::scharr_horizontal(&evolution.smooth, sigma_size),
            || derivatives::scharr_vertical(&evolution.smooth, sigma_size),
        );
        (evolution.lxx, (evolution.lyy, evolution.lxy)) = rayon::join(
            || derivatives::scharr_horizontal(&evolution.lx, sigma_size),
            || {
                rayon::join(
                    || derivatives::scharr_vertical(&evolution.ly, sigma_size),
                    || derivatives::scharr_vertical(&evolution.lx, sigma_size),
                )
            },
        );
    }
}
