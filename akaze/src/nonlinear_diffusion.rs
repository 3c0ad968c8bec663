use crate::{EvolutionStep, GrayFloatImage};

/// One explicit step of nonlinear diffusion applied to `evolution.lt` in place.
///
/// Forward Euler on the 3x3 stencil of `dL/dt = div(c * grad L)`, with the conductivity `c` taken
/// from `evolution.flow`. The flux between two neighbors uses the mean of their conductivities,
/// so whatever leaves one pixel enters the other and the image mean is preserved.
pub fn diffusion_step(evolution: &mut EvolutionStep, step_size: f32) {
    let width = evolution.lt.width();
    let height = evolution.lt.height();
    let conductivity = evolution.flow.as_raw();
    let intensity = evolution.lt.as_raw();
    let mut delta = vec![0f32; width * height];
    let mut exchange = |a: usize, b: usize| {
        let flux = 0.5 * step_size * (conductivity[a] + conductivity[b]) * (intensity[b] - intensity[a]);
        delta[a] += flux;
        delta[b] -= flux;
    };
    for y in 0..height {
        for x in 1..width {
            let i = y * width + x;
            exchange(i - 1, i);
        }
    }
    for y in 1..height {
        for x in 0..width {
            let i = y * width + x;
            exchange(i - width, i);
        }
    }
    for (value, change) in evolution.lt.iter_mut().zip(delta) {
        *value += change;
    }
}

/// Perona-Malik conductivity `g2 = 1 / (1 + |grad L|^2 / k^2)`.
pub fn pm_g2(lx: &GrayFloatImage, ly: &GrayFloatImage, k: f64) -> GrayFloatImage {
    debug_assert_eq!(lx.dimensions(), ly.dimensions());
    let inverse_k = (1.0 / (k * k)) as f32;
    let mut conductivity = GrayFloatImage::new(lx.width(), lx.height());
    for ((c, &x), &y) in conductivity
        .iter_mut()
        .zip(lx.as_raw().iter())
        .zip(ly.as_raw().iter())
    {
        *c = 1.0 / (1.0 + inverse_k * (x * x + y * y));
    }
    conductivity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Akaze;

    fn step_with(lt: GrayFloatImage, flow: GrayFloatImage) -> EvolutionStep {
        let mut evolution = Akaze::default()
            .allocate_evolutions(40, 40)
            .swap_remove(0);
        evolution.lt = lt;
        evolution.flow = flow;
        evolution
    }

    #[test]
    fn diffusion_preserves_mean_and_smooths() {
        let spike = GrayFloatImage::from_fn(40, 40, |x, y| if (x, y) == (20, 20) { 1.0 } else { 0.0 });
        let mut evolution = step_with(spike, GrayFloatImage::from_fn(40, 40, |_, _| 1.0));
        diffusion_step(&mut evolution, 0.2);
        let sum: f32 = evolution.lt.iter().sum();
        approx::assert_relative_eq!(sum, 1.0, max_relative = 1e-5);
        approx::assert_relative_eq!(evolution.lt.get(20, 20), 1.0 - 4.0 * 0.2);
        approx::assert_relative_eq!(evolution.lt.get(21, 20), 0.2);
    }

    #[test]
    fn zero_conductivity_blocks_diffusion() {
        let spike = GrayFloatImage::from_fn(40, 40, |x, _| if x < 20 { 1.0 } else { 0.0 });
        let mut evolution = step_with(spike.clone(), GrayFloatImage::new(40, 40));
        diffusion_step(&mut evolution, 0.25);
        assert_eq!(evolution.lt.as_raw(), spike.as_raw());
    }

    #[test]
    fn conductivity_drops_at_strong_gradients() {
        let lx = GrayFloatImage::from_fn(2, 1, |x, _| x as f32);
        let ly = GrayFloatImage::new(2, 1);
        let c = pm_g2(&lx, &ly, 0.5);
        assert_eq!(c.get(0, 0), 1.0);
        approx::assert_relative_eq!(c.get(1, 0), 0.2);
    }
}
