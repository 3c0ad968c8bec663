//! Fast Explicit Diffusion time steps.
//!
//! FED reaches a diffusion stopping time with a cycle of explicit steps of varying size. Some of
//! the steps exceed the stability limit of a plain explicit scheme, but the cycle as a whole is
//! stable. The step sizes follow Grewenig et al., "From box filtering to fast explicit diffusion".

use core::f64::consts::PI;

/// Step sizes that reach `total_time` in `cycles` equal cycles.
///
/// `tau_max` is the stability limit of the explicit scheme. With `reordering` the steps of a cycle
/// are permuted so large and small steps alternate, which limits the growth of rounding errors.
pub fn fed_tau_by_process_time(
    total_time: f64,
    cycles: u32,
    tau_max: f64,
    reordering: bool,
) -> Vec<f64> {
    fed_tau_by_cycle_time(total_time / f64::from(cycles.max(1)), tau_max, reordering)
}

fn fed_tau_by_cycle_time(cycle_time: f64, tau_max: f64, reordering: bool) -> Vec<f64> {
    if !(cycle_time > 0.0) {
        return vec![];
    }
    let n = ((3.0 * cycle_time / tau_max + 0.25).sqrt() - 0.5 - 1.0e-8).ceil() as usize;
    let scale = 3.0 * cycle_time / (tau_max * (n * (n + 1)) as f64);
    fed_tau(n, scale, tau_max, reordering)
}

fn fed_tau(n: usize, scale: f64, tau_max: f64, reordering: bool) -> Vec<f64> {
    let c = 1.0 / (4.0 * n as f64 + 2.0);
    let d = scale * tau_max / 2.0;
    let tau: Vec<f64> = (0..n)
        .map(|k| {
            let h = (PI * (2.0 * k as f64 + 1.0) * c).cos();
            d / (h * h)
        })
        .collect();
    let kappa = n / 2;
    if !reordering || kappa == 0 {
        return tau;
    }
    // Kappa cycle modulo the smallest prime above n.
    let prime = (n as u64 + 1..)
        .find(|&p| primal::is_prime(p))
        .unwrap_or(n as u64 + 1) as usize;
    let mut reordered = Vec::with_capacity(n);
    let mut k = 0;
    while reordered.len() < n {
        let index = ((k + 1) * kappa) % prime;
        k += 1;
        if (1..=n).contains(&index) {
            reordered.push(tau[index - 1]);
        }
    }
    reordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_sum_to_process_time() {
        for &time in &[0.5, 2.3, 10.24, 40.0] {
            let steps = fed_tau_by_process_time(time, 1, 0.25, true);
            assert!(!steps.is_empty());
            approx::assert_relative_eq!(steps.iter().sum::<f64>(), time, max_relative = 1e-9);
        }
    }

    #[test]
    fn reordering_is_a_permutation() {
        let mut plain = fed_tau_by_process_time(10.24, 1, 0.25, false);
        let mut reordered = fed_tau_by_process_time(10.24, 1, 0.25, true);
        assert_ne!(plain, reordered);
        plain.sort_by(|a, b| a.total_cmp(b));
        reordered.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(plain, reordered);
    }

    #[test]
    fn no_time_means_no_steps() {
        assert!(fed_tau_by_process_time(0.0, 1, 0.25, true).is_empty());
    }
}
