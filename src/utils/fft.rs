//! FFT helpers shared by the correlation and regularity modules.

use rustfft::{num_complex::Complex64, FftPlanner};

/// Compute the FFT of a real-valued signal.
///
/// Only the non-negative frequencies (bins `0..=n/2`) are returned, since the
/// spectrum of a real signal is symmetric.
pub fn fft_real(signal: &[f64]) -> Vec<Complex64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    buffer.truncate(n / 2 + 1);
    buffer
}

/// Lagged cross products `sum_t a[t + k] * b[t]` for `k = 0..a.len()`.
///
/// Both inputs must have the same length. The correlation is computed with a
/// zero-padded transform so that no circular wrap-around leaks into the
/// result.
pub fn lagged_products(a: &[f64], b: &[f64]) -> Vec<f64> {
    let n = a.len();
    if n == 0 || b.len() != n {
        return Vec::new();
    }

    let size = (2 * n - 1).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut fa = vec![Complex64::new(0.0, 0.0); size];
    let mut fb = vec![Complex64::new(0.0, 0.0); size];
    for i in 0..n {
        fa[i].re = a[i];
        fb[i].re = b[i];
    }
    forward.process(&mut fa);
    forward.process(&mut fb);

    let mut spectrum: Vec<Complex64> = fa
        .iter()
        .zip(fb.iter())
        .map(|(x, y)| *x * y.conj())
        .collect();
    inverse.process(&mut spectrum);

    let scale = size as f64;
    spectrum[..n].iter().map(|c| c.re / scale).collect()
}

/// One-sided periodogram with density scaling.
///
/// The series is demeaned first. Bins other than DC (and Nyquist, for even
/// lengths) are doubled so the spectrum integrates to the variance.
pub fn periodogram(signal: &[f64], sf: f64) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let m = signal.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = signal.iter().map(|x| x - m).collect();
    let spectrum = fft_real(&centered);

    let scale = 1.0 / (sf * n as f64);
    let last = spectrum.len() - 1;
    spectrum
        .iter()
        .enumerate()
        .map(|(k, c)| {
            let power = c.norm_sqr() * scale;
            let nyquist = n % 2 == 0 && k == last;
            if k == 0 || nyquist {
                power
            } else {
                2.0 * power
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn direct_lagged(a: &[f64], b: &[f64]) -> Vec<f64> {
        let n = a.len();
        (0..n)
            .map(|k| (0..n - k).map(|t| a[t + k] * b[t]).sum())
            .collect()
    }

    #[test]
    fn fft_real_length() {
        assert_eq!(fft_real(&[1.0; 8]).len(), 5);
        assert_eq!(fft_real(&[1.0; 7]).len(), 4);
        assert!(fft_real(&[]).is_empty());
    }

    #[test]
    fn lagged_products_match_direct_sum() {
        let a: Vec<f64> = (0..37).map(|i| ((i * 7 + 3) % 11) as f64 - 5.0).collect();
        let b: Vec<f64> = (0..37).map(|i| ((i * 5 + 1) % 13) as f64 - 6.0).collect();

        let fast = lagged_products(&a, &b);
        let slow = direct_lagged(&a, &b);

        assert_eq!(fast.len(), slow.len());
        for (f, s) in fast.iter().zip(slow.iter()) {
            assert_relative_eq!(*f, *s, epsilon = 1e-8);
        }
    }

    #[test]
    fn lagged_products_mismatched_lengths() {
        assert!(lagged_products(&[1.0, 2.0], &[1.0]).is_empty());
    }

    #[test]
    fn periodogram_integrates_to_variance() {
        let signal: Vec<f64> = (0..64)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 8.0).sin())
            .collect();
        let psd = periodogram(&signal, 1.0);
        assert_eq!(psd.len(), 33);

        // Parseval: sum(psd) * df = population variance, df = 1 / n
        let var = {
            let m = signal.iter().sum::<f64>() / 64.0;
            signal.iter().map(|x| (x - m).powi(2)).sum::<f64>() / 64.0
        };
        assert_relative_eq!(psd.iter().sum::<f64>() / 64.0, var, epsilon = 1e-10);

        // The peak sits at frequency index n / period = 8
        let peak = psd
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(k, _)| k)
            .unwrap();
        assert_eq!(peak, 8);
    }
}
