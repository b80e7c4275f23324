//! State-space form of a (S)ARIMA model and the Kalman filter that yields its
//! exact Gaussian likelihood.
//!
//! The state vector is laid out as
//!
//! ```text
//! [ Δ^0 y(t-1), .., Δ^(d-1) y(t-1) | u(t-1), .., u(t-s*D) | ARMA states ]
//! ```
//!
//! where `u = Δ^d y`. The differencing and seasonal lag states start from an
//! approximate diffuse prior, the ARMA block from its stationary distribution.
//! The constant enters as an intercept on the first ARMA state.

use std::ops::{Index, IndexMut};

/// Prior variance of the non-stationary states.
pub(crate) const DIFFUSE_VARIANCE: f64 = 1e6;

const LYAPUNOV_MAX_ITER: usize = 64;

/// Dense square matrix, row-major.
#[derive(Debug, Clone, PartialEq)]
struct Matrix {
    n: usize,
    data: Vec<f64>,
}

impl Matrix {
    fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    /// `self * other`, skipping the zeros of `self` (transitions are sparse).
    fn mul(&self, other: &Matrix) -> Matrix {
        let n = self.n;
        let mut out = Matrix::zeros(n);
        for i in 0..n {
            for k in 0..n {
                let a = self[(i, k)];
                if a == 0.0 {
                    continue;
                }
                for j in 0..n {
                    out[(i, j)] += a * other[(k, j)];
                }
            }
        }
        out
    }

    fn transpose(&self) -> Matrix {
        let n = self.n;
        let mut out = Matrix::zeros(n);
        for i in 0..n {
            for j in 0..n {
                out[(j, i)] = self[(i, j)];
            }
        }
        out
    }

    /// `self * p * self'` for symmetric `p`.
    fn sandwich(&self, p: &Matrix) -> Matrix {
        let tp = self.mul(p);
        self.mul(&tp.transpose())
    }

    fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |m, v| m.max(v.abs()))
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.n + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.n + j]
    }
}

/// Solve `P = T P T' + Q` by the doubling algorithm.
///
/// Returns `None` when the iteration does not settle, which happens when `T`
/// has an eigenvalue on or outside the unit circle.
fn solve_lyapunov(transition: &Matrix, q: &Matrix) -> Option<Matrix> {
    let mut p = q.clone();
    let mut a = transition.clone();

    for _ in 0..LYAPUNOV_MAX_ITER {
        let step = a.sandwich(&p);
        let change = step.max_abs();
        for (x, s) in p.data.iter_mut().zip(&step.data) {
            *x += s;
        }
        if !change.is_finite() {
            return None;
        }
        if change <= 1e-14 * p.max_abs().max(1.0) {
            return Some(p);
        }
        a = a.mul(&a);
    }
    None
}

/// Output of [`StateSpace::filter`].
#[derive(Debug, Clone)]
pub(crate) struct Filtered {
    /// Log-likelihood over the observations after the diffuse burn-in.
    pub loglike: f64,
    /// One-step-ahead forecast errors, one per observation.
    pub residuals: Vec<f64>,
}

/// A (S)ARIMA model in state-space form.
#[derive(Debug, Clone)]
pub(crate) struct StateSpace {
    transition: Matrix,
    design: Vec<f64>,
    state_intercept: Vec<f64>,
    state_cov: Matrix,
    initial_state: Vec<f64>,
    initial_cov: Matrix,
    burn: usize,
}

impl StateSpace {
    /// Build the state-space form.
    ///
    /// `ar_lags` and `ma_lags` are the expanded lag coefficients, so the ARMA
    /// part reads `x(t) = c + sum ar_k x(t-k) + e(t) + sum ma_k e(t-k)`.
    /// Returns `None` when the AR part is not stationary.
    pub(crate) fn new(
        ar_lags: &[f64],
        ma_lags: &[f64],
        intercept: f64,
        sigma2: f64,
        d: usize,
        seasonal_lags: &[f64],
    ) -> Option<Self> {
        let n_diff = d;
        let n_seasonal = seasonal_lags.len();
        let arma_at = n_diff + n_seasonal;
        let k_arma = ar_lags.len().max(ma_lags.len() + 1);
        let k = arma_at + k_arma;

        let mut design = vec![0.0; k];
        let mut transition = Matrix::zeros(k);

        // u(t) = sum_j delta_j u(t-j) + x(t)[0]
        let mut u_row = vec![0.0; k];
        u_row[n_diff..arma_at].copy_from_slice(seasonal_lags);
        u_row[arma_at] = 1.0;

        for i in 0..n_diff {
            design[i] = 1.0;
            // Δ^i y(t) = sum_{j >= i} Δ^j y(t-1) + u(t)
            for j in i..n_diff {
                transition[(i, j)] = 1.0;
            }
            for (j, v) in u_row.iter().enumerate().skip(n_diff) {
                transition[(i, j)] += v;
            }
        }
        for (j, v) in u_row.iter().enumerate().skip(n_diff) {
            design[j] += v;
        }

        if n_seasonal > 0 {
            for (j, v) in u_row.iter().enumerate().skip(n_diff) {
                transition[(n_diff, j)] = *v;
            }
            for j in 1..n_seasonal {
                transition[(n_diff + j, n_diff + j - 1)] = 1.0;
            }
        }

        // Companion form of the ARMA part
        for (i, phi) in ar_lags.iter().enumerate() {
            transition[(arma_at + i, arma_at)] = *phi;
        }
        for i in 0..k_arma - 1 {
            transition[(arma_at + i, arma_at + i + 1)] = 1.0;
        }

        let mut selection = vec![0.0; k];
        selection[arma_at] = 1.0;
        selection[arma_at + 1..arma_at + 1 + ma_lags.len()].copy_from_slice(ma_lags);

        let mut state_cov = Matrix::zeros(k);
        for i in 0..k {
            for j in 0..k {
                state_cov[(i, j)] = sigma2 * selection[i] * selection[j];
            }
        }

        let mut state_intercept = vec![0.0; k];
        state_intercept[arma_at] = intercept;

        // Stationary block
        let mut arma_transition = Matrix::zeros(k_arma);
        let mut arma_cov = Matrix::zeros(k_arma);
        for i in 0..k_arma {
            for j in 0..k_arma {
                arma_transition[(i, j)] = transition[(arma_at + i, arma_at + j)];
                arma_cov[(i, j)] = state_cov[(arma_at + i, arma_at + j)];
            }
        }
        let stationary_cov = solve_lyapunov(&arma_transition, &arma_cov)?;

        let ar_sum: f64 = ar_lags.iter().sum();
        if (1.0 - ar_sum).abs() < 1e-12 {
            return None;
        }
        let mean = intercept / (1.0 - ar_sum);

        let mut initial_state = vec![0.0; k];
        initial_state[arma_at] = mean;
        for i in 1..k_arma {
            initial_state[arma_at + i] = mean * ar_lags.iter().skip(i).sum::<f64>();
        }

        let mut initial_cov = Matrix::zeros(k);
        for i in 0..arma_at {
            initial_cov[(i, i)] = DIFFUSE_VARIANCE;
        }
        for i in 0..k_arma {
            for j in 0..k_arma {
                initial_cov[(arma_at + i, arma_at + j)] = stationary_cov[(i, j)];
            }
        }

        Some(Self {
            transition,
            design,
            state_intercept,
            state_cov,
            initial_state,
            initial_cov,
            burn: arma_at,
        })
    }

    /// Run the Kalman filter over `y`.
    ///
    /// The first `d + s*D` observations only resolve the diffuse states and
    /// are left out of the likelihood; their forecast errors are still
    /// reported.
    pub(crate) fn filter(&self, y: &[f64]) -> Filtered {
        let k = self.design.len();
        let mut state = self.initial_state.clone();
        let mut cov = self.initial_cov.clone();
        let mut residuals = Vec::with_capacity(y.len());
        let mut loglike = 0.0;
        let ln_2pi = (2.0 * std::f64::consts::PI).ln();

        for (t, &obs) in y.iter().enumerate() {
            let forecast: f64 = self.design.iter().zip(&state).map(|(z, a)| z * a).sum();
            let error = obs - forecast;

            // P Z'
            let pz: Vec<f64> = (0..k)
                .map(|i| (0..k).map(|j| cov[(i, j)] * self.design[j]).sum())
                .collect();
            let variance: f64 = self.design.iter().zip(&pz).map(|(z, v)| z * v).sum();

            residuals.push(error);
            if !(variance > 0.0) || !variance.is_finite() {
                loglike = f64::NEG_INFINITY;
                continue;
            }
            if t >= self.burn {
                loglike -= 0.5 * (ln_2pi + variance.ln() + error * error / variance);
            }

            // Measurement update
            let filtered_state: Vec<f64> = state
                .iter()
                .zip(&pz)
                .map(|(a, g)| a + g * error / variance)
                .collect();
            let mut filtered_cov = cov.clone();
            for i in 0..k {
                for j in 0..k {
                    filtered_cov[(i, j)] -= pz[i] * pz[j] / variance;
                }
            }

            // Time update
            state = (0..k)
                .map(|i| {
                    self.state_intercept[i]
                        + (0..k)
                            .map(|j| self.transition[(i, j)] * filtered_state[j])
                            .sum::<f64>()
                })
                .collect();
            cov = self.transition.sandwich(&filtered_cov);
            for (c, q) in cov.data.iter_mut().zip(&self.state_cov.data) {
                *c += q;
            }
        }

        Filtered { loglike, residuals }
    }

    /// Number of leading observations excluded from the likelihood.
    pub(crate) fn burn(&self) -> usize {
        self.burn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lyapunov_ar1_variance() {
        // var = sigma2 / (1 - phi^2)
        let mut t = Matrix::zeros(1);
        t[(0, 0)] = 0.6;
        let mut q = Matrix::zeros(1);
        q[(0, 0)] = 2.0;
        let p = solve_lyapunov(&t, &q).unwrap();
        assert_relative_eq!(p[(0, 0)], 2.0 / (1.0 - 0.36), epsilon = 1e-10);
    }

    #[test]
    fn lyapunov_rejects_unit_root() {
        let mut t = Matrix::zeros(1);
        t[(0, 0)] = 1.0;
        let mut q = Matrix::zeros(1);
        q[(0, 0)] = 1.0;
        assert!(solve_lyapunov(&t, &q).is_none());
    }

    #[test]
    fn white_noise_likelihood_is_gaussian() {
        let y = [0.5, -1.0, 0.25, 2.0];
        let ss = StateSpace::new(&[], &[], 0.0, 1.5, 0, &[]).unwrap();
        let out = ss.filter(&y);

        let expected: f64 = y
            .iter()
            .map(|v| -0.5 * ((2.0 * std::f64::consts::PI).ln() + 1.5f64.ln() + v * v / 1.5))
            .sum();
        assert_relative_eq!(out.loglike, expected, epsilon = 1e-12);
        assert_eq!(out.residuals, y.to_vec());
    }

    #[test]
    fn ar1_with_intercept_starts_at_mean() {
        // Unconditional mean c / (1 - phi) = 4
        let ss = StateSpace::new(&[0.5], &[], 2.0, 1.0, 0, &[]).unwrap();
        let out = ss.filter(&[4.0, 6.0]);
        assert_relative_eq!(out.residuals[0], 0.0, epsilon = 1e-12);
        // 6 - (2 + 0.5 * 4)
        assert_relative_eq!(out.residuals[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn random_walk_innovations_are_differences() {
        let y = [10.0, 11.0, 9.5, 12.0, 12.5];
        let ss = StateSpace::new(&[], &[], 0.0, 1.0, 1, &[]).unwrap();
        let out = ss.filter(&y);

        assert_eq!(ss.burn(), 1);
        assert_relative_eq!(out.residuals[0], 10.0, epsilon = 1e-12);
        for t in 1..y.len() {
            assert_relative_eq!(out.residuals[t], y[t] - y[t - 1], epsilon = 1e-4);
        }
    }

    #[test]
    fn seasonal_difference_states() {
        // Pure seasonal random walk with period 2: u(t) = u(t-2) + e(t)
        let y = [1.0, 5.0, 2.0, 4.0, 2.5, 6.0];
        let ss = StateSpace::new(&[], &[], 0.0, 1.0, 0, &[0.0, 1.0]).unwrap();
        let out = ss.filter(&y);

        assert_eq!(ss.burn(), 2);
        for t in 2..y.len() {
            assert_relative_eq!(out.residuals[t], y[t] - y[t - 2], epsilon = 1e-4);
        }
    }
}
