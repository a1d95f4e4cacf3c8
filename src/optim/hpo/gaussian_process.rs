//! Gaussian-process surrogate for bayesian search
//!
//! Matern 5/2 kernel on unit-cube encoded configurations, observation noise
//! `alpha` on the diagonal, targets normalized to zero mean / unit variance.

use ndarray::{Array1, Array2};

use super::error::{HPOError, Result};

/// Matern 5/2 kernel value
fn matern52(a: &[f64], b: &[f64], length_scale: f64) -> f64 {
    let dist = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt();
    let r = dist / length_scale;
    let sqrt5 = 5.0_f64.sqrt();
    (1.0 + sqrt5 * r + 5.0 / 3.0 * r * r) * (-sqrt5 * r).exp()
}

/// Fitted GP regression model
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    length_scale: f64,
    noise: f64,
    x_train: Vec<Vec<f64>>,
    l_chol: Array2<f64>,
    alpha: Array1<f64>,
    y_mean: f64,
    y_std: f64,
}

impl GaussianProcess {
    /// Fit to observations `(x_i, y_i)`
    pub fn fit(x: Vec<Vec<f64>>, y: &[f64], noise: f64) -> Result<Self> {
        let n = y.len();
        if n == 0 || x.len() != n {
            return Err(HPOError::NoTrials);
        }

        let y = Array1::from(y.to_vec());
        let y_mean = y.mean().unwrap_or(0.0);
        let mut y_std = y.std(0.0);
        if y_std < 1e-10 {
            y_std = 1.0;
        }
        let y_norm = y.mapv(|v| (v - y_mean) / y_std);

        let length_scale = 1.0;
        let noise = noise.max(1e-10);
        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            for j in 0..=i {
                let v = matern52(&x[i], &x[j], length_scale);
                k[[i, j]] = v;
                k[[j, i]] = v;
            }
            k[[i, i]] += noise;
        }

        let l_chol = cholesky(&k)?;
        let alpha = solve_cholesky(&l_chol, &y_norm);

        Ok(Self { length_scale, noise, x_train: x, l_chol, alpha, y_mean, y_std })
    }

    /// Posterior mean and standard deviation at one point
    pub fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star: Array1<f64> =
            self.x_train.iter().map(|xi| matern52(x, xi, self.length_scale)).collect();
        let mean = k_star.dot(&self.alpha) * self.y_std + self.y_mean;

        let v = solve_lower_triangular(&self.l_chol, &k_star);
        let var = (1.0 + self.noise - v.dot(&v)).max(1e-12);
        (mean, var.sqrt() * self.y_std)
    }
}

/// Cholesky factor of a symmetric positive-definite matrix
fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let d = a[[i, i]] - sum;
                if d <= 0.0 || !d.is_finite() {
                    return Err(HPOError::Internal(
                        "kernel matrix is not positive definite".to_string(),
                    ));
                }
                l[[i, j]] = d.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Ok(l)
}

/// Solve L x = b for lower triangular L
fn solve_lower_triangular(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let mut x = Array1::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[[i, j]] * x[j];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// Solve L Lᵀ x = b
fn solve_cholesky(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let y = solve_lower_triangular(l, b);
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[[j, i]] * x[j];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_matern_at_zero_distance() {
        assert_abs_diff_eq!(matern52(&[0.3, 0.1], &[0.3, 0.1], 1.0), 1.0);
        assert!(matern52(&[0.0], &[1.0], 1.0) < 1.0);
    }

    #[test]
    fn test_gp_interpolates_observations() {
        let x = vec![vec![0.0], vec![0.5], vec![1.0]];
        let y = [1.0, 0.0, 1.0];
        let gp = GaussianProcess::fit(x, &y, 1e-8).unwrap();

        let (mean, std) = gp.predict(&[0.5]);
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-3);
        assert!(std < 1e-2);
    }

    #[test]
    fn test_gp_uncertainty_grows_away_from_data() {
        let gp = GaussianProcess::fit(vec![vec![0.0, 0.0]], &[2.0], 1e-6).unwrap();
        let (_, near) = gp.predict(&[0.01, 0.0]);
        let (_, far) = gp.predict(&[1.0, 1.0]);
        assert!(far > near);
    }

    #[test]
    fn test_gp_requires_data() {
        assert!(GaussianProcess::fit(Vec::new(), &[], 1e-6).is_err());
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 2.0, 1.0]).unwrap();
        assert!(cholesky(&a).is_err());
    }
}
