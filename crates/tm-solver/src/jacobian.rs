//! Forward-difference Jacobians of residual systems.

use nalgebra::{DMatrix, DVector};

/// Forward-difference Jacobian; column `j` uses the step
/// `epsilon * max(|x_j|, 1)`.
pub fn finite_difference_jacobian<F, E>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> Result<DMatrix<f64>, E>
where
    F: Fn(&DVector<f64>) -> Result<DVector<f64>, E>,
{
    let f_x = f(x)?;
    forward_difference_from(x, &f_x, f, epsilon)
}

/// Forward differences reusing an already evaluated f(x).
pub fn forward_difference_from<F, E>(
    x: &DVector<f64>,
    f_x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> Result<DMatrix<f64>, E>
where
    F: Fn(&DVector<f64>) -> Result<DVector<f64>, E>,
{
    let mut jac = DMatrix::zeros(f_x.len(), x.len());
    let mut x_step = x.clone();
    for (j, &xj) in x.iter().enumerate() {
        let step = epsilon * xj.abs().max(1.0);
        x_step[j] = xj + step;
        let shifted = f(&x_step)?;
        x_step[j] = xj;
        jac.set_column(j, &((shifted - f_x) / step));
    }
    Ok(jac)
}
