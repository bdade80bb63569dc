//! Small linear-algebra helpers for the multivariate (CVEC) distribution
//! object: Cholesky factorisation and inversion of a covariance matrix.
//!
//! Delegates to `nalgebra` rather than hand-rolling decompositions, the
//! way `statrs-fork` leans on `nalgebra` for the same kind of work.

use nalgebra::DMatrix;

use crate::error::{Error, ErrorKind};

/// A covariance matrix together with its cached Cholesky factor and
/// inverse, recomputed whenever the covariance is replaced.
#[derive(Debug, Clone)]
pub struct Covariance {
    matrix: DMatrix<f64>,
    cholesky: DMatrix<f64>,
    inverse: DMatrix<f64>,
}

impl Covariance {
    /// Build from a dense `d x d` matrix, verifying symmetric
    /// positive-definiteness by attempting a Cholesky factorisation.
    pub fn new(matrix: DMatrix<f64>) -> Result<Self, Error> {
        let d = matrix.nrows();
        if matrix.ncols() != d {
            return Err(Error::new(ErrorKind::DistrSet, "covariance matrix must be square"));
        }
        if !is_symmetric(&matrix) {
            return Err(Error::new(ErrorKind::DistrSet, "covariance matrix must be symmetric"));
        }
        let chol = nalgebra::linalg::Cholesky::new(matrix.clone())
            .ok_or_else(|| Error::new(ErrorKind::DistrSet, "covariance matrix is not positive definite"))?;
        let cholesky = chol.l();
        let inverse = chol.inverse();
        Ok(Covariance { matrix, cholesky, inverse })
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn cholesky(&self) -> &DMatrix<f64> {
        &self.cholesky
    }

    pub fn inverse(&self) -> &DMatrix<f64> {
        &self.inverse
    }
}

fn is_symmetric(m: &DMatrix<f64>) -> bool {
    let d = m.nrows();
    for i in 0..d {
        for j in (i + 1)..d {
            if (m[(i, j)] - m[(j, i)]).abs() > 1e-9 * m[(i, j)].abs().max(m[(j, i)].abs()).max(1.0) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_spd_matrix() {
        let m = DMatrix::from_row_slice(3, 3, &[2.0, 2.0, 1.0, 2.0, 4.0, 3.0, 1.0, 3.0, 3.0]);
        let cov = Covariance::new(m).unwrap();
        assert_eq!(cov.dim(), 3);
        let reconstructed = cov.cholesky() * cov.cholesky().transpose();
        assert::close(&reconstructed.iter().copied().collect::<Vec<_>>(), &cov.matrix().iter().copied().collect::<Vec<_>>(), 1e-9);
    }

    #[test]
    fn rejects_non_spd_matrix() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(Covariance::new(m).is_err());
    }

    #[test]
    fn rejects_asymmetric_matrix() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 1.0]);
        assert!(Covariance::new(m).is_err());
    }
}
