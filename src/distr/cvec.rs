//! Continuous multivariate (vector) distribution objects (family `CVEC`).

use std::sync::Arc;

use nalgebra::DMatrix;

use crate::error::{Error, ErrorKind};
use crate::support::linalg::Covariance;

pub type PdfVec = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;
pub type GradVec = Arc<dyn Fn(&[f64]) -> Vec<f64> + Send + Sync>;

#[derive(Clone)]
pub struct CvecDistr {
    dim: usize,
    pdf: Option<PdfVec>,
    logpdf: Option<PdfVec>,
    grad_logpdf: Option<GradVec>,
    domain: Option<Vec<(f64, f64)>>,
    mode: Option<Vec<f64>>,
    center: Option<Vec<f64>>,
    mean: Option<Vec<f64>>,
    covar: Option<Covariance>,
    marginals: Vec<String>,
    params: Vec<f64>,
}

impl CvecDistr {
    /// `d` is required and must be at least 2.
    pub fn new(dim: usize) -> Result<Self, Error> {
        if dim < 2 {
            return Err(Error::new(ErrorKind::DistrSet, "CVEC dimension must be at least 2"));
        }
        Ok(CvecDistr {
            dim,
            pdf: None,
            logpdf: None,
            grad_logpdf: None,
            domain: None,
            mode: None,
            center: None,
            mean: None,
            covar: None,
            marginals: Vec::new(),
            params: Vec::new(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn set_pdf(&mut self, pdf: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> &mut Self {
        self.pdf = Some(Arc::new(pdf));
        self
    }

    pub fn set_logpdf(&mut self, logpdf: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> &mut Self {
        self.logpdf = Some(Arc::new(logpdf));
        self
    }

    pub fn set_grad_logpdf(&mut self, grad: impl Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static) -> &mut Self {
        self.grad_logpdf = Some(Arc::new(grad));
        self
    }

    pub fn set_domain(&mut self, box_: Vec<(f64, f64)>) -> Result<&mut Self, Error> {
        if box_.len() != self.dim {
            return Err(Error::new(ErrorKind::DistrNParams, "domain box must have one interval per dimension"));
        }
        if box_.iter().any(|&(a, b)| a.is_nan() || b.is_nan() || a >= b) {
            return Err(Error::new(ErrorKind::DistrSet, "every axis interval must satisfy a < b"));
        }
        self.domain = Some(box_);
        Ok(self)
    }

    pub fn set_mode(&mut self, mode: Vec<f64>) -> Result<&mut Self, Error> {
        if mode.len() != self.dim {
            return Err(Error::new(ErrorKind::DistrNParams, "mode must have one coordinate per dimension"));
        }
        self.mode = Some(mode);
        Ok(self)
    }

    pub fn set_center(&mut self, center: Vec<f64>) -> Result<&mut Self, Error> {
        if center.len() != self.dim {
            return Err(Error::new(ErrorKind::DistrNParams, "center must have one coordinate per dimension"));
        }
        self.center = Some(center);
        Ok(self)
    }

    pub fn set_mean(&mut self, mean: Vec<f64>) -> Result<&mut Self, Error> {
        if mean.len() != self.dim {
            return Err(Error::new(ErrorKind::DistrNParams, "mean must have one coordinate per dimension"));
        }
        self.mean = Some(mean);
        Ok(self)
    }

    /// Replaces the covariance matrix, recomputing its Cholesky factor
    /// and inverse.
    pub fn set_covar(&mut self, covar: Vec<f64>) -> Result<&mut Self, Error> {
        if covar.len() != self.dim * self.dim {
            return Err(Error::new(ErrorKind::DistrNParams, "covariance must be a flattened d x d matrix"));
        }
        let m = DMatrix::from_row_slice(self.dim, self.dim, &covar);
        self.covar = Some(Covariance::new(m)?);
        Ok(self)
    }

    pub fn add_marginal(&mut self, name: impl Into<String>) -> &mut Self {
        self.marginals.push(name.into());
        self
    }

    pub fn set_params(&mut self, params: Vec<f64>) -> &mut Self {
        self.params = params;
        self
    }

    pub fn domain(&self) -> Option<&[(f64, f64)]> {
        self.domain.as_deref()
    }

    pub fn mode(&self) -> Option<&[f64]> {
        self.mode.as_deref()
    }

    pub fn center(&self) -> Vec<f64> {
        self.center.clone().or_else(|| self.mode.clone()).unwrap_or_else(|| vec![0.0; self.dim])
    }

    pub fn mean(&self) -> Option<&[f64]> {
        self.mean.as_deref()
    }

    pub fn covar(&self) -> Option<&Covariance> {
        self.covar.as_ref()
    }

    pub fn marginals(&self) -> &[String] {
        &self.marginals
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn has_pdf(&self) -> bool {
        self.pdf.is_some()
    }

    pub fn has_logpdf(&self) -> bool {
        self.logpdf.is_some()
    }

    pub fn pdf(&self, x: &[f64]) -> Option<f64> {
        if let Some(b) = &self.domain {
            if x.iter().zip(b).any(|(&xi, &(a, bi))| xi < a || xi > bi) {
                return Some(0.0);
            }
        }
        self.pdf.as_ref().map(|f| f(x))
    }

    pub fn logpdf(&self, x: &[f64]) -> Option<f64> {
        if let Some(f) = &self.logpdf {
            return Some(f(x));
        }
        self.pdf(x).map(|v| v.ln())
    }

    pub fn grad_logpdf(&self, x: &[f64]) -> Option<Vec<f64>> {
        self.grad_logpdf.as_ref().map(|f| f(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dimension_below_two() {
        assert!(CvecDistr::new(1).is_err());
    }

    #[test]
    fn set_covar_validates_spd() {
        let mut d = CvecDistr::new(2).unwrap();
        assert!(d.set_covar(vec![1.0, 2.0, 2.0, 1.0]).is_err());
        assert!(d.set_covar(vec![2.0, 0.5, 0.5, 1.0]).is_ok());
        assert!(d.covar().is_some());
    }

    #[test]
    fn pdf_zero_outside_box() {
        let mut d = CvecDistr::new(2).unwrap();
        d.set_pdf(|_x| 1.0);
        d.set_domain(vec![(0.0, 1.0), (0.0, 1.0)]).unwrap();
        assert_eq!(d.pdf(&[0.5, 0.5]), Some(1.0));
        assert_eq!(d.pdf(&[2.0, 0.5]), Some(0.0));
    }
}
