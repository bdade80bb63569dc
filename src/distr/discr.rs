//! Discrete univariate distribution objects (family `DISCR`).

use std::sync::Arc;

use crate::error::{Error, ErrorKind};

pub type Pmf = Arc<dyn Fn(i64) -> f64 + Send + Sync>;

#[derive(Clone)]
pub struct DiscrDistr {
    pmf: Option<Pmf>,
    cdf: Option<Arc<dyn Fn(i64) -> f64 + Send + Sync>>,
    pv: Option<Vec<f64>>,
    pv_offset: i64,
    pv_sum: f64,
    domain: Option<(i64, i64)>,
    mode: Option<i64>,
    params: Vec<f64>,
}

impl Default for DiscrDistr {
    fn default() -> Self {
        DiscrDistr {
            pmf: None,
            cdf: None,
            pv: None,
            pv_offset: 0,
            pv_sum: 0.0,
            domain: None,
            mode: None,
            params: Vec::new(),
        }
    }
}

impl DiscrDistr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pmf(&mut self, pmf: impl Fn(i64) -> f64 + Send + Sync + 'static) -> &mut Self {
        self.pmf = Some(Arc::new(pmf));
        self
    }

    pub fn set_cdf(&mut self, cdf: impl Fn(i64) -> f64 + Send + Sync + 'static) -> &mut Self {
        self.cdf = Some(Arc::new(cdf));
        self
    }

    /// Setting the probability vector caches its sum so callers don't
    /// need to recompute it on every lookup.
    pub fn set_pv(&mut self, pv: Vec<f64>, offset: i64) -> Result<&mut Self, Error> {
        if pv.is_empty() {
            return Err(Error::new(ErrorKind::DistrSet, "probability vector must be non-empty"));
        }
        if pv.iter().any(|&p| p < 0.0 || p.is_nan()) {
            return Err(Error::new(ErrorKind::DistrSet, "probability vector entries must be non-negative"));
        }
        let sum: f64 = pv.iter().sum();
        if !(sum > 0.0) {
            return Err(Error::new(ErrorKind::DistrSet, "probability vector must have a positive sum"));
        }
        self.pv_sum = sum;
        self.pv_offset = offset;
        self.pv = Some(pv);
        Ok(self)
    }

    pub fn set_domain(&mut self, kmin: i64, kmax: i64) -> Result<&mut Self, Error> {
        if kmin > kmax {
            return Err(Error::new(ErrorKind::DistrSet, "domain must satisfy kmin <= kmax"));
        }
        self.domain = Some((kmin, kmax));
        Ok(self)
    }

    pub fn set_mode(&mut self, mode: i64) -> Result<&mut Self, Error> {
        if let Some((kmin, kmax)) = self.domain {
            if mode < kmin || mode > kmax {
                return Err(Error::new(ErrorKind::DistrSet, "mode must lie in the closed domain"));
            }
        }
        self.mode = Some(mode);
        Ok(self)
    }

    pub fn set_params(&mut self, params: Vec<f64>) -> &mut Self {
        self.params = params;
        self
    }

    pub fn domain(&self) -> (i64, i64) {
        self.domain.unwrap_or((i64::MIN, i64::MAX))
    }

    pub fn mode(&self) -> Option<i64> {
        self.mode
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn pv(&self) -> Option<&[f64]> {
        self.pv.as_deref()
    }

    pub fn pv_offset(&self) -> i64 {
        self.pv_offset
    }

    /// Cached `sum = sum(pmf)` over the probability vector, if one was
    /// set; recomputed automatically by [`Self::set_pv`].
    pub fn pv_sum(&self) -> Option<f64> {
        self.pv.is_some().then_some(self.pv_sum)
    }

    pub fn pmf(&self, k: i64) -> Option<f64> {
        if let Some((kmin, kmax)) = self.domain {
            if k < kmin || k > kmax {
                return Some(0.0);
            }
        }
        self.pmf.as_ref().map(|f| f(k))
    }

    pub fn cdf(&self, k: i64) -> Option<f64> {
        self.cdf.as_ref().map(|f| f(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_pv_caches_sum() {
        let mut d = DiscrDistr::new();
        d.set_pv(vec![0.5, 1.5, 1.0, 0.3], 0).unwrap();
        assert!((d.pv_sum().unwrap() - 3.3).abs() < 1e-12);
    }

    #[test]
    fn set_pv_rejects_negative_entries() {
        let mut d = DiscrDistr::new();
        assert!(d.set_pv(vec![0.5, -1.0], 0).is_err());
    }

    #[test]
    fn pmf_zero_outside_domain() {
        let mut d = DiscrDistr::new();
        d.set_pmf(|k| if (0..=3).contains(&k) { 0.25 } else { 0.0 });
        d.set_domain(0, 3).unwrap();
        assert_eq!(d.pmf(10), Some(0.0));
        assert_eq!(d.pmf(1), Some(0.25));
    }
}
