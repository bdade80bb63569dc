//! Continuous univariate distribution objects (family `CONT`).

use std::sync::Arc;

use crate::error::{Error, ErrorKind};

pub type Pdf = Arc<dyn Fn(f64) -> f64 + Send + Sync>;
pub type Cdf = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// The attributes a continuous univariate distribution may carry: `pdf`,
/// `dpdf`, `logpdf`, `cdf`, `invcdf`, `hr`, domain, mode, center, area,
/// parameters, name. All optional, except that a method may require a
/// subset of them.
#[derive(Clone)]
pub struct ContDistr {
    pdf: Option<Pdf>,
    dpdf: Option<Pdf>,
    logpdf: Option<Pdf>,
    cdf: Option<Cdf>,
    invcdf: Option<Pdf>,
    hr: Option<Pdf>,
    domain: Option<(f64, f64)>,
    mode: Option<f64>,
    center: Option<f64>,
    area: Option<f64>,
    params: Vec<f64>,
    name: Option<String>,
}

impl Default for ContDistr {
    fn default() -> Self {
        ContDistr {
            pdf: None,
            dpdf: None,
            logpdf: None,
            cdf: None,
            invcdf: None,
            hr: None,
            domain: None,
            mode: None,
            center: None,
            area: None,
            params: Vec::new(),
            name: None,
        }
    }
}

impl ContDistr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pdf(&mut self, pdf: impl Fn(f64) -> f64 + Send + Sync + 'static) -> &mut Self {
        self.pdf = Some(Arc::new(pdf));
        self
    }

    pub fn set_dpdf(&mut self, dpdf: impl Fn(f64) -> f64 + Send + Sync + 'static) -> &mut Self {
        self.dpdf = Some(Arc::new(dpdf));
        self
    }

    pub fn set_logpdf(&mut self, logpdf: impl Fn(f64) -> f64 + Send + Sync + 'static) -> &mut Self {
        self.logpdf = Some(Arc::new(logpdf));
        self
    }

    pub fn set_cdf(&mut self, cdf: impl Fn(f64) -> f64 + Send + Sync + 'static) -> &mut Self {
        self.cdf = Some(Arc::new(cdf));
        self
    }

    pub fn set_invcdf(&mut self, invcdf: impl Fn(f64) -> f64 + Send + Sync + 'static) -> &mut Self {
        self.invcdf = Some(Arc::new(invcdf));
        self
    }

    pub fn set_hazard_rate(&mut self, hr: impl Fn(f64) -> f64 + Send + Sync + 'static) -> &mut Self {
        self.hr = Some(Arc::new(hr));
        self
    }

    /// `a` may be `-inf` and `b` may be `+inf`; a finite domain means any
    /// PDF/CDF evaluation outside `[a, b]` is defined to return `0`.
    pub fn set_domain(&mut self, a: f64, b: f64) -> Result<&mut Self, Error> {
        if a.is_nan() || b.is_nan() || a >= b {
            return Err(Error::new(ErrorKind::DistrSet, "domain must satisfy a < b with no NaNs"));
        }
        if let Some(mode) = self.mode {
            if mode < a || mode > b {
                return Err(Error::new(ErrorKind::DistrSet, "domain would exclude the already-set mode"));
            }
        }
        self.domain = Some((a, b));
        Ok(self)
    }

    pub fn set_mode(&mut self, mode: f64) -> Result<&mut Self, Error> {
        if mode.is_nan() {
            return Err(Error::new(ErrorKind::DistrSet, "mode must not be NaN"));
        }
        if let Some((a, b)) = self.domain {
            if mode < a || mode > b {
                return Err(Error::new(ErrorKind::DistrSet, "mode must lie in the closed domain"));
            }
        }
        self.mode = Some(mode);
        Ok(self)
    }

    pub fn set_center(&mut self, center: f64) -> &mut Self {
        self.center = Some(center);
        self
    }

    pub fn set_area(&mut self, area: f64) -> Result<&mut Self, Error> {
        if !(area > 0.0) {
            return Err(Error::new(ErrorKind::DistrSet, "area must be positive"));
        }
        self.area = Some(area);
        Ok(self)
    }

    pub fn set_params(&mut self, params: Vec<f64>) -> &mut Self {
        self.params = params;
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain.unwrap_or((f64::NEG_INFINITY, f64::INFINITY))
    }

    pub fn mode(&self) -> Option<f64> {
        self.mode
    }

    pub fn center(&self) -> f64 {
        self.center.or(self.mode).unwrap_or(0.0)
    }

    pub fn area(&self) -> Option<f64> {
        self.area
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn has_pdf(&self) -> bool {
        self.pdf.is_some()
    }

    pub fn has_dpdf(&self) -> bool {
        self.dpdf.is_some()
    }

    pub fn has_logpdf(&self) -> bool {
        self.logpdf.is_some()
    }

    pub fn has_cdf(&self) -> bool {
        self.cdf.is_some()
    }

    /// Evaluate the PDF, returning `0` outside a declared finite domain.
    pub fn pdf(&self, x: f64) -> Option<f64> {
        if let Some((a, b)) = self.domain {
            if x < a || x > b {
                return Some(0.0);
            }
        }
        self.pdf.as_ref().map(|f| f(x))
    }

    pub fn dpdf(&self, x: f64) -> Option<f64> {
        if let Some((a, b)) = self.domain {
            if x < a || x > b {
                return Some(0.0);
            }
        }
        self.dpdf.as_ref().map(|f| f(x))
    }

    pub fn logpdf(&self, x: f64) -> Option<f64> {
        if let Some((a, b)) = self.domain {
            if x < a || x > b {
                return Some(f64::NEG_INFINITY);
            }
        }
        self.logpdf.as_ref().map(|f| f(x))
    }

    pub fn cdf(&self, x: f64) -> Option<f64> {
        self.cdf.as_ref().map(|f| f(x))
    }

    pub fn invcdf(&self, u: f64) -> Option<f64> {
        self.invcdf.as_ref().map(|f| f(u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_returns_zero_outside_domain() {
        let mut d = ContDistr::new();
        d.set_pdf(|x| if (0.0..=1.0).contains(&x) { 1.0 } else { 0.0 });
        d.set_domain(0.0, 1.0).unwrap();
        assert_eq!(d.pdf(0.5), Some(1.0));
        assert_eq!(d.pdf(2.0), Some(0.0));
    }

    #[test]
    fn mode_must_lie_in_domain() {
        let mut d = ContDistr::new();
        d.set_domain(0.0, 1.0).unwrap();
        assert!(d.set_mode(2.0).is_err());
        assert!(d.set_mode(0.5).is_ok());
    }

    #[test]
    fn domain_rejects_existing_out_of_range_mode() {
        let mut d = ContDistr::new();
        d.set_mode(5.0).unwrap();
        assert!(d.set_domain(0.0, 1.0).is_err());
    }
}
