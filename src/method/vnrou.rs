//! VNROU: the vector (multivariate) naive ratio-of-uniforms method.
//! "Naive" names the bounding strategy. Rather than the minimal-volume
//! acceptance region, an axis-aligned bounding box is estimated by
//! coordinate-ascent search and used as-is, trading a higher rejection
//! rate for a setup that needs neither convexity analysis nor a
//! user-supplied region.

use crate::distr::{CvecDistr, Distr};
use crate::error::{Error, ErrorKind};
use crate::gen::Generator;
use crate::method::{next_id, MethodParams};
use crate::stream::StreamHandle;
use crate::support::{float::finite, log};

/// Golden-section search for the maximiser of a unimodal `f` on `[lo, hi]`.
fn golden_max_1d<F: Fn(f64) -> f64>(f: F, lo: f64, hi: f64, iters: usize) -> f64 {
    let gr = (5f64.sqrt() - 1.0) / 2.0;
    let mut a = lo;
    let mut b = hi;
    let mut c = b - gr * (b - a);
    let mut d = a + gr * (b - a);
    for _ in 0..iters {
        if f(c) > f(d) {
            b = d;
        } else {
            a = c;
        }
        c = b - gr * (b - a);
        d = a + gr * (b - a);
    }
    0.5 * (a + b)
}

/// Coordinate-ascent sweep maximising `g` over an axis-aligned box,
/// starting from `start`.
fn coordinate_ascent(g: &dyn Fn(&[f64]) -> f64, start: &[f64], domain: &[(f64, f64)], sweeps: usize) -> Vec<f64> {
    let mut x = start.to_vec();
    for _ in 0..sweeps {
        for i in 0..x.len() {
            let (lo, hi) = domain[i];
            let fixed = x.clone();
            let best = golden_max_1d(
                |xi| {
                    let mut probe = fixed.clone();
                    probe[i] = xi;
                    g(&probe)
                },
                lo,
                hi,
                40,
            );
            x[i] = best;
        }
    }
    x
}

fn default_domain(distr: &CvecDistr) -> Result<Vec<(f64, f64)>, Error> {
    if let Some(b) = distr.domain() {
        return Ok(b.to_vec());
    }
    let covar = distr
        .covar()
        .ok_or_else(|| Error::new(ErrorKind::ParamSet, "automatic bounding box search needs a domain box or a covariance matrix"))?;
    let mean = distr.mean().map(|m| m.to_vec()).unwrap_or_else(|| distr.center());
    let span = 10.0;
    Ok((0..distr.dim())
        .map(|i| {
            let sigma = covar.matrix()[(i, i)].max(0.0).sqrt();
            (mean[i] - span * sigma, mean[i] + span * sigma)
        })
        .collect())
}

/// User-tunable knobs for VNROU.
pub struct Params {
    distr: CvecDistr,
    sweeps: usize,
    safety_factor: f64,
    max_trials: u64,
    explicit: Option<(f64, Vec<f64>, Vec<f64>)>,
    verify: bool,
}

impl Params {
    pub fn new(distr: &Distr) -> Result<Self, Error> {
        let cvec = distr
            .as_cvec()
            .ok_or_else(|| Error::new(ErrorKind::DistrInvalid, "VNROU requires a CVEC distribution"))?;
        if !cvec.has_pdf() {
            return Err(Error::new(ErrorKind::DistrRequired, "VNROU requires a pdf"));
        }
        Ok(Params {
            distr: cvec.clone(),
            sweeps: 6,
            safety_factor: 1.05,
            max_trials: 1_000_000,
            explicit: None,
            verify: false,
        })
    }

    pub fn set_sweeps(mut self, sweeps: usize) -> Self {
        self.sweeps = sweeps.max(1);
        self
    }

    pub fn set_safety_factor(mut self, factor: f64) -> Self {
        self.safety_factor = factor.max(1.0);
        self
    }

    pub fn set_max_trials(mut self, n: u64) -> Self {
        self.max_trials = n.max(1);
        self
    }

    /// Bypass the automatic search with a caller-supplied, already-valid
    /// bounding box (`v_max`, `u_min`, `u_max`), the safer route whenever
    /// one is available.
    pub fn set_bounds(mut self, v_max: f64, u_min: Vec<f64>, u_max: Vec<f64>) -> Result<Self, Error> {
        if u_min.len() != self.distr.dim() || u_max.len() != self.distr.dim() {
            return Err(Error::new(ErrorKind::ParamSet, "bounding box dimensions must match the distribution"));
        }
        self.explicit = Some((v_max, u_min, u_max));
        Ok(self)
    }

    pub fn set_verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }
}

struct Bounds {
    v_max: f64,
    u_min: Vec<f64>,
    u_max: Vec<f64>,
}

fn setup(params: &Params) -> Result<Bounds, Error> {
    if let Some((v_max, u_min, u_max)) = &params.explicit {
        return Ok(Bounds { v_max: *v_max, u_min: u_min.clone(), u_max: u_max.clone() });
    }

    let dim = params.distr.dim();
    let exponent = 1.0 / (dim as f64 + 1.0);
    let domain = default_domain(&params.distr)?;
    let start = params.distr.mean().map(|m| m.to_vec()).unwrap_or_else(|| params.distr.center());

    let g = |x: &[f64]| params.distr.pdf(x).unwrap_or(0.0).max(0.0).powf(exponent);
    let peak = coordinate_ascent(&g, &start, &domain, params.sweeps);
    let v_max = g(&peak) * params.safety_factor;
    if !(v_max > 0.0) || !finite(v_max) {
        return Err(Error::new(ErrorKind::GenData, "non-finite or non-positive v_max bound"));
    }

    let mut u_min = Vec::with_capacity(dim);
    let mut u_max = Vec::with_capacity(dim);
    for i in 0..dim {
        let h = |x: &[f64]| x[i] * params.distr.pdf(x).unwrap_or(0.0).max(0.0).powf(exponent);
        let argmax = coordinate_ascent(&h, &peak, &domain, params.sweeps);
        let hi = h(&argmax);
        let neg_h = |x: &[f64]| -h(x);
        let argmin = coordinate_ascent(&neg_h, &peak, &domain, params.sweeps);
        let lo = h(&argmin);
        let pad = params.safety_factor - 1.0;
        let span = (hi - lo).abs().max(1e-12);
        u_max.push(hi + pad * span);
        u_min.push(lo - pad * span);
    }
    Ok(Bounds { v_max, u_min, u_max })
}

/// The VNROU generator: a bounding box in `(v, u)` space plus a rejection
/// loop that samples uniformly over it and tests `v^(d+1) <= f(u / v)`.
pub struct VnrouGen {
    id: String,
    distr: CvecDistr,
    params: ParamsConfig,
    bounds: Bounds,
    stream: StreamHandle,
}

#[derive(Clone)]
struct ParamsConfig {
    sweeps: usize,
    safety_factor: f64,
    max_trials: u64,
    explicit: Option<(f64, Vec<f64>, Vec<f64>)>,
    verify: bool,
}

impl Clone for Bounds {
    fn clone(&self) -> Self {
        Bounds { v_max: self.v_max, u_min: self.u_min.clone(), u_max: self.u_max.clone() }
    }
}

impl MethodParams for Params {
    fn init(self: Box<Self>, stream: StreamHandle) -> Result<Generator, Error> {
        let bounds = setup(&self)?;
        let id = next_id("vnrou");
        log::log(&id, format!("setup complete: v_max={:.6}", bounds.v_max));
        Ok(Generator::Vnrou(VnrouGen {
            id,
            distr: self.distr.clone(),
            params: ParamsConfig {
                sweeps: self.sweeps,
                safety_factor: self.safety_factor,
                max_trials: self.max_trials,
                explicit: self.explicit.clone(),
                verify: self.verify,
            },
            bounds,
            stream,
        }))
    }
}

impl VnrouGen {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream(&self) -> &StreamHandle {
        &self.stream
    }

    pub fn set_stream(&mut self, stream: StreamHandle) {
        self.stream = stream;
    }

    pub fn reinit(&mut self) -> Result<(), Error> {
        let params = Params {
            distr: self.distr.clone(),
            sweeps: self.params.sweeps,
            safety_factor: self.params.safety_factor,
            max_trials: self.params.max_trials,
            explicit: self.params.explicit.clone(),
            verify: self.params.verify,
        };
        self.bounds = setup(&params)?;
        log::log(&self.id, "reinit complete");
        Ok(())
    }

    pub fn sample(&mut self) -> Result<Vec<f64>, Error> {
        let dim = self.distr.dim();
        let power = dim as f64 + 1.0;
        for _ in 0..self.params.max_trials {
            let (v, u) = {
                let mut stream = self.stream.lock().unwrap();
                let v = stream.next() * self.bounds.v_max;
                let u: Vec<f64> = (0..dim)
                    .map(|i| self.bounds.u_min[i] + stream.next() * (self.bounds.u_max[i] - self.bounds.u_min[i]))
                    .collect();
                (v, u)
            };
            if v <= 1e-300 {
                continue;
            }
            let x: Vec<f64> = u.iter().map(|ui| ui / v).collect();
            let f = match self.distr.pdf(&x) {
                Some(f) if f > 0.0 => f,
                _ => continue,
            };
            if v.powf(power) <= f {
                if self.params.verify && v > self.bounds.v_max * (1.0 - 1e-6) {
                    log::log(&self.id, format!("verify: accepted draw sits at the v_max boundary, box may be too tight at x={x:?}"));
                }
                return Ok(x);
            }
        }
        log::log(&self.id, "rejection loop exceeded its trial budget; the bounding box may not dominate the density");
        Err(Error::new(
            ErrorKind::GenCondition,
            "VNROU rejection loop exceeded the trial budget; the automatic bounding box may not dominate the density",
        ))
    }
}

impl Clone for VnrouGen {
    fn clone(&self) -> Self {
        VnrouGen {
            id: self.id.clone(),
            distr: self.distr.clone(),
            params: self.params.clone(),
            bounds: self.bounds.clone(),
            stream: self.stream.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::handle;
    use std::f64::consts::PI;

    fn bivariate_normal() -> Distr {
        let mut d = CvecDistr::new(2).unwrap();
        d.set_pdf(|x| (-0.5 * (x[0] * x[0] + x[1] * x[1])).exp() / (2.0 * PI));
        d.set_domain(vec![(-8.0, 8.0), (-8.0, 8.0)]).unwrap();
        d.set_mode(vec![0.0, 0.0]).unwrap();
        d.into()
    }

    #[test]
    fn setup_finds_a_positive_v_max() {
        let distr = bivariate_normal();
        let params = Params::new(&distr).unwrap();
        let stream = handle(Box::new(crate::stream::ChaChaStream::new(1)));
        let gen = Box::new(params).init(stream).unwrap();
        if let Generator::Vnrou(g) = gen {
            assert!(g.bounds.v_max > 0.0);
        } else {
            panic!("expected a VNROU generator");
        }
    }

    #[test]
    fn samples_cluster_near_the_mode() {
        let distr = bivariate_normal();
        let params = Params::new(&distr).unwrap();
        let stream = handle(Box::new(crate::stream::ChaChaStream::new(2)));
        let gen = Box::new(params).init(stream).unwrap();
        if let Generator::Vnrou(mut g) = gen {
            let mut mean = [0.0, 0.0];
            let n = 500;
            for _ in 0..n {
                let x = g.sample().unwrap();
                mean[0] += x[0];
                mean[1] += x[1];
            }
            mean[0] /= n as f64;
            mean[1] /= n as f64;
            assert::close(&mean, &[0.0, 0.0], 0.3);
        } else {
            panic!("expected a VNROU generator");
        }
    }

    #[test]
    fn explicit_bounds_bypass_the_search() {
        let distr = bivariate_normal();
        let params = Params::new(&distr).unwrap().set_bounds(1.0, vec![-3.0, -3.0], vec![3.0, 3.0]).unwrap();
        let stream = handle(Box::new(crate::stream::ChaChaStream::new(3)));
        assert!(Box::new(params).init(stream).is_ok());
    }

    #[test]
    fn verify_mode_samples_without_panicking() {
        let distr = bivariate_normal();
        let params = Params::new(&distr).unwrap().set_verify(true);
        let stream = handle(Box::new(crate::stream::ChaChaStream::new(4)));
        let gen = Box::new(params).init(stream).unwrap();
        if let Generator::Vnrou(mut g) = gen {
            for _ in 0..50 {
                g.sample().unwrap();
            }
        } else {
            panic!("expected a VNROU generator");
        }
    }
}
