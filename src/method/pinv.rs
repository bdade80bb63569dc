//! PINV: polynomial interpolation of the inverse CDF.
//!
//! Builds a piecewise Newton polynomial `x(u)` over an adaptively
//! subdivided partition of `u in [0, 1]`, so that sampling costs exactly
//! one uniform draw, one guide-table lookup, and one Horner evaluation.

use crate::distr::{ContDistr, Distr};
use crate::error::{Error, ErrorKind};
use crate::gen::Generator;
use crate::method::{next_id, MethodParams};
use crate::stream::StreamHandle;
use crate::support::{float::finite, log, quadrature};

fn cdf_at(distr: &ContDistr, bl: f64, x: f64, total_area: f64) -> f64 {
    if let Some(c) = distr.cdf(x) {
        return c;
    }
    let f = |t: f64| distr.pdf(t).unwrap_or(0.0);
    (quadrature::integrate(&f, bl, x, 1e-12) / total_area).clamp(0.0, 1.0)
}

/// Bisection on the (monotone) CDF; robust where Newton iteration on a
/// possibly-flat density would stall.
fn solve_u(distr: &ContDistr, bl: f64, br: f64, total_area: f64, target: f64) -> f64 {
    let mut lo = bl;
    let mut hi = br;
    for _ in 0..80 {
        let mid = 0.5 * (lo + hi);
        if cdf_at(distr, bl, mid, total_area) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Expand outward from `center` until the density drops below
/// `tail_cutoff`, used when the declared domain is (partly) unbounded.
fn search_boundary(distr: &ContDistr, center: f64, bound: f64, going_right: bool, tail_cutoff: f64) -> f64 {
    if bound.is_finite() {
        return bound;
    }
    let mut x = center;
    let mut step = 1.0f64;
    loop {
        let probe = if going_right { x + step } else { x - step };
        let f = distr.pdf(probe).unwrap_or(0.0);
        if !finite(f) || f < tail_cutoff || step > 1e18 {
            return probe;
        }
        x = probe;
        step *= 2.0;
    }
}

fn chebyshev_nodes(u_lo: f64, u_hi: f64, n: usize) -> Vec<f64> {
    let mid = 0.5 * (u_lo + u_hi);
    let half = 0.5 * (u_hi - u_lo);
    let mut nodes: Vec<f64> = (0..n)
        .map(|k| {
            let theta = std::f64::consts::PI * (2.0 * k as f64 + 1.0) / (2.0 * n as f64);
            (mid + half * theta.cos()).clamp(u_lo, u_hi)
        })
        .collect();
    nodes.sort_by(|a, b| a.partial_cmp(b).unwrap());
    nodes
}

/// Newton divided-difference coefficients for `x` as a function of `u`
/// through the node pairs `(us[i], xs[i])`.
fn divided_differences(us: &[f64], xs: &[f64]) -> Vec<f64> {
    let n = us.len();
    let mut table = xs.to_vec();
    let mut coeffs = vec![table[0]];
    for j in 1..n {
        for i in (j..n).rev() {
            table[i] = (table[i] - table[i - 1]) / (us[i] - us[i - j]);
        }
        coeffs.push(table[j]);
    }
    coeffs
}

/// Horner-style evaluation of the nested Newton form.
fn eval_newton(nodes: &[f64], coeffs: &[f64], u: f64) -> f64 {
    let mut result = *coeffs.last().unwrap();
    for i in (0..coeffs.len() - 1).rev() {
        result = coeffs[i] + (u - nodes[i]) * result;
    }
    result
}

#[derive(Clone)]
struct Interval {
    u_lo: f64,
    u_hi: f64,
    nodes: Vec<f64>,
    coeffs: Vec<f64>,
}

fn build_interval(distr: &ContDistr, bl: f64, br: f64, total_area: f64, degree: usize, u_lo: f64, u_hi: f64) -> Interval {
    let nodes = chebyshev_nodes(u_lo, u_hi, degree + 1);
    let xs: Vec<f64> = nodes.iter().map(|&u| solve_u(distr, bl, br, total_area, u)).collect();
    let coeffs = divided_differences(&nodes, &xs);
    Interval { u_lo, u_hi, nodes, coeffs }
}

fn interval_error(distr: &ContDistr, bl: f64, total_area: f64, interval: &Interval) -> f64 {
    let mut worst = 0.0f64;
    for w in interval.nodes.windows(2) {
        let check = 0.5 * (w[0] + w[1]);
        let x = eval_newton(&interval.nodes, &interval.coeffs, check);
        let back = cdf_at(distr, bl, x, total_area);
        worst = worst.max((back - check).abs());
    }
    worst
}

fn build_intervals(distr: &ContDistr, bl: f64, br: f64, total_area: f64, degree: usize, utol: f64, max_intervals: usize) -> Vec<Interval> {
    let mut stack = vec![(0.0f64, 1.0f64)];
    let mut done = Vec::new();
    while let Some((u_lo, u_hi)) = stack.pop() {
        let interval = build_interval(distr, bl, br, total_area, degree, u_lo, u_hi);
        let budget_left = done.len() + stack.len() < max_intervals;
        if !budget_left || interval_error(distr, bl, total_area, &interval) <= utol {
            done.push(interval);
        } else {
            let mid = 0.5 * (u_lo + u_hi);
            stack.push((mid, u_hi));
            stack.push((u_lo, mid));
        }
    }
    done.sort_by(|a, b| a.u_lo.partial_cmp(&b.u_lo).unwrap());
    done
}

fn build_guide(intervals: &[Interval], factor: f64) -> Vec<u32> {
    let size = ((intervals.len() as f64 * factor).ceil() as usize).max(1);
    let mut guide = vec![0u32; size];
    let mut j = 0usize;
    for (slot, g) in guide.iter_mut().enumerate() {
        let target = (slot as f64) / (size as f64);
        while j + 1 < intervals.len() && intervals[j].u_hi <= target {
            j += 1;
        }
        *g = j as u32;
    }
    guide
}

/// User-tunable knobs for PINV.
pub struct Params {
    distr: ContDistr,
    degree: usize,
    utol: f64,
    tail_cutoff: f64,
    max_intervals: usize,
    guide_factor: f64,
    bounds: Option<(f64, f64)>,
    verify: bool,
}

impl Params {
    pub fn new(distr: &Distr) -> Result<Self, Error> {
        let cont = distr
            .as_cont()
            .ok_or_else(|| Error::new(ErrorKind::DistrInvalid, "PINV requires a CONT distribution"))?;
        if !cont.has_pdf() {
            return Err(Error::new(ErrorKind::DistrRequired, "PINV requires a pdf"));
        }
        Ok(Params {
            distr: cont.clone(),
            degree: 5,
            utol: 1e-10,
            tail_cutoff: 1e-13,
            max_intervals: 500,
            guide_factor: 1.0,
            bounds: None,
            verify: false,
        })
    }

    pub fn set_degree(mut self, degree: usize) -> Self {
        self.degree = degree.clamp(1, 17);
        self
    }

    pub fn set_u_tol(mut self, utol: f64) -> Self {
        self.utol = utol;
        self
    }

    pub fn set_tail_cutoff(mut self, cutoff: f64) -> Self {
        self.tail_cutoff = cutoff;
        self
    }

    pub fn set_max_intervals(mut self, n: usize) -> Self {
        self.max_intervals = n.max(1);
        self
    }

    pub fn set_guide_factor(mut self, factor: f64) -> Self {
        self.guide_factor = factor.max(0.1);
        self
    }

    pub fn set_bounds(mut self, bl: f64, br: f64) -> Self {
        self.bounds = Some((bl, br));
        self
    }

    pub fn set_verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }
}

fn setup(params: &Params) -> Result<(f64, f64, f64, Vec<Interval>), Error> {
    let domain = params.distr.domain();
    let center = params.distr.center();
    let (bl, br) = match params.bounds {
        Some(b) => b,
        None => (
            search_boundary(&params.distr, center, domain.0, false, params.tail_cutoff),
            search_boundary(&params.distr, center, domain.1, true, params.tail_cutoff),
        ),
    };
    if !(bl < br) {
        return Err(Error::new(ErrorKind::GenData, "boundary search produced an empty effective support"));
    }
    let total_area = match params.distr.area() {
        Some(a) => a,
        None => {
            let f = |x: f64| params.distr.pdf(x).unwrap_or(0.0);
            quadrature::integrate(&f, bl, br, 1e-12)
        }
    };
    if !(total_area > 0.0) || !finite(total_area) {
        return Err(Error::new(ErrorKind::GenData, "non-finite or non-positive normalisation constant"));
    }
    let intervals = build_intervals(&params.distr, bl, br, total_area, params.degree, params.utol, params.max_intervals);
    if intervals.is_empty() {
        return Err(Error::new(ErrorKind::GenData, "PINV produced no interpolation intervals"));
    }
    Ok((bl, br, total_area, intervals))
}

/// The PINV generator: a piecewise Newton polynomial inverse-CDF plus the
/// guide table that locates the right piece in expected O(1) time.
pub struct PinvGen {
    id: String,
    distr: ContDistr,
    params: ParamsConfig,
    bl: f64,
    br: f64,
    total_area: f64,
    intervals: Vec<Interval>,
    guide: Vec<u32>,
    stream: StreamHandle,
}

#[derive(Clone)]
struct ParamsConfig {
    degree: usize,
    utol: f64,
    tail_cutoff: f64,
    max_intervals: usize,
    guide_factor: f64,
    bounds: Option<(f64, f64)>,
    verify: bool,
}

impl MethodParams for Params {
    fn init(self: Box<Self>, stream: StreamHandle) -> Result<Generator, Error> {
        let (bl, br, total_area, intervals) = setup(&self)?;
        let guide = build_guide(&intervals, self.guide_factor);
        let id = next_id("pinv");
        log::log(&id, format!("setup complete: {} intervals over [{bl:.6}, {br:.6}]", intervals.len()));
        Ok(Generator::Pinv(PinvGen {
            id,
            distr: self.distr.clone(),
            params: ParamsConfig {
                degree: self.degree,
                utol: self.utol,
                tail_cutoff: self.tail_cutoff,
                max_intervals: self.max_intervals,
                guide_factor: self.guide_factor,
                bounds: self.bounds,
                verify: self.verify,
            },
            bl,
            br,
            total_area,
            intervals,
            guide,
            stream,
        }))
    }
}

impl PinvGen {
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
            degree: self.params.degree,
            utol: self.params.utol,
            tail_cutoff: self.params.tail_cutoff,
            max_intervals: self.params.max_intervals,
            guide_factor: self.params.guide_factor,
            bounds: self.params.bounds,
            verify: self.params.verify,
        };
        let (bl, br, total_area, intervals) = setup(&params)?;
        self.guide = build_guide(&intervals, self.params.guide_factor);
        self.bl = bl;
        self.br = br;
        self.total_area = total_area;
        self.intervals = intervals;
        log::log(&self.id, "reinit complete");
        Ok(())
    }

    fn locate(&self, u: f64) -> usize {
        let size = self.guide.len();
        let slot = (u * size as f64) as usize;
        let mut idx = self.guide[slot.min(size - 1)] as usize;
        while idx + 1 < self.intervals.len() && self.intervals[idx].u_hi <= u {
            idx += 1;
        }
        idx
    }

    /// Exactly one uniform draw, one guide lookup, one Horner evaluation.
    pub fn sample(&mut self) -> f64 {
        let u = {
            let mut stream = self.stream.lock().unwrap();
            stream.next()
        };
        let idx = self.locate(u);
        let interval = &self.intervals[idx];
        let x = eval_newton(&interval.nodes, &interval.coeffs, u).clamp(self.bl, self.br);

        if self.params.verify {
            let u_check = cdf_at(&self.distr, self.bl, x, self.total_area);
            if (u_check - u).abs() > 10.0 * self.params.utol.max(1e-8) {
                log::log(&self.id, format!("verify: inversion error {:.3e} at u={u:.6}, x={x:.6}", (u_check - u).abs()));
            }
        }

        x
    }
}

impl Clone for PinvGen {
    fn clone(&self) -> Self {
        PinvGen {
            id: self.id.clone(),
            distr: self.distr.clone(),
            params: self.params.clone(),
            bl: self.bl,
            br: self.br,
            total_area: self.total_area,
            intervals: self.intervals.clone(),
            guide: self.guide.clone(),
            stream: self.stream.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distr::ContDistr;
    use crate::stream::handle;
    use std::f64::consts::PI;

    fn gaussian_distr() -> Distr {
        let mut d = ContDistr::new();
        d.set_pdf(|x| (-0.5 * x * x).exp() / (2.0 * PI).sqrt());
        d.set_area(1.0).unwrap();
        d.set_mode(0.0).unwrap();
        d.into()
    }

    #[test]
    fn setup_succeeds_for_gaussian() {
        let distr = gaussian_distr();
        let params = Params::new(&distr).unwrap().set_degree(5).set_u_tol(1e-9);
        let stream = handle(Box::new(crate::stream::ChaChaStream::new(1)));
        assert!(Box::new(params).init(stream).is_ok());
    }

    #[test]
    fn samples_track_the_normal_quantile_function() {
        let distr = gaussian_distr();
        let params = Params::new(&distr).unwrap().set_degree(5).set_u_tol(1e-10);
        let stream = handle(Box::new(crate::stream::ChaChaStream::new(2)));
        let gen = Box::new(params).init(stream).unwrap();
        if let Generator::Pinv(mut g) = gen {
            let mut mean = 0.0;
            let n = 4000;
            for _ in 0..n {
                mean += g.sample();
            }
            mean /= n as f64;
            assert::close(&[mean], &[0.0], 0.1);
        } else {
            panic!("expected a PINV generator");
        }
    }

    #[test]
    fn rejects_distribution_missing_pdf() {
        let d = ContDistr::new();
        let distr: Distr = d.into();
        assert!(Params::new(&distr).is_err());
    }

    #[test]
    fn verify_mode_samples_without_panicking() {
        let distr = gaussian_distr();
        let params = Params::new(&distr).unwrap().set_degree(5).set_verify(true);
        let stream = handle(Box::new(crate::stream::ChaChaStream::new(3)));
        let gen = Box::new(params).init(stream).unwrap();
        if let Generator::Pinv(mut g) = gen {
            for _ in 0..50 {
                g.sample();
            }
        } else {
            panic!("expected a PINV generator");
        }
    }
}
