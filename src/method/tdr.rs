//! TDR: transformed density rejection.
//!
//! Builds a piecewise hat (and, outside the `IA` variant, a piecewise
//! squeeze) over a monotone transform `T_c` of the density chosen so that
//! `T_c(f)` is concave, then samples by inverting the hat's integral and
//! falling back to the density itself on rejection.

use crate::distr::{ContDistr, Distr, Family};
use crate::error::{Error, ErrorKind};
use crate::gen::Generator;
use crate::method::{next_id, MethodParams};
use crate::stream::StreamHandle;
use crate::support::float::finite;
use crate::support::log;

/// `T_c(x) = sign(c) * x^c`; `c = 0` is read as `log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Log,
    NegHalf,
    NegOne,
}

impl Transform {
    fn t(self, y: f64) -> f64 {
        match self {
            Transform::Log => y.ln(),
            Transform::NegHalf => -y.powf(-0.5),
            Transform::NegOne => -1.0 / y,
        }
    }

    fn tinv(self, t: f64) -> f64 {
        match self {
            Transform::Log => t.exp(),
            Transform::NegHalf => 1.0 / (t * t),
            Transform::NegOne => -1.0 / t,
        }
    }

    /// `T'(y) * yp`: the chain-rule slope of `T(f(x))` at a point where
    /// `f(x) = y`, `f'(x) = yp`.
    fn slope(self, y: f64, yp: f64) -> f64 {
        match self {
            Transform::Log => yp / y,
            Transform::NegHalf => 0.5 * yp / y.powf(1.5),
            Transform::NegOne => yp / (y * y),
        }
    }

    fn hat_value(self, a: f64, b: f64, dx: f64) -> f64 {
        self.tinv(a + b * dx)
    }

    /// Signed cumulative hat area from the anchor (`dx = 0`) to `dx`.
    fn area(self, a: f64, b: f64, dx: f64) -> f64 {
        if dx == 0.0 {
            return 0.0;
        }
        match self {
            Transform::Log => {
                let f0 = a.exp();
                if b.abs() < 1e-300 {
                    f0 * dx
                } else {
                    f0 / b * ((b * dx).exp() - 1.0)
                }
            }
            Transform::NegHalf => {
                if b.abs() < 1e-300 {
                    dx / (a * a)
                } else {
                    -1.0 / b * (1.0 / (a + b * dx) - 1.0 / a)
                }
            }
            Transform::NegOne => {
                if b.abs() < 1e-300 {
                    -dx / a
                } else {
                    -(1.0 / b) * ((a + b * dx).abs().ln() - a.abs().ln())
                }
            }
        }
    }

    /// Inverse of [`Self::area`]: the `dx` whose cumulative area from the
    /// anchor equals `target` (an *absolute* area measured from `dx=0`,
    /// which may be negative when `target` itself derives from a
    /// negative-`dx` tail).
    fn invert_area(self, a: f64, b: f64, target: f64) -> f64 {
        if target == 0.0 {
            return 0.0;
        }
        match self {
            Transform::Log => {
                let f0 = a.exp();
                if b.abs() < 1e-300 {
                    target / f0
                } else {
                    (1.0 + b * target / f0).ln() / b
                }
            }
            Transform::NegHalf => {
                if b.abs() < 1e-300 {
                    target * a * a
                } else {
                    (1.0 / (1.0 / a - b * target) - a) / b
                }
            }
            Transform::NegOne => {
                if b.abs() < 1e-300 {
                    -target * a
                } else {
                    a * ((-b * target).exp() - 1.0) / b
                }
            }
        }
    }
}

/// Hat-construction variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Gilks & Wild tangent hat with a secant-in-`T`-space squeeze.
    Gw,
    /// Proportional squeeze: a flat floor at `min(f(xl), f(xr))`.
    Ps,
    /// Immediate acceptance: no squeeze is maintained at all.
    Ia,
}

#[derive(Clone, Copy)]
struct Node {
    x: f64,
    f: f64,
    t: f64,
    slope: f64,
}

fn make_node(distr: &ContDistr, transform: Transform, x: f64) -> Result<Node, Error> {
    let f = distr.pdf(x).ok_or_else(|| Error::new(ErrorKind::DistrRequired, "pdf required for TDR"))?;
    let fp = distr.dpdf(x).ok_or_else(|| Error::new(ErrorKind::DistrRequired, "dpdf required for TDR"))?;
    if !(f > 0.0) || !finite(f) || !finite(fp) {
        return Err(Error::new(ErrorKind::GenData, "non-finite or non-positive density at a construction point"));
    }
    let t = transform.t(f);
    let slope = transform.slope(f, fp);
    if !finite(t) || !finite(slope) {
        return Err(Error::new(ErrorKind::GenCondition, "non-finite tangent slope; density may not be log-concave under the chosen transform"));
    }
    Ok(Node { x, f, t, slope })
}

#[derive(Clone, Copy)]
enum Squeeze {
    None,
    Secant { xl: f64, a: f64, b: f64 },
    Flat(f64),
}

impl Squeeze {
    fn value(&self, transform: Transform, x: f64) -> f64 {
        match *self {
            Squeeze::None => 0.0,
            Squeeze::Secant { xl, a, b } => transform.hat_value(a, b, x - xl),
            Squeeze::Flat(v) => v,
        }
    }
}

/// One piece of the piecewise hat: a single tangent (or secant) line in
/// `T`-space, anchored at `anchor_x`, valid over the half-open local
/// range `[dx_lo, dx_hi]` relative to the anchor.
#[derive(Clone, Copy)]
struct Piece {
    anchor_x: f64,
    a: f64,
    b: f64,
    dx_lo: f64,
    dx_hi: f64,
    area: f64,
    squeeze: Squeeze,
}

impl Piece {
    fn hat(&self, transform: Transform, x: f64) -> f64 {
        transform.hat_value(self.a, self.b, x - self.anchor_x)
    }

    fn sample_x(&self, transform: Transform, u_local: f64) -> f64 {
        let base = transform.area(self.a, self.b, self.dx_lo);
        let dx = transform.invert_area(self.a, self.b, base + u_local);
        self.anchor_x + dx
    }
}

fn arcmean(xl: f64, xr: f64) -> f64 {
    ((xl.atan() + xr.atan()) * 0.5).tan()
}

/// A gap between two adjacent construction points (or one construction
/// point and a domain boundary, for the two tails).
#[derive(Clone, Copy)]
struct Gap {
    left_x: f64,
    right_x: f64,
    pieces: [Option<Piece>; 2],
    squeeze_area: f64,
    is_tail: bool,
}

impl Gap {
    fn hat_area(&self) -> f64 {
        self.pieces.iter().flatten().map(|p| p.area).sum()
    }

    fn ratio(&self) -> f64 {
        if self.is_tail {
            0.0 // tails are excluded from the refinement priority queue
        } else if self.squeeze_area > 1e-300 {
            self.hat_area() / self.squeeze_area
        } else {
            f64::INFINITY
        }
    }
}

fn build_middle_gap(
    transform: Transform,
    variant: Variant,
    left: Node,
    right: Node,
) -> Result<Gap, Error> {
    let width = right.x - left.x;
    let squeeze = match variant {
        Variant::Ia => Squeeze::None,
        Variant::Ps => Squeeze::Flat(left.f.min(right.f)),
        Variant::Gw => Squeeze::Secant { xl: left.x, a: left.t, b: (right.t - left.t) / width },
    };
    let squeeze_area = match squeeze {
        Squeeze::None => 0.0,
        Squeeze::Flat(v) => v * width,
        Squeeze::Secant { a, b, .. } => transform.area(a, b, width).abs(),
    };

    if (left.slope - right.slope).abs() < 1e-12 {
        // Parallel tangents: a single line spans the whole gap.
        let area = transform.area(left.t, left.slope, width);
        let piece = Piece { anchor_x: left.x, a: left.t, b: left.slope, dx_lo: 0.0, dx_hi: width, area, squeeze };
        return Ok(Gap { left_x: left.x, right_x: right.x, pieces: [Some(piece), None], squeeze_area, is_tail: false });
    }

    let xs = (right.t - left.t + left.slope * left.x - right.slope * right.x) / (left.slope - right.slope);
    if !finite(xs) || xs <= left.x || xs >= right.x {
        return Err(Error::new(
            ErrorKind::GenCondition,
            "tangents do not intersect inside the interval; density is not log-concave under the chosen transform",
        ));
    }

    let left_area = transform.area(left.t, left.slope, xs - left.x);
    let right_area = -transform.area(right.t, right.slope, xs - right.x);
    let left_piece = Piece { anchor_x: left.x, a: left.t, b: left.slope, dx_lo: 0.0, dx_hi: xs - left.x, area: left_area, squeeze };
    let right_piece = Piece { anchor_x: right.x, a: right.t, b: right.slope, dx_lo: xs - right.x, dx_hi: 0.0, area: right_area, squeeze };
    Ok(Gap { left_x: left.x, right_x: right.x, pieces: [Some(left_piece), Some(right_piece)], squeeze_area, is_tail: false })
}

fn build_tail_gap(transform: Transform, node: Node, boundary: f64, on_left: bool) -> Result<Gap, Error> {
    let (dx_lo, dx_hi, left_x, right_x) = if on_left {
        (boundary - node.x, 0.0, boundary, node.x)
    } else {
        (0.0, boundary - node.x, node.x, boundary)
    };
    if on_left && !dx_lo.is_finite() && !(node.slope > 0.0) {
        return Err(Error::new(ErrorKind::GenCondition, "unbounded left tail requires a positive hat slope"));
    }
    if !on_left && !dx_hi.is_finite() && !(node.slope < 0.0) {
        return Err(Error::new(ErrorKind::GenCondition, "unbounded right tail requires a negative hat slope"));
    }
    let area = transform.area(node.t, node.slope, dx_hi) - transform.area(node.t, node.slope, dx_lo);
    if !finite(area) || area < 0.0 {
        return Err(Error::new(ErrorKind::GenData, "non-finite or negative tail hat area"));
    }
    let piece = Piece { anchor_x: node.x, a: node.t, b: node.slope, dx_lo, dx_hi, area, squeeze: Squeeze::None };
    Ok(Gap { left_x, right_x, pieces: [Some(piece), None], squeeze_area: 0.0, is_tail: true })
}

/// User-tunable knobs for TDR, consumed by [`MethodParams::init`].
pub struct Params {
    distr: ContDistr,
    transform: Transform,
    variant: Variant,
    cpoints: Option<Vec<f64>>,
    n_default: usize,
    max_ratio: f64,
    max_intervals: usize,
    guide_factor: f64,
    adaptive: bool,
    verify: bool,
}

impl Params {
    pub fn new(distr: &Distr) -> Result<Self, Error> {
        let cont = distr
            .as_cont()
            .ok_or_else(|| Error::new(ErrorKind::DistrInvalid, "TDR requires a CONT distribution"))?;
        if !cont.has_pdf() || !cont.has_dpdf() {
            return Err(Error::new(ErrorKind::DistrRequired, "TDR requires both pdf and dpdf"));
        }
        Ok(Params {
            distr: cont.clone(),
            transform: Transform::Log,
            variant: Variant::Gw,
            cpoints: None,
            n_default: 10,
            max_ratio: 1.1,
            max_intervals: 200,
            guide_factor: 2.0,
            adaptive: true,
            verify: false,
        })
    }

    pub fn set_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn set_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn set_cpoints(mut self, cpoints: Vec<f64>) -> Self {
        self.cpoints = Some(cpoints);
        self
    }

    pub fn set_n_default(mut self, n: usize) -> Self {
        self.n_default = n.max(2);
        self
    }

    pub fn set_max_ratio(mut self, ratio: f64) -> Self {
        self.max_ratio = ratio;
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

    pub fn set_adaptive(mut self, enabled: bool) -> Self {
        self.adaptive = enabled;
        self
    }

    pub fn set_verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }
}

fn default_cpoints(domain: (f64, f64), center: f64, n: usize) -> Vec<f64> {
    let (a, b) = domain;
    if a.is_finite() && b.is_finite() {
        let step = (b - a) / (n as f64 + 1.0);
        (1..=n).map(|i| a + step * i as f64).collect()
    } else {
        let mut pts = vec![center];
        let mut scale = 1.0;
        for _ in 0..(n / 2).max(1) {
            let left = center - scale;
            let right = center + scale;
            if !a.is_finite() || left > a {
                pts.push(left);
            }
            if !b.is_finite() || right < b {
                pts.push(right);
            }
            scale *= 2.0;
        }
        pts.sort_by(|x, y| x.partial_cmp(y).unwrap());
        pts.dedup_by(|x, y| (*x - *y).abs() < 1e-12);
        pts
    }
}

fn setup(params: &Params) -> Result<(Vec<Node>, Vec<Gap>, f64), Error> {
    let domain = params.distr.domain();
    let center = params.distr.center();
    let mut xs = params.cpoints.clone().unwrap_or_else(|| default_cpoints(domain, center, params.n_default));
    xs.retain(|&x| x > domain.0 && x < domain.1 && finite(x));
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    xs.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
    if xs.len() < 2 {
        return Err(Error::new(ErrorKind::ParamSet, "TDR needs at least two construction points"));
    }

    let mut nodes: Vec<Node> = xs.iter().map(|&x| make_node(&params.distr, params.transform, x)).collect::<Result<_, _>>()?;

    loop {
        let mut gaps = Vec::with_capacity(nodes.len() - 1);
        for w in nodes.windows(2) {
            gaps.push(build_middle_gap(params.transform, params.variant, w[0], w[1])?);
        }

        if !params.adaptive || nodes.len() >= params.max_intervals + 1 {
            return finalize(params, nodes, gaps, domain);
        }

        let (worst_idx, worst_ratio) = gaps
            .iter()
            .enumerate()
            .map(|(i, g)| (i, g.ratio()))
            .fold((0usize, 0.0f64), |acc, cur| if cur.1 > acc.1 { cur } else { acc });

        if !worst_ratio.is_finite() && worst_ratio != f64::INFINITY {
            return Err(Error::new(ErrorKind::GenData, "non-finite hat/squeeze ratio during refinement"));
        }
        if worst_ratio <= params.max_ratio {
            return finalize(params, nodes, gaps, domain);
        }

        let left = nodes[worst_idx];
        let right = nodes[worst_idx + 1];
        let new_x = arcmean(left.x, right.x);
        if !(new_x > left.x && new_x < right.x) {
            // Degenerate split point: stop refining this gap further.
            return finalize(params, nodes, gaps, domain);
        }
        let new_node = make_node(&params.distr, params.transform, new_x)?;
        nodes.insert(worst_idx + 1, new_node);
    }
}

fn finalize(params: &Params, nodes: Vec<Node>, middle_gaps: Vec<Gap>, domain: (f64, f64)) -> Result<(Vec<Node>, Vec<Gap>, f64), Error> {
    let mut gaps = Vec::with_capacity(middle_gaps.len() + 2);
    gaps.push(build_tail_gap(params.transform, nodes[0], domain.0, true)?);
    gaps.extend(middle_gaps);
    gaps.push(build_tail_gap(params.transform, *nodes.last().unwrap(), domain.1, false)?);
    let total_area: f64 = gaps.iter().map(|g| g.hat_area()).sum();
    if !(total_area > 0.0) || !finite(total_area) {
        return Err(Error::new(ErrorKind::GenData, "non-finite total hat area"));
    }
    Ok((nodes, gaps, total_area))
}

fn flatten(gaps: &[Gap]) -> (Vec<Piece>, Vec<f64>) {
    let mut pieces = Vec::new();
    for gap in gaps {
        for p in gap.pieces.iter().flatten() {
            pieces.push(*p);
        }
    }
    let mut cum = Vec::with_capacity(pieces.len());
    let mut running = 0.0;
    for p in &pieces {
        running += p.area;
        cum.push(running);
    }
    (pieces, cum)
}

fn build_guide(cum: &[f64], total_area: f64, factor: f64) -> Vec<u32> {
    let size = ((cum.len() as f64 * factor).ceil() as usize).max(1);
    let mut guide = vec![0u32; size];
    let mut j = 0usize;
    for (slot, g) in guide.iter_mut().enumerate() {
        let target = total_area * (slot as f64) / (size as f64);
        while j + 1 < cum.len() && cum[j] <= target {
            j += 1;
        }
        *g = j as u32;
    }
    guide
}

/// The TDR generator: an immutable-from-outside piecewise hat/squeeze
/// over a captured distribution snapshot, plus the guide table used to
/// locate a piece in O(1) expected time.
pub struct TdrGen {
    id: String,
    distr: ContDistr,
    params: ParamsConfig,
    pieces: Vec<Piece>,
    cum: Vec<f64>,
    guide: Vec<u32>,
    total_area: f64,
    stream: StreamHandle,
}

#[derive(Clone)]
struct ParamsConfig {
    transform: Transform,
    variant: Variant,
    cpoints: Option<Vec<f64>>,
    n_default: usize,
    max_ratio: f64,
    max_intervals: usize,
    guide_factor: f64,
    adaptive: bool,
    verify: bool,
}

impl MethodParams for Params {
    fn init(self: Box<Self>, stream: StreamHandle) -> Result<Generator, Error> {
        let (_nodes, gaps, total_area) = setup(&self)?;
        let (pieces, cum) = flatten(&gaps);
        let guide = build_guide(&cum, total_area, self.guide_factor);
        let id = next_id("tdr");
        log::log(&id, format!("setup complete: {} pieces, hat area {:.6}", pieces.len(), total_area));
        Ok(Generator::Tdr(TdrGen {
            id,
            distr: self.distr.clone(),
            params: ParamsConfig {
                transform: self.transform,
                variant: self.variant,
                cpoints: self.cpoints.clone(),
                n_default: self.n_default,
                max_ratio: self.max_ratio,
                max_intervals: self.max_intervals,
                guide_factor: self.guide_factor,
                adaptive: self.adaptive,
                verify: self.verify,
            },
            pieces,
            cum,
            guide,
            total_area,
            stream,
        }))
    }
}

impl TdrGen {
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
            transform: self.params.transform,
            variant: self.params.variant,
            cpoints: self.params.cpoints.clone(),
            n_default: self.params.n_default,
            max_ratio: self.params.max_ratio,
            max_intervals: self.params.max_intervals,
            guide_factor: self.params.guide_factor,
            adaptive: self.params.adaptive,
            verify: self.params.verify,
        };
        let (_nodes, gaps, total_area) = setup(&params)?;
        let (pieces, cum) = flatten(&gaps);
        self.guide = build_guide(&cum, total_area, self.params.guide_factor);
        self.pieces = pieces;
        self.cum = cum;
        self.total_area = total_area;
        log::log(&self.id, "reinit complete");
        Ok(())
    }

    fn locate(&self, u: f64) -> usize {
        let size = self.guide.len();
        let slot = ((u / self.total_area) * size as f64) as usize;
        let mut idx = self.guide[slot.min(size - 1)] as usize;
        while idx + 1 < self.cum.len() && self.cum[idx] <= u {
            idx += 1;
        }
        idx
    }

    pub fn sample(&mut self) -> f64 {
        loop {
            let u = {
                let mut stream = self.stream.lock().unwrap();
                stream.next() * self.total_area
            };
            let idx = self.locate(u);
            let before = if idx == 0 { 0.0 } else { self.cum[idx - 1] };
            let u_local = u - before;
            let piece = self.pieces[idx];
            let x = piece.sample_x(self.params.transform, u_local);
            let hat = piece.hat(self.params.transform, x);

            let v = {
                let mut stream = self.stream.lock().unwrap();
                stream.next()
            };

            if self.params.verify {
                if let Some(f) = self.distr.pdf(x) {
                    if f > hat * (1.0 + 1e-9) {
                        log::log(&self.id, format!("verify: hat domination violated at x={x:.6}, f={f:.6}, hat={hat:.6}"));
                    }
                }
            }

            if !matches!(self.params.variant, Variant::Ia) {
                let squeeze = piece.squeeze.value(self.params.transform, x);
                if v * hat <= squeeze {
                    return x;
                }
            }

            let f = match self.distr.pdf(x) {
                Some(f) => f,
                None => continue,
            };
            if v * hat <= f {
                return x;
            }
        }
    }
}

impl Clone for TdrGen {
    fn clone(&self) -> Self {
        TdrGen {
            id: self.id.clone(),
            distr: self.distr.clone(),
            params: self.params.clone(),
            pieces: self.pieces.clone(),
            cum: self.cum.clone(),
            guide: self.guide.clone(),
            total_area: self.total_area,
            stream: self.stream.clone(),
        }
    }
}
