//! DGT: the discrete guide-table method. Exact (no rejection): a single
//! uniform draw, one guide-table lookup, and a short linear scan over a
//! prefix-sum table recover the sampled index.

use crate::distr::{Distr, DiscrDistr};
use crate::error::{Error, ErrorKind};
use crate::gen::Generator;
use crate::method::{next_id, MethodParams};
use crate::stream::StreamHandle;
use crate::support::log;

fn build_table(distr: &DiscrDistr, guide_factor: f64) -> Result<(Vec<f64>, Vec<u32>), Error> {
    let pv = distr.pv().ok_or_else(|| Error::new(ErrorKind::DistrRequired, "DGT requires a probability vector"))?;
    let sum = distr.pv_sum().ok_or_else(|| Error::new(ErrorKind::ShouldNotHappen, "pv_sum missing despite pv being set"))?;
    if !(sum > 0.0) {
        return Err(Error::new(ErrorKind::GenData, "probability vector sums to zero"));
    }
    let mut cum = Vec::with_capacity(pv.len());
    let mut running = 0.0;
    for &p in pv {
        running += p / sum;
        cum.push(running);
    }
    *cum.last_mut().unwrap() = 1.0; // absorb rounding so the guide table never misses the last slot

    let size = ((pv.len() as f64 * guide_factor).ceil() as usize).max(1);
    let mut guide = vec![0u32; size];
    let mut j = 0usize;
    for (slot, g) in guide.iter_mut().enumerate() {
        let target = (slot as f64) / (size as f64);
        while j + 1 < cum.len() && cum[j] <= target {
            j += 1;
        }
        *g = j as u32;
    }
    Ok((cum, guide))
}

/// User-tunable knobs for DGT.
pub struct Params {
    distr: DiscrDistr,
    guide_factor: f64,
    verify: bool,
}

impl Params {
    pub fn new(distr: &Distr) -> Result<Self, Error> {
        let discr = distr
            .as_discr()
            .ok_or_else(|| Error::new(ErrorKind::DistrInvalid, "DGT requires a DISCR distribution"))?;
        if discr.pv().is_none() {
            return Err(Error::new(ErrorKind::DistrRequired, "DGT requires a probability vector"));
        }
        Ok(Params { distr: discr.clone(), guide_factor: 1.0, verify: false })
    }

    /// Guide-table size as a multiple of the probability vector's length;
    /// `1.0` (one slot per mass point) is the classical choice.
    pub fn set_guide_factor(mut self, factor: f64) -> Self {
        self.guide_factor = factor.max(0.1);
        self
    }

    pub fn set_verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }
}

/// The DGT generator: a normalised prefix-sum table plus its guide table.
pub struct DgtGen {
    id: String,
    distr: DiscrDistr,
    guide_factor: f64,
    verify: bool,
    cum: Vec<f64>,
    guide: Vec<u32>,
    stream: StreamHandle,
}

impl MethodParams for Params {
    fn init(self: Box<Self>, stream: StreamHandle) -> Result<Generator, Error> {
        let (cum, guide) = build_table(&self.distr, self.guide_factor)?;
        let id = next_id("dgt");
        log::log(&id, format!("setup complete: {} mass points, guide table size {}", cum.len(), guide.len()));
        Ok(Generator::Dgt(DgtGen {
            id,
            distr: self.distr.clone(),
            guide_factor: self.guide_factor,
            verify: self.verify,
            cum,
            guide,
            stream,
        }))
    }
}

impl DgtGen {
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
        let (cum, guide) = build_table(&self.distr, self.guide_factor)?;
        self.cum = cum;
        self.guide = guide;
        log::log(&self.id, "reinit complete");
        Ok(())
    }

    /// Zero out the mass at `k` and rebuild the table, the classic
    /// sample-without-replacement idiom. This rebuilds the whole guide
    /// table rather than patching only the affected slots; a
    /// from-scratch rebuild is simpler to keep correct and `n` is
    /// typically small enough that the cost doesn't matter.
    pub fn remove(&mut self, k: i64) -> Result<(), Error> {
        let offset = self.distr.pv_offset();
        let idx = (k - offset) as i64;
        let mut pv: Vec<f64> = self
            .distr
            .pv()
            .ok_or_else(|| Error::new(ErrorKind::ShouldNotHappen, "pv missing on a live DGT generator"))?
            .to_vec();
        if idx < 0 || idx as usize >= pv.len() {
            return Err(Error::new(ErrorKind::DistrDomain, "index lies outside the probability vector"));
        }
        pv[idx as usize] = 0.0;
        self.distr.set_pv(pv, offset)?;
        self.reinit()
    }

    fn locate(&self, u: f64) -> usize {
        let size = self.guide.len();
        let slot = (u * size as f64) as usize;
        let mut idx = self.guide[slot.min(size - 1)] as usize;
        while idx + 1 < self.cum.len() && self.cum[idx] <= u {
            idx += 1;
        }
        idx
    }

    pub fn sample(&mut self) -> i64 {
        let u = {
            let mut stream = self.stream.lock().unwrap();
            stream.next()
        };
        let idx = self.locate(u);

        if self.verify && idx > 0 {
            let width = self.cum[idx] - self.cum[idx - 1];
            if !(width >= 0.0) {
                log::log(&self.id, format!("verify: cumulative table is non-monotone at index {idx}"));
            }
        }

        self.distr.pv_offset() + idx as i64
    }
}

impl Clone for DgtGen {
    fn clone(&self) -> Self {
        DgtGen {
            id: self.id.clone(),
            distr: self.distr.clone(),
            guide_factor: self.guide_factor,
            verify: self.verify,
            cum: self.cum.clone(),
            guide: self.guide.clone(),
            stream: self.stream.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{handle, FixedStream};

    fn three_point_distr() -> Distr {
        let mut d = DiscrDistr::new();
        d.set_pv(vec![1.0, 2.0, 1.0], 0).unwrap();
        d.into()
    }

    #[test]
    fn cum_table_ends_at_one() {
        let distr = three_point_distr();
        let params = Params::new(&distr).unwrap();
        let stream = handle(Box::new(FixedStream::new(vec![0.99])));
        let gen = Box::new(params).init(stream).unwrap();
        if let Generator::Dgt(g) = gen {
            assert!((g.cum.last().unwrap() - 1.0).abs() < 1e-15);
        } else {
            panic!("expected a DGT generator");
        }
    }

    #[test]
    fn samples_respect_un_normalised_weights() {
        let distr = three_point_distr();
        let params = Params::new(&distr).unwrap();
        let stream = handle(Box::new(crate::stream::ChaChaStream::new(5)));
        let gen = Box::new(params).init(stream).unwrap();
        if let Generator::Dgt(mut g) = gen {
            let mut counts = [0u32; 3];
            for _ in 0..4000 {
                let k = g.sample();
                counts[k as usize] += 1;
            }
            // weight ratio is 1:2:1, so the middle bucket should dominate
            assert!(counts[1] > counts[0] && counts[1] > counts[2]);
        } else {
            panic!("expected a DGT generator");
        }
    }

    #[test]
    fn remove_excludes_the_point_from_future_samples() {
        let distr = three_point_distr();
        let params = Params::new(&distr).unwrap();
        let stream = handle(Box::new(crate::stream::ChaChaStream::new(9)));
        let gen = Box::new(params).init(stream).unwrap();
        if let Generator::Dgt(mut g) = gen {
            g.remove(1).unwrap();
            for _ in 0..500 {
                assert_ne!(g.sample(), 1);
            }
        } else {
            panic!("expected a DGT generator");
        }
    }

    #[test]
    fn rejects_distribution_without_pv() {
        let d = DiscrDistr::new();
        let distr: Distr = d.into();
        assert!(Params::new(&distr).is_err());
    }

    #[test]
    fn verify_mode_samples_without_panicking() {
        let distr = three_point_distr();
        let params = Params::new(&distr).unwrap().set_verify(true);
        let stream = handle(Box::new(crate::stream::ChaChaStream::new(4)));
        let gen = Box::new(params).init(stream).unwrap();
        if let Generator::Dgt(mut g) = gen {
            for _ in 0..50 {
                g.sample();
            }
        } else {
            panic!("expected a DGT generator");
        }
    }
}
