//! The generator façade. A live generator is a tagged union over the
//! four methods; the tag determines which `sample_*` call is legal,
//! mirroring the family-arity check the distribution layer performs one
//! level down.

use crate::error::{Error, ErrorKind};
use crate::method::dgt::DgtGen;
use crate::method::pinv::PinvGen;
use crate::method::tdr::TdrGen;
use crate::method::vnrou::VnrouGen;
use crate::stream::StreamHandle;

/// A live generator bound to a uniform stream. `clone`-ing one shares the
/// stream handle by reference unless the clone's stream is replaced with
/// [`Generator::set_stream`]; there is no implicit reseeding.
pub enum Generator {
    Tdr(TdrGen),
    Pinv(PinvGen),
    Dgt(DgtGen),
    Vnrou(VnrouGen),
}

impl Generator {
    pub fn id(&self) -> &str {
        match self {
            Generator::Tdr(g) => g.id(),
            Generator::Pinv(g) => g.id(),
            Generator::Dgt(g) => g.id(),
            Generator::Vnrou(g) => g.id(),
        }
    }

    pub fn stream(&self) -> &StreamHandle {
        match self {
            Generator::Tdr(g) => g.stream(),
            Generator::Pinv(g) => g.stream(),
            Generator::Dgt(g) => g.stream(),
            Generator::Vnrou(g) => g.stream(),
        }
    }

    /// Rebind this generator to a different stream, e.g. to hand a
    /// generator clone an independent substream.
    pub fn set_stream(&mut self, stream: StreamHandle) {
        match self {
            Generator::Tdr(g) => g.set_stream(stream),
            Generator::Pinv(g) => g.set_stream(stream),
            Generator::Dgt(g) => g.set_stream(stream),
            Generator::Vnrou(g) => g.set_stream(stream),
        }
    }

    /// Recompute the generator's tables from the distribution snapshot it
    /// was built from, e.g. after a `Dgt::remove` mutation or simply to
    /// re-run setup with the same parameters.
    pub fn reinit(&mut self) -> Result<(), Error> {
        match self {
            Generator::Tdr(g) => g.reinit(),
            Generator::Pinv(g) => g.reinit(),
            Generator::Dgt(g) => g.reinit(),
            Generator::Vnrou(g) => g.reinit(),
        }
    }

    /// Draw a `CONT`-family variate. Errors if this generator is bound to
    /// a different family.
    pub fn sample_cont(&mut self) -> Result<f64, Error> {
        match self {
            Generator::Tdr(g) => Ok(g.sample()),
            Generator::Pinv(g) => Ok(g.sample()),
            _ => Err(Error::new(ErrorKind::GenInvalid, "sample_cont called on a non-CONT generator")),
        }
    }

    /// Draw a `DISCR`-family variate.
    pub fn sample_discr(&mut self) -> Result<i64, Error> {
        match self {
            Generator::Dgt(g) => Ok(g.sample()),
            _ => Err(Error::new(ErrorKind::GenInvalid, "sample_discr called on a non-DISCR generator")),
        }
    }

    /// Draw a `CVEC`-family variate.
    pub fn sample_vec(&mut self) -> Result<Vec<f64>, Error> {
        match self {
            Generator::Vnrou(g) => g.sample(),
            _ => Err(Error::new(ErrorKind::GenInvalid, "sample_vec called on a non-CVEC generator")),
        }
    }
}

impl Clone for Generator {
    fn clone(&self) -> Self {
        match self {
            Generator::Tdr(g) => Generator::Tdr(g.clone()),
            Generator::Pinv(g) => Generator::Pinv(g.clone()),
            Generator::Dgt(g) => Generator::Dgt(g.clone()),
            Generator::Vnrou(g) => Generator::Vnrou(g.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distr::{ContDistr, DiscrDistr};
    use crate::method::dgt;
    use crate::method::tdr;
    use crate::method::MethodParams;
    use crate::stream::{handle, FixedStream};

    #[test]
    fn sample_discr_on_a_tdr_generator_errors() {
        let mut d = ContDistr::new();
        d.set_pdf(|x| (3.0 / 4.0) * (1.0 - x * x));
        d.set_dpdf(|x| (3.0 / 4.0) * (-2.0 * x));
        d.set_domain(-1.0, 1.0).unwrap();
        let distr = d.into();
        let params = tdr::Params::new(&distr).unwrap().set_transform(tdr::Transform::NegHalf);
        let stream = handle(Box::new(FixedStream::new(vec![0.3, 0.6])));
        let mut gen = Box::new(params).init(stream).unwrap();
        assert!(gen.sample_discr().is_err());
        assert!(gen.sample_cont().is_ok());
    }

    #[test]
    fn clone_shares_the_stream_handle() {
        let mut d = DiscrDistr::new();
        d.set_pv(vec![1.0, 1.0], 0).unwrap();
        let distr = d.into();
        let params = dgt::Params::new(&distr).unwrap();
        let stream = handle(Box::new(FixedStream::new(vec![0.1, 0.9])));
        let gen = Box::new(params).init(stream).unwrap();
        let mut clone = gen.clone();
        assert!(std::sync::Arc::ptr_eq(gen.stream(), clone.stream()));
        assert!(clone.sample_discr().is_ok());
    }
}
