//! Universal non-uniform random variate generation over arbitrary
//! user-specified distributions.
//!
//! A distribution object ([`distr::Distr`]) is built up attribute by
//! attribute, handed to a method's parameter object (one of
//! [`method::tdr`], [`method::pinv`], [`method::dgt`],
//! [`method::vnrou`]), and `init`-ed against a uniform stream
//! ([`stream`]) into a live [`gen::Generator`]. Errors are reported
//! through a `Result` and, in parallel, through the process-wide channel
//! in [`error`].

pub mod distr;
pub mod error;
pub mod gen;
pub mod method;
pub mod stream;
pub mod support;

pub use distr::Distr;
pub use error::{Error, ErrorKind};
pub use gen::Generator;
pub use stream::{handle as stream_handle, ChaChaStream, StreamHandle, UniformStream};
