//! L4: the universal generator methods. Each submodule owns a `Params`
//! builder (consumed by `init`) and a generator struct holding the
//! method's auxiliary tables.

pub mod dgt;
pub mod pinv;
pub mod tdr;
pub mod vnrou;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;
use crate::gen::Generator;
use crate::stream::StreamHandle;

/// A parameter object, consumed by [`init`] to produce a [`Generator`].
/// A short-lived builder: once `init` consumes it, its memory is
/// released and it cannot be reused.
pub trait MethodParams {
    fn init(self: Box<Self>, stream: StreamHandle) -> Result<Generator, Error>;
}

/// `init(par) -> gen | error`: consumes `par` and binds the resulting
/// generator to `stream`.
pub fn init(params: Box<dyn MethodParams>, stream: StreamHandle) -> Result<Generator, Error> {
    params.init(stream)
}

static GEN_SEQ: AtomicU64 = AtomicU64::new(1);

/// Allocate the next `<method>.<seq>` debug identifier.
pub fn next_id(method: &str) -> String {
    let seq = GEN_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{method}.{seq}")
}
