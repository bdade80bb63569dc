//! Error taxonomy and the dual error-reporting channel described in the
//! design (an out-of-band `Result` from the failing call, plus a
//! process-global last-error cell and a caller-replaceable handler).

use std::sync::Mutex;

use once_cell::sync::Lazy;

/// A single error kind, grouped by the subject that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("distribution: invalid attribute value")]
    DistrSet,
    #[error("distribution: unset attribute read")]
    DistrGet,
    #[error("distribution: wrong parameter count")]
    DistrNParams,
    #[error("distribution: value outside declared domain")]
    DistrDomain,
    #[error("distribution: method-required attribute missing")]
    DistrRequired,
    #[error("distribution: family mismatch")]
    DistrInvalid,

    #[error("parameter object: invalid tuning value")]
    ParamSet,
    #[error("parameter object: unsupported variant combination")]
    ParamVariant,
    #[error("parameter object: invalid")]
    ParamInvalid,

    #[error("generator: suspect numerical result during setup")]
    GenData,
    #[error("generator: method precondition violated")]
    GenCondition,
    #[error("generator: invalid")]
    GenInvalid,

    #[error("numeric: roundoff error accumulated")]
    NumericRoundoff,
    #[error("numeric: not-a-number encountered")]
    NumericNan,
    #[error("numeric: overflow")]
    NumericOverflow,
    #[error("numeric: underflow")]
    NumericUnderflow,

    #[error("resource: allocation failed")]
    ResourceAlloc,
    #[error("resource: unexpected null")]
    ResourceNull,

    #[error("internal: should not happen")]
    ShouldNotHappen,
}

/// Severity attached to an error report, independent of whether it is
/// ultimately surfaced as an `Err` (setup failures always are; sampling
/// anomalies that don't violate contract are recovered silently and only
/// logged).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// The error type returned by fallible public operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {reason}")]
pub struct Error {
    pub kind: ErrorKind,
    pub reason: String,
}

impl Error {
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Error { kind, reason: reason.into() }
    }
}

/// The `{object-id, source-file, line, severity, code, reason}` record
/// passed to the error handler, and the same record from which the
/// last-error cell is populated.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub object_id: String,
    pub source_file: &'static str,
    pub line: u32,
    pub severity: Severity,
    pub kind: ErrorKind,
    pub reason: String,
}

type Handler = dyn Fn(&ErrorContext) + Send + Sync;

static LAST_ERROR: Lazy<Mutex<Option<ErrorContext>>> = Lazy::new(|| Mutex::new(None));
static HANDLER: Lazy<Mutex<Option<Box<Handler>>>> = Lazy::new(|| Mutex::new(None));

/// Report an error through both channels: update the last-error cell and
/// invoke the caller-replaceable handler, if any. Returns the same
/// `Error` so call sites can `return Err(report(...))`.
#[track_caller]
pub(crate) fn report(object_id: &str, severity: Severity, kind: ErrorKind, reason: impl Into<String>) -> Error {
    let reason = reason.into();
    let location = std::panic::Location::caller();
    let ctx = ErrorContext {
        object_id: object_id.to_string(),
        source_file: location.file(),
        line: location.line(),
        severity,
        kind,
        reason: reason.clone(),
    };
    if let Some(handler) = HANDLER.lock().unwrap().as_ref() {
        handler(&ctx);
    }
    *LAST_ERROR.lock().unwrap() = Some(ctx);
    Error::new(kind, reason)
}

/// Read the last error recorded by any operation on this thread's process
/// (the cell is process-wide, matching an errno-style contract).
pub fn get_errno() -> Option<ErrorContext> {
    LAST_ERROR.lock().unwrap().clone()
}

/// Clear the last-error cell.
pub fn clear_errno() {
    *LAST_ERROR.lock().unwrap() = None;
}

/// Install a caller-replaceable error handler. Not thread-safe to call
/// concurrently with other operations; intended for startup.
pub fn set_error_handler<F>(handler: F)
where
    F: Fn(&ErrorContext) + Send + Sync + 'static,
{
    *HANDLER.lock().unwrap() = Some(Box::new(handler));
}

/// Remove any installed error handler.
pub fn clear_error_handler() {
    *HANDLER.lock().unwrap() = None;
}
