//! A single caller-replaceable debug log stream. The default sink
//! forwards to the `log` crate so host applications see it through
//! whatever subscriber they already have wired up.

use std::sync::Mutex;

use once_cell::sync::Lazy;

/// A sink for the structured dumps `init` and `sample` (under
/// verification) produce. Implementors decide how/where to render the
/// record; the format itself is not a stable contract.
pub trait LogSink: Send + Sync {
    fn record(&self, generator_id: &str, message: &str);
}

struct DefaultSink;

impl LogSink for DefaultSink {
    fn record(&self, generator_id: &str, message: &str) {
        log::debug!("{generator_id}: {message}");
    }
}

static SINK: Lazy<Mutex<Box<dyn LogSink>>> = Lazy::new(|| Mutex::new(Box::new(DefaultSink)));

/// Install a replacement log sink. Not thread-safe to call concurrently
/// with logging from other threads; intended for startup.
pub fn set_default_log(sink: Box<dyn LogSink>) {
    *SINK.lock().unwrap() = sink;
}

/// Write a record to the currently installed sink.
pub fn log(generator_id: &str, message: impl AsRef<str>) {
    SINK.lock().unwrap().record(generator_id, message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    struct CapturingSink(Arc<StdMutex<Vec<String>>>);

    impl LogSink for CapturingSink {
        fn record(&self, generator_id: &str, message: &str) {
            self.0.lock().unwrap().push(format!("{generator_id}: {message}"));
        }
    }

    #[test]
    fn custom_sink_receives_records() {
        let captured = Arc::new(StdMutex::new(Vec::new()));
        set_default_log(Box::new(CapturingSink(captured.clone())));
        log("tdr.1", "setup complete");
        assert_eq!(captured.lock().unwrap().last().unwrap(), "tdr.1: setup complete");
        set_default_log(Box::new(DefaultSink));
    }
}
