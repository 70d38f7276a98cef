//! Error sink for per-connection failures.
//!
//! Connection errors never reach the client once a reply is out, so they are
//! handed to a [`Logger`]. Implementations are shared by every connection and
//! must not fail; anything they cannot record is dropped.

use std::fmt;

/// Logger is the diagnostic sink the server reports connection errors to
pub trait Logger: Send + Sync {
    fn error(&self, args: fmt::Arguments<'_>);
}

/// TracingLogger forwards errors to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!("{}", args);
    }
}

/// NoOutputLogger discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOutputLogger;

impl Logger for NoOutputLogger {
    fn error(&self, _args: fmt::Arguments<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Capture(Mutex<Vec<String>>);

    impl Logger for Capture {
        fn error(&self, args: fmt::Arguments<'_>) {
            self.0.lock().unwrap().push(args.to_string());
        }
    }

    #[test]
    fn test_logger_as_trait_object() {
        let capture = Arc::new(Capture::default());
        let logger: Arc<dyn Logger> = capture.clone();

        logger.error(format_args!("connection error: {}", "reset"));
        NoOutputLogger.error(format_args!("dropped"));

        assert_eq!(*capture.0.lock().unwrap(), vec!["connection error: reset"]);
    }
}
