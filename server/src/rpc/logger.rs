use std::fmt::Display;

use log::{debug, error, info};

/// Per-call logger bound to the RPC method name. One is created at the top
/// of each handler and threaded through the tasks the call spawns, so
/// every line the call emits carries its method. tonic interceptors only
/// see requests, so the binding is an explicit value rather than ambient
/// call context.
#[derive(Clone, Copy)]
pub struct CallLogger {
    method: &'static str,
}

impl CallLogger {
    pub fn new(method: &'static str) -> Self {
        Self { method }
    }

    pub fn debug(&self, message: impl Display) {
        debug!("method={} {message}", self.method);
    }

    pub fn info(&self, message: impl Display) {
        info!("method={} {message}", self.method);
    }

    pub fn error(&self, message: impl Display) {
        error!("method={} {message}", self.method);
    }
}
