use tonic::{Code, Status};

use super::logger::CallLogger;

/// Reports a terminal call error through the call's logger. Cancellation
/// and deadline expiry are the caller tearing the call down, not server
/// failures, and stay silent.
pub fn report(logger: &CallLogger, status: &Status) {
    if matches!(status.code(), Code::Cancelled | Code::DeadlineExceeded) {
        return;
    }

    logger.error(format!(
        "failed to handle request: code={:?} message={:?}",
        status.code(),
        status.message()
    ));
}
