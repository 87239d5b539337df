//! Time-bounded calls
//!
//! Stores and sinks are synchronous. A bounded call runs on a helper
//! thread; if it does not answer in time the caller moves on and the
//! thread's eventual result is dropped.

use crate::{OmrError, OmrResult};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Run `f`, giving up after `timeout`. `None` runs `f` inline.
pub fn run_bounded<T, F>(what: &str, timeout: Option<Duration>, f: F) -> OmrResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> OmrResult<T> + Send + 'static,
{
    let Some(timeout) = timeout else {
        return f();
    };
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name(format!("bounded-{}", what))
        .spawn(move || {
            // the receiver is gone after a timeout
            let _ = tx.send(f());
        })
        .map_err(|e| OmrError::Timeout(format!("{}: cannot spawn worker: {}", what, e)))?;
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(OmrError::Timeout(format!(
            "{} did not finish within {} ms",
            what,
            timeout.as_millis()
        ))),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(OmrError::Timeout(format!(
            "{} worker exited without a result",
            what
        ))),
    }
}
