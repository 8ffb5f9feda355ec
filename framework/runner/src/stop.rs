use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Tells helper threads that the engine process has exited.
#[derive(Debug, Clone, Default)]
pub(crate) struct StopHandle {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl StopHandle {
    pub(crate) fn stop(&self) {
        let (stopped, signal) = &*self.state;
        match stopped.lock() {
            Ok(mut stopped) => *stopped = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
        signal.notify_all();
    }

    pub(crate) fn new_listener(&self) -> StopListener {
        StopListener {
            state: self.state.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StopListener {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl StopListener {
    /// Point in time check of whether the stop signal has been sent.
    pub(crate) fn should_stop(&self) -> bool {
        let (stopped, _) = &*self.state;
        match stopped.lock() {
            Ok(stopped) => *stopped,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Sleep for up to `timeout`, returning early with `true` if the stop signal arrives.
    pub(crate) fn wait_for_stop(&self, timeout: Duration) -> bool {
        let (stopped, signal) = &*self.state;
        let guard = match stopped.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match signal.wait_timeout_while(guard, timeout, |stopped| !*stopped) {
            Ok((stopped, _)) => *stopped,
            Err(poisoned) => *poisoned.into_inner().0,
        }
    }
}
