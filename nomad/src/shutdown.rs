//! Cooperative stop signal for looping workers
//!
//! The handle holds the only sender of a channel nobody ever sends on.
//! Dropping it disconnects the channel, which every token observes at once,
//! including tokens blocked in [`StopToken::rest`].

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Owner side: stop every worker by calling [`StopHandle::stop`] or dropping it
pub struct StopHandle {
    _tx: Sender<()>,
}

impl StopHandle {
    pub fn stop(self) {}
}

/// Worker side
#[derive(Clone)]
pub struct StopToken {
    rx: Receiver<()>,
}

impl StopToken {
    pub fn is_stopped(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for `duration`, waking early on stop. Returns true if stopped.
    pub fn rest(&self, duration: Duration) -> bool {
        matches!(
            self.rx.recv_timeout(duration),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

/// New linked handle and token
pub fn stop_pair() -> (StopHandle, StopToken) {
    let (tx, rx) = crossbeam_channel::bounded(0);
    (StopHandle { _tx: tx }, StopToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_token_sees_stop() {
        let (handle, token) = stop_pair();
        assert!(!token.is_stopped());
        handle.stop();
        assert!(token.is_stopped());
    }

    #[test]
    fn test_rest_times_out_while_running() {
        let (_handle, token) = stop_pair();
        assert!(!token.rest(Duration::from_millis(5)));
    }

    #[test]
    fn test_stop_interrupts_rest() {
        let (handle, token) = stop_pair();
        let sleeper = std::thread::spawn(move || {
            let started = Instant::now();
            let stopped = token.rest(Duration::from_secs(30));
            (stopped, started.elapsed())
        });

        std::thread::sleep(Duration::from_millis(20));
        handle.stop();

        let (stopped, elapsed) = sleeper.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(30));
    }
}
