//! Session-wide Ctrl-C handling.
//!
//! Ctrl-C cancels the chat currently streaming. Pressed while nothing is in
//! flight, it exits the process.

use std::sync::{Arc, Mutex, PoisonError};

use chatline::CancellationToken;

/// Exit status for a process ended by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupt {
    /// Install the one Ctrl-C listener for this process.
    pub fn install() -> Self {
        let interrupt = Self::default();
        let handle = interrupt.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !handle.cancel_active() {
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        });
        interrupt
    }

    /// Start an interruptible operation and return its token.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.lock() = Some(token.clone());
        token
    }

    /// Mark the current operation finished; Ctrl-C exits again.
    pub fn end(&self) {
        self.lock().take();
    }

    /// Cancel the operation in flight. Returns `false` when idle.
    fn cancel_active(&self) -> bool {
        match self.lock().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_interrupt_has_nothing_to_cancel() {
        let interrupt = Interrupt::default();
        assert!(!interrupt.cancel_active());
    }

    #[test]
    fn interrupt_cancels_operation_in_flight() {
        let interrupt = Interrupt::default();
        let token = interrupt.begin();
        assert!(interrupt.cancel_active());
        assert!(token.is_cancelled());
        assert!(!interrupt.cancel_active(), "one press cancels one operation");
    }

    #[test]
    fn finished_operation_is_not_cancelled() {
        let interrupt = Interrupt::default();
        let token = interrupt.begin();
        interrupt.end();
        assert!(!interrupt.cancel_active());
        assert!(!token.is_cancelled());
    }
}
