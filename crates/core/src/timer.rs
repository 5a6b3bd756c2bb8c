//! Deadline-based timer slots
//!
//! The display state machine never sleeps. Instead each of its timers is a
//! slot holding at most one deadline; the host loop asks for the earliest
//! deadline, sleeps until then and feeds the current instant back in.

use tokio::time::Instant;

/// A slot holding at most one active timer
///
/// The slot is the cancellation handle for its timer. Arming always
/// supersedes whatever was armed before, so a slot can never leak a second
/// timer. Cancelling is idempotent.
#[derive(Debug, Default)]
pub struct TimerSlot {
    deadline: Option<Instant>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot, cancelling any previously armed timer
    pub fn arm(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Cancel the armed timer, if any. Returns whether something was cancelled.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_arm_supersedes_previous() {
        let now = Instant::now();
        let mut slot = TimerSlot::new();
        slot.arm(now + Duration::from_secs(5));
        slot.arm(now + Duration::from_secs(10));

        assert_eq!(slot.deadline(), Some(now + Duration::from_secs(10)));
        assert!(slot.cancel());
        assert!(!slot.is_armed());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut slot = TimerSlot::new();
        slot.arm(Instant::now());
        assert!(slot.cancel());
        assert!(!slot.cancel());
        assert_eq!(slot.deadline(), None);
    }
}
