//! Cooperative interruption for long-running plan construction.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::error::PlanError;

/// Shared flag polled between tree nodes during flattening.
///
/// Interruption is cooperative: a tripped handle stops work before the next
/// node, never inside one.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    /// Create an un-tripped handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that in-progress plan construction stop at the next node
    /// boundary.
    pub fn trip(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once interruption has been requested.
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), PlanError> {
        if self.is_tripped() {
            Err(PlanError::Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Interrupt;

    #[test]
    fn trips_once_and_stays_tripped() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.is_tripped());
        assert!(interrupt.check().is_ok());

        interrupt.trip();
        assert!(interrupt.is_tripped());
        assert!(interrupt.check().is_err());

        let clone = interrupt.clone();
        assert!(clone.is_tripped());
    }
}
