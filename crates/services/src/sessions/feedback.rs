use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

/// Resolution state of a wrong answer's explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Explanation {
    Pending,
    Ready(String),
    Fallback(String),
}

impl Explanation {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Display text once resolved.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Pending => None,
            Self::Ready(text) | Self::Fallback(text) => Some(text),
        }
    }
}

struct SlotInner {
    state: Mutex<Explanation>,
    resolved: Notify,
}

/// Addressable slot that receives a late explanation for one question.
///
/// The first resolution wins; later writes are ignored.
#[derive(Clone)]
pub struct ExplanationSlot {
    inner: Arc<SlotInner>,
}

impl ExplanationSlot {
    pub(crate) fn pending() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                state: Mutex::new(Explanation::Pending),
                resolved: Notify::new(),
            }),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn get(&self) -> Explanation {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns `false` when the slot was already resolved.
    pub(crate) fn resolve(&self, value: Explanation) -> bool {
        if value.is_pending() {
            return false;
        }
        {
            let mut state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !state.is_pending() {
                return false;
            }
            *state = value;
        }
        self.inner.resolved.notify_waiters();
        true
    }

    /// Wait until the slot is resolved.
    pub async fn wait(&self) -> Explanation {
        loop {
            let mut notified = std::pin::pin!(self.inner.resolved.notified());
            notified.as_mut().enable();
            let current = self.get();
            if !current.is_pending() {
                return current;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for ExplanationSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExplanationSlot").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_resolution_wins() {
        let slot = ExplanationSlot::pending();
        assert!(slot.get().is_pending());
        assert!(slot.resolve(Explanation::Ready("because".into())));
        assert!(!slot.resolve(Explanation::Fallback("late".into())));
        assert_eq!(slot.get().text(), Some("because"));
    }

    #[tokio::test]
    async fn wait_returns_after_resolution() {
        let slot = ExplanationSlot::pending();
        let writer = slot.clone();
        let task = tokio::spawn(async move {
            writer.resolve(Explanation::Fallback("n/a".into()));
        });
        let resolved = slot.wait().await;
        task.await.unwrap();
        assert_eq!(resolved, Explanation::Fallback("n/a".into()));
    }
}
