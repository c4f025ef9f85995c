//! Application foreground/background signal shared by checkout and sampling.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const SIGNAL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Active,
    Inactive,
    Background,
}

impl LifecycleState {
    pub fn is_active(self) -> bool {
        self == LifecycleState::Active
    }

    /// `Inactive` or `Background`: the app has lost the foreground.
    pub fn is_dormant(self) -> bool {
        !self.is_active()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: LifecycleState,
    pub next: LifecycleState,
}

impl Transition {
    pub fn new(previous: LifecycleState, next: LifecycleState) -> Self {
        Self { previous, next }
    }

    /// Dormant to active.
    pub fn is_resume(&self) -> bool {
        self.previous.is_dormant() && self.next.is_active()
    }
}

/// The only edge on which a pending external confirmation may be prompted.
pub fn is_resume_edge(previous: LifecycleState, next: LifecycleState, awaiting: bool) -> bool {
    awaiting && previous.is_dormant() && next.is_active()
}

/// Source of lifecycle transitions.
///
/// Clones share the same channel and current state. Re-emitting the current
/// state is ignored, mirroring an OS that only reports changes.
#[derive(Clone)]
pub struct LifecycleSignal {
    sender: broadcast::Sender<LifecycleState>,
    current: Arc<Mutex<LifecycleState>>,
}

impl LifecycleSignal {
    pub fn new(initial: LifecycleState) -> Self {
        let (sender, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            sender,
            current: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn current(&self) -> LifecycleState {
        *self.current.lock()
    }

    /// Moves to `next`, notifying subscribers. Returns whether a change happened.
    pub fn emit(&self, next: LifecycleState) -> bool {
        let mut current = self.current.lock();
        if *current == next {
            return false;
        }
        *current = next;
        // No subscribers is not an error: the state is still recorded.
        let _ = self.sender.send(next);
        tracing::debug!(state = ?next, "lifecycle transition");
        true
    }

    pub fn subscribe(&self) -> LifecycleSubscription {
        let current = self.current.lock();
        LifecycleSubscription {
            receiver: self.sender.subscribe(),
            previous: *current,
            current: Arc::clone(&self.current),
        }
    }
}

/// Receives transitions emitted after the subscription was taken.
///
/// Dropping it unsubscribes.
pub struct LifecycleSubscription {
    receiver: broadcast::Receiver<LifecycleState>,
    previous: LifecycleState,
    current: Arc<Mutex<LifecycleState>>,
}

impl LifecycleSubscription {
    /// Last state this subscriber has observed.
    pub fn current(&self) -> LifecycleState {
        self.previous
    }

    /// Discards every queued transition and jumps to the signal's present state.
    ///
    /// Returns the state jumped to. Later calls to [`next`](Self::next) only
    /// see transitions emitted after this call.
    pub fn sync(&mut self) -> LifecycleState {
        // Emitters hold this lock while sending, so nothing slips in between.
        let current = self.current.lock();
        self.receiver = self.receiver.resubscribe();
        self.previous = *current;
        self.previous
    }

    /// Waits for the next transition. `None` once every signal handle is gone.
    ///
    /// Cancel safe: no transition is consumed unless it is returned.
    pub async fn next(&mut self) -> Option<Transition> {
        loop {
            match self.receiver.recv().await {
                Ok(next) if next == self.previous => continue,
                Ok(next) => {
                    let transition = Transition::new(self.previous, next);
                    self.previous = next;
                    return Some(transition);
                }
                Err(RecvError::Lagged(skipped)) => {
                    // The oldest queued state no longer follows `previous`.
                    // Collapse the missed history into one edge to the present.
                    tracing::warn!(skipped, "lifecycle subscriber lagged, resyncing");
                    let before = self.previous;
                    let now = self.sync();
                    if now != before {
                        return Some(Transition::new(before, now));
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::LifecycleState::{Active, Background, Inactive};

    #[test]
    fn test_resume_edge_truth_table() {
        let states = [Active, Inactive, Background];
        for previous in states {
            for next in states {
                for awaiting in [false, true] {
                    let expected = awaiting && previous != Active && next == Active;
                    assert_eq!(
                        is_resume_edge(previous, next, awaiting),
                        expected,
                        "{previous:?} -> {next:?} awaiting={awaiting}"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn test_subscription_reports_edges_in_order() {
        let signal = LifecycleSignal::new(Active);
        let mut sub = signal.subscribe();

        assert!(signal.emit(Inactive));
        assert!(signal.emit(Background));
        assert!(signal.emit(Active));

        assert_eq!(sub.next().await, Some(Transition::new(Active, Inactive)));
        assert_eq!(sub.next().await, Some(Transition::new(Inactive, Background)));
        let resume = sub.next().await.unwrap();
        assert_eq!(resume, Transition::new(Background, Active));
        assert!(resume.is_resume());
    }

    #[tokio::test]
    async fn test_repeated_state_is_not_a_transition() {
        let signal = LifecycleSignal::new(Active);
        let mut sub = signal.subscribe();

        assert!(!signal.emit(Active));
        assert!(signal.emit(Background));
        assert!(!signal.emit(Background));
        assert_eq!(signal.current(), Background);

        assert_eq!(sub.next().await, Some(Transition::new(Active, Background)));
        drop(signal);
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_sync_drops_queued_edges() {
        let signal = LifecycleSignal::new(Active);
        let mut sub = signal.subscribe();

        signal.emit(Background);
        signal.emit(Active);
        assert_eq!(sub.sync(), Active);

        signal.emit(Inactive);
        assert_eq!(sub.next().await, Some(Transition::new(Active, Inactive)));
    }

    #[tokio::test]
    async fn test_lagged_subscriber_resyncs_to_present() {
        let signal = LifecycleSignal::new(Active);
        let mut sub = signal.subscribe();

        // Overflow the buffer, ending in the background.
        for i in 0..(SIGNAL_CAPACITY * 2 + 1) {
            signal.emit(if i % 2 == 0 { Background } else { Active });
        }
        assert_eq!(signal.current(), Background);

        assert_eq!(sub.next().await, Some(Transition::new(Active, Background)));
        signal.emit(Active);
        assert_eq!(sub.next().await, Some(Transition::new(Background, Active)));
    }

    #[tokio::test]
    async fn test_subscription_starts_from_current_state() {
        let signal = LifecycleSignal::new(Active);
        signal.emit(Background);

        let mut sub = signal.subscribe();
        assert_eq!(sub.current(), Background);

        signal.emit(Active);
        assert_eq!(sub.next().await, Some(Transition::new(Background, Active)));
    }
}
