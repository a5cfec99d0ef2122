use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Action, ActionType};
use crate::error::{Error, Result};

/// Handle for a resource some component reserved on behalf of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReservationId(pub u64);

/// Notified when an action carrying a reservation leaves the list.
pub trait ActionObserver: Send + Sync {
    fn on_removed(&self, action: &Action);
}

// ── Flash-loan slot ─────────────────────────────────────────────────

/// The single flash-loan slot of a session. Reserved when a loan is added,
/// released when either half of the pair is removed.
#[derive(Debug)]
pub struct FlashLoanSlot {
    held: AtomicU64,
    next: AtomicU64,
}

impl FlashLoanSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(FlashLoanSlot {
            held: AtomicU64::new(0),
            next: AtomicU64::new(1),
        })
    }

    pub fn reserve(&self) -> Result<ReservationId> {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.held
            .compare_exchange(0, id, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ReservationId(id))
            .map_err(|_| Error::FlashLoanActive)
    }

    pub fn is_reserved(&self) -> bool {
        self.held.load(Ordering::Acquire) != 0
    }

    pub fn release(&self, id: ReservationId) {
        // Releasing a stale id is a no-op.
        let _ = self
            .held
            .compare_exchange(id.0, 0, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl ActionObserver for FlashLoanSlot {
    fn on_removed(&self, action: &Action) {
        if let Some(id) = action.reservation {
            self.release(id);
        }
    }
}

// ── Action list ─────────────────────────────────────────────────────

/// Ordered pending operations.
///
/// A flash loan is held as a pair: the borrow at index 0 and the return as
/// the last element, so repayment is always the terminal step.
#[derive(Default)]
pub struct ActionList {
    actions: Vec<Action>,
    observers: Vec<Arc<dyn ActionObserver>>,
}

impl fmt::Debug for ActionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionList")
            .field("actions", &self.actions)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn ActionObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }

    pub fn position(&self, action_type: ActionType) -> Option<usize> {
        self.actions.iter().position(|a| a.action_type == action_type)
    }

    pub fn flash_return(&self) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.action_type == ActionType::FlashReturn)
    }

    /// Insert `action` at `index`, returning where it actually landed.
    ///
    /// Appending behind a trailing flash return lands just before it, and
    /// inserting at the front of a pending flash borrow lands just after it.
    pub fn insert(&mut self, action: Action, index: usize) -> Result<usize> {
        let len = self.actions.len();
        if index > len {
            return Err(Error::OutOfRange { index, len });
        }
        if action.action_type.is_flash() {
            return Err(Error::FlashLoanInsert);
        }

        let mut index = index;
        if len > 0 && index == len && self.actions[len - 1].action_type == ActionType::FlashReturn {
            index -= 1;
        }
        if index == 0 && self.actions.first().is_some_and(|a| a.action_type == ActionType::Flash) {
            index = 1;
        }

        tracing::debug!(action = %action.display_name, index, "insert action");
        self.actions.insert(index, action);
        Ok(index)
    }

    /// Append, honouring the same placement rules as [`ActionList::insert`].
    pub fn push(&mut self, action: Action) -> Result<usize> {
        self.insert(action, self.actions.len())
    }

    /// Add a flash borrow and its repayment around the current list.
    pub fn insert_flash_loan(&mut self, borrow: Action, repay: Action) -> Result<()> {
        if borrow.action_type != ActionType::Flash || repay.action_type != ActionType::FlashReturn {
            return Err(Error::FlashLoanInsert);
        }
        if self.position(ActionType::Flash).is_some() || self.position(ActionType::FlashReturn).is_some() {
            return Err(Error::FlashLoanActive);
        }
        self.actions.insert(0, borrow);
        self.actions.push(repay);
        Ok(())
    }

    /// Remove the action at `index`.
    ///
    /// Removing either half of a flash loan removes its partner too. Observers
    /// are notified when the removed action carried a reservation.
    pub fn remove(&mut self, index: usize) -> Result<Action> {
        let len = self.actions.len();
        if index >= len {
            return Err(Error::OutOfRange { index, len });
        }

        let mut index = index;
        match self.actions[index].action_type {
            ActionType::Flash => {
                if let Some(ret) = self.position(ActionType::FlashReturn) {
                    self.actions.remove(ret);
                    if ret < index {
                        index -= 1;
                    }
                }
            }
            ActionType::FlashReturn => {
                if let Some(borrow) = self.position(ActionType::Flash) {
                    self.actions.remove(borrow);
                    if borrow < index {
                        index -= 1;
                    }
                }
            }
            _ => {}
        }
        let removed = self.actions.remove(index);
        tracing::debug!(action = %removed.display_name, "removed action");

        if removed.reservation.is_some() {
            for observer in &self.observers {
                observer.on_removed(&removed);
            }
        }
        Ok(removed)
    }

    /// Drop every pending action without notifying observers.
    pub fn clear(&mut self) {
        self.actions.clear();
    }
}
