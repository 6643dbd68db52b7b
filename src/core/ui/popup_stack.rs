//=========================================================================
// Popup Stack
//=========================================================================
//
// LIFO stack of modal overlays. Only the top popup may be closed
// individually, so popups always unwind in the order they were opened.
//
//   push(P1) push(P2) push(P3)
//   close(P1)  -> refused, P3 is on top
//   close_top  -> P3, then P2, then P1
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Weak;

use crossbeam_channel::Receiver;
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::notify::Notifier;

/// Sorting order of the bottom-most popup.
pub const BASE_SORTING_ORDER: i32 = 10;

//=== Popup Types =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub id: PopupId,
    pub name: String,
    pub sorting_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupEvent {
    Opened { id: PopupId, name: String },
    Destroyed { id: PopupId, name: String },
}

//=== PopupStack ==========================================================

#[derive(Debug, Default)]
pub struct PopupStack {
    stack: Vec<Popup>,
    next_id: u64,
    events: Notifier<PopupEvent>,
}

impl PopupStack {
    pub fn new() -> Self {
        Self::default()
    }

    //--- Mutation ---------------------------------------------------------

    /// Opens `name` on top of the stack. Always succeeds.
    pub fn push(&mut self, name: impl Into<String>) -> PopupId {
        self.next_id += 1;
        let popup = Popup {
            id: PopupId(self.next_id),
            name: name.into(),
            sorting_order: BASE_SORTING_ORDER + self.stack.len() as i32,
        };

        debug!("Popup '{}' opened at order {}", popup.name, popup.sorting_order);
        self.events.publish(PopupEvent::Opened {
            id: popup.id,
            name: popup.name.clone(),
        });

        let id = popup.id;
        self.stack.push(popup);
        id
    }

    /// Closes the top popup. Warns and returns `false` on an empty stack.
    pub fn close_top(&mut self) -> bool {
        match self.stack.pop() {
            Some(popup) => {
                self.destroy(popup);
                true
            }
            None => {
                warn!("No popup to close");
                false
            }
        }
    }

    /// Closes `id` if it is the top popup.
    pub fn close(&mut self, id: PopupId) -> bool {
        let Some(top) = self.stack.last() else {
            warn!("Popup {:?} close refused: the stack is empty", id);
            return false;
        };

        if top.id != id {
            warn!(
                "Popup {:?} close refused: only the top popup '{}' can be closed",
                id, top.name
            );
            return false;
        }

        self.close_top()
    }

    /// Closes every popup, top first. Returns how many were closed.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        while let Some(popup) = self.stack.pop() {
            self.destroy(popup);
            closed += 1;
        }
        closed
    }

    //--- Queries ----------------------------------------------------------

    pub fn top(&self) -> Option<&Popup> {
        self.stack.last()
    }

    pub fn contains(&self, id: PopupId) -> bool {
        self.stack.iter().any(|popup| popup.id == id)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Popups from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Popup> {
        self.stack.iter()
    }

    pub fn subscribe(&mut self) -> Receiver<PopupEvent> {
        self.events.subscribe()
    }

    //--- Internal Helpers -------------------------------------------------

    fn destroy(&mut self, popup: Popup) {
        debug!("Popup '{}' destroyed", popup.name);
        self.events.publish(PopupEvent::Destroyed {
            id: popup.id,
            name: popup.name,
        });
    }
}

//=== PopupHandle =========================================================

/// Non-owning handle a popup uses to close itself.
#[derive(Debug, Clone)]
pub struct PopupHandle {
    id: PopupId,
    stack: Weak<RefCell<PopupStack>>,
}

impl PopupHandle {
    pub fn new(id: PopupId, stack: Weak<RefCell<PopupStack>>) -> Self {
        Self { id, stack }
    }

    pub fn id(&self) -> PopupId {
        self.id
    }

    /// Closes this popup through its owning stack.
    ///
    /// Subject to the same top-only rule as [`PopupStack::close`].
    pub fn close(&self) -> bool {
        match self.stack.upgrade() {
            Some(stack) => stack.borrow_mut().close(self.id),
            None => {
                warn!("Popup {:?} outlived its stack", self.id);
                false
            }
        }
    }

    /// `true` while the popup is still on its stack.
    pub fn is_open(&self) -> bool {
        self.stack
            .upgrade()
            .is_some_and(|stack| stack.borrow().contains(self.id))
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn popups_unwind_in_lifo_order() {
        let mut stack = PopupStack::new();
        let p1 = stack.push("P1");
        let p2 = stack.push("P2");
        let p3 = stack.push("P3");

        assert!(!stack.close(p1));
        assert_eq!(stack.len(), 3);

        let events = stack.subscribe();
        assert!(stack.close_top());
        assert!(stack.close_top());
        assert!(stack.close_top());
        assert!(stack.is_empty());

        let destroyed: Vec<PopupId> = events
            .try_iter()
            .map(|event| match event {
                PopupEvent::Destroyed { id, .. } => id,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(destroyed, vec![p3, p2, p1]);
    }

    #[test]
    fn close_on_empty_stack_is_a_no_op() {
        let mut stack = PopupStack::new();
        let id = stack.push("Only");
        assert!(stack.close(id));
        assert!(!stack.close(id));
        assert!(!stack.close_top());
    }

    #[test]
    fn sorting_order_follows_depth() {
        let mut stack = PopupStack::new();
        stack.push("A");
        stack.push("B");
        let orders: Vec<i32> = stack.iter().map(|popup| popup.sorting_order).collect();
        assert_eq!(orders, vec![BASE_SORTING_ORDER, BASE_SORTING_ORDER + 1]);
    }

    #[test]
    fn close_all_empties_the_stack() {
        let mut stack = PopupStack::new();
        stack.push("A");
        stack.push("B");
        assert_eq!(stack.close_all(), 2);
        assert!(stack.top().is_none());
    }

    #[test]
    fn handle_closes_through_the_stack() {
        let stack = Rc::new(RefCell::new(PopupStack::new()));
        let lower = stack.borrow_mut().push("Lower");
        let upper = stack.borrow_mut().push("Upper");

        let lower = PopupHandle::new(lower, Rc::downgrade(&stack));
        let upper = PopupHandle::new(upper, Rc::downgrade(&stack));

        assert!(!lower.close());
        assert!(upper.close());
        assert!(!upper.is_open());
        assert!(lower.close());

        drop(stack);
        assert!(!lower.close());
    }
}
