//! Scoped "already on the call stack" flags
//!
//! A native call made while handling an event can re-enter the same handler
//! synchronously. Each guarded operation owns a [`ReentrancyFlag`]; entering
//! it while set is refused, and the returned token clears the flag on drop,
//! so every exit path (including `?`) releases it.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct ReentrancyFlag {
    active: Rc<Cell<bool>>,
}

impl ReentrancyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the guarded section, or `None` if it is already active
    pub fn enter(&self) -> Option<ReentrancyToken> {
        if self.active.get() {
            return None;
        }
        self.active.set(true);
        Some(ReentrancyToken {
            active: Rc::clone(&self.active),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

#[must_use = "the guarded section ends when the token is dropped"]
#[derive(Debug)]
pub struct ReentrancyToken {
    active: Rc<Cell<bool>>,
}

impl Drop for ReentrancyToken {
    fn drop(&mut self) {
        self.active.set(false);
    }
}
