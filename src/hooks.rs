//! Callbacks deferred until a physical commit succeeds.

use std::fmt;

/// A zero-argument callback run after a successful commit
pub type EndHook = Box<dyn FnOnce() + Send + 'static>;

/// Ordered list of end-hooks; insertion order is execution order
pub struct EndHooks {
    hooks: Vec<EndHook>,
    capacity: usize,
}

impl EndHooks {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hooks: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, hook: EndHook) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Detach every registered hook, leaving an empty list behind
    pub fn take(&mut self) -> EndHooks {
        let hooks = std::mem::replace(&mut self.hooks, Vec::with_capacity(self.capacity));
        EndHooks {
            hooks,
            capacity: self.capacity,
        }
    }

    /// Run every hook in registration order, consuming the list
    pub fn run(self) {
        for hook in self.hooks {
            hook();
        }
    }
}

impl fmt::Debug for EndHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}
