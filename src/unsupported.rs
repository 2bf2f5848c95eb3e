//! Stand-ins for targets without a terminal resize signal.
//!
//! `register` always fails there, so a `Registration` is never handed out;
//! the type exists so callers match on the same signature everywhere.

pub struct Registration {
    _private: (),
}

impl Registration {
    pub fn is_active(&self) -> bool {
        false
    }

    pub fn unregister(self) -> bool {
        false
    }
}
