//! Scoped "force primary" override.
//!
//! [`PrimaryScope`] sets the forced-primary flag when created and restores
//! the previous value when dropped, whether the scope ends normally, through
//! an early `?` return, or during a panic unwind. The scope mutably borrows
//! its target and derefs to it, so nested scopes are strictly stack-ordered.

use crate::routing::state::RoutingState;
use std::ops::{Deref, DerefMut};

/// Anything that owns a [`RoutingState`].
pub trait ScopedRouting {
    fn routing_state(&self) -> &RoutingState;

    fn routing_state_mut(&mut self) -> &mut RoutingState;
}

impl ScopedRouting for RoutingState {
    fn routing_state(&self) -> &RoutingState {
        self
    }

    fn routing_state_mut(&mut self) -> &mut RoutingState {
        self
    }
}

/// Guard forcing primary routing for its lifetime.
pub struct PrimaryScope<'a, T: ScopedRouting + ?Sized> {
    target: &'a mut T,
    previous: bool,
}

impl<'a, T: ScopedRouting + ?Sized> PrimaryScope<'a, T> {
    pub fn new(target: &'a mut T) -> Self {
        let state = target.routing_state_mut();
        let previous = state.is_forced_to_primary();
        state.set_force_primary(true);
        Self { target, previous }
    }

    /// Value that will be restored when this scope ends.
    pub fn previous(&self) -> bool {
        self.previous
    }
}

impl<T: ScopedRouting + ?Sized> Deref for PrimaryScope<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.target
    }
}

impl<T: ScopedRouting + ?Sized> DerefMut for PrimaryScope<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.target
    }
}

impl<T: ScopedRouting + ?Sized> Drop for PrimaryScope<'_, T> {
    fn drop(&mut self) {
        self.target
            .routing_state_mut()
            .set_force_primary(self.previous);
    }
}
