//! Actions: the terminal step of a chain.
//!
//! # How actions are stored
//!
//! The container holds actions of *different* types in one map, so each
//! registration is erased behind a factory returning `Box<dyn Action>`:
//!
//! ```text
//! fn show(ex: &mut Exchange) -> String { … }   ← user writes this
//!        ↓ container.handler("users", "show", show)
//! show.into_action()                          ← Handler blanket impl
//!        ↓
//! FnAction(Arc::new(show))                    ← shared function
//!        ↓  factory: move || Box::new(action.clone())
//! factory() at request time                   ← fresh instance
//!        ↓
//! instance.call(ex)                           ← one vtable dispatch
//! ```
//!
//! Stateful actions implement [`Action`] on a struct and register a factory
//! with [`Container::action`](crate::Container::action) instead.

use std::sync::Arc;

use crate::exchange::{Exchange, IntoOutcome, Outcome};

/// The terminal step of a route's chain.
///
/// An instance is created for one request and dropped with it.
pub trait Action {
    fn call(&mut self, ex: &mut Exchange<'_>) -> Outcome;
}

/// Implemented for every function usable as an action.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature:
///
/// ```text
/// fn name(ex: &mut Exchange<'_>) -> impl IntoOutcome
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    type Action: Action + Clone + Send + Sync + 'static;

    #[doc(hidden)]
    fn into_action(self) -> Self::Action;
}

mod private {
    pub trait Sealed {}
}

impl<F, O> private::Sealed for F
where
    F: Fn(&mut Exchange<'_>) -> O + Send + Sync + 'static,
    O: IntoOutcome,
{
}

impl<F, O> Handler for F
where
    F: Fn(&mut Exchange<'_>) -> O + Send + Sync + 'static,
    O: IntoOutcome,
{
    type Action = FnAction<F>;

    fn into_action(self) -> FnAction<F> {
        FnAction(Arc::new(self))
    }
}

/// Newtype holding a shared handler function and implementing [`Action`],
/// bridging plain functions to the trait-object world. Clones share the
/// function and whatever state it captured.
#[doc(hidden)]
pub struct FnAction<F>(Arc<F>);

impl<F> Clone for FnAction<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<F, O> Action for FnAction<F>
where
    F: Fn(&mut Exchange<'_>) -> O,
    O: IntoOutcome,
{
    fn call(&mut self, ex: &mut Exchange<'_>) -> Outcome {
        (self.0)(ex).into_outcome()
    }
}
