//! Conversation session state machine
//!
//! Implements the Elm Architecture pattern: a pure `transition` function
//! turns (state, conversation, event) into a new state plus effects, and the
//! [`SessionController`] executes those effects against storage and the
//! remote gateway.

pub mod answer;
mod controller;
mod effect;
mod event;
mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use controller::{PendingSubmission, SessionController, SessionEvent, SubmitOutcome};
pub use effect::Effect;
pub use event::Event;
pub use state::{SessionContext, SessionState};
pub use transition::{transition, TransitionError, TransitionResult};
