//! Conversation state machine.
//!
//! [`states`] defines the dialogue steps, the events a caller turn can raise,
//! and the side effects a transition requests. [`engine`] holds the transition
//! table itself. The engine is pure: it never touches storage or the network,
//! which keeps every transition unit-testable.

pub mod engine;
pub mod states;

pub use engine::{DialogueEngine, DialogueError, MAX_CLARIFY_TURNS};
pub use states::{DialogueAction, DialogueStep, TransitionOutcome, TurnEvent};
