//! Conversation runtime: slot extraction and turn orchestration.
//!
//! This crate is the part of the system that listens. Each webhook turn runs
//! a constrained loop:
//!
//! 1. **Extraction** (`extractor`, `analyzer`, `fallback`) - Parse the
//!    transcribed utterance into slots with credibility scores, via the LLM
//!    analyzer when configured and a deterministic parser always.
//! 2. **Dialogue** - Feed the result to the state machine in
//!    `reserva-core` and get back the actions for this turn.
//! 3. **Execution** (`executor`, `runtime`) - Validate against restaurant
//!    policy, commit or cancel reservations, persist the session, and phrase
//!    the reply in the caller's language.
//!
//! The LLM is strictly a transcriber. It never decides whether a reservation
//! is valid or what the agent says next; those are deterministic decisions
//! made by the policy and the state machine.

pub mod analyzer;
pub mod executor;
pub mod extractor;
pub mod fallback;
pub mod llm;
pub mod runtime;
