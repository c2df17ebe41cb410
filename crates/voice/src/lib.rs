//! Telephony integration - Twilio voice webhooks and TwiML
//!
//! This crate is the phone line. It owns the two wire formats the agent
//! never sees directly:
//! - **Webhooks** (`webhook`) - The form Twilio posts on every turn: call
//!   SID, transcribed speech, caller id, call status.
//! - **TwiML** (`twiml`) - The XML documents spoken back: a `<Gather>` that
//!   listens for the next utterance, or a farewell that hangs up.
//!
//! Nothing here makes dialogue decisions. The server hands the parsed
//! webhook to the agent runtime and renders its reply; this crate keeps the
//! Twilio-shaped details (field names, voice ids, escaping) in one place.

pub mod twiml;
pub mod webhook;
