//! Inbound Twilio voice webhooks.
//!
//! Twilio posts an `application/x-www-form-urlencoded` body on every turn of
//! a call: one webhook when the call connects, one per captured utterance,
//! and a status callback when the call ends. Only the fields the agent reads
//! are modeled; Twilio sends many more.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("webhook is missing a CallSid")]
    MissingCallSid,
}

/// A `CallStatus` value as Twilio reports it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Ringing,
    #[default]
    InProgress,
    Completed,
    Busy,
    Failed,
    NoAnswer,
    Canceled,
    /// Statuses added after this enum was written must not fail parsing.
    #[serde(other)]
    Unknown,
}

impl CallStatus {
    /// The call is over; nothing said back will be heard.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Busy | Self::Failed | Self::NoAnswer | Self::Canceled
        )
    }
}

/// Form fields posted by Twilio on a conversational turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VoiceWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "SpeechResult")]
    pub speech_result: Option<String>,
    /// Transcription confidence; Twilio sends it as a decimal string.
    #[serde(rename = "Confidence")]
    pub confidence: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<CallStatus>,
}

impl VoiceWebhook {
    /// Every webhook must carry the call SID; without it there is no session
    /// to attach the turn to.
    pub fn validate(&self) -> Result<(), WebhookError> {
        if self.call_sid.trim().is_empty() {
            return Err(WebhookError::MissingCallSid);
        }
        Ok(())
    }

    /// The transcribed speech for this turn. Empty on the opening webhook,
    /// which is what lets the greeting flow run.
    pub fn utterance(&self) -> &str {
        self.speech_result.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn speech_confidence(&self) -> Option<f32> {
        self.confidence.as_deref()?.trim().parse().ok()
    }

    /// The caller id, unless the caller withheld it.
    pub fn caller_phone(&self) -> Option<&str> {
        let from = self.from.as_deref()?.trim();
        if from.is_empty() {
            return None;
        }
        let lowered = from.to_ascii_lowercase();
        if lowered.contains("anonymous")
            || lowered.contains("unknown")
            || lowered.contains("restricted")
        {
            return None;
        }
        Some(from)
    }

    /// Status callbacks after hangup carry no speech and expect no TwiML.
    pub fn is_call_ended(&self) -> bool {
        self.call_status.map(CallStatus::is_final).unwrap_or(false)
    }
}
