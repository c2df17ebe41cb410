//! Domain model for phone-call reservation handling.

pub mod extraction;
pub mod reservation;
pub mod session;

pub use extraction::{ExtractionSource, Sentiment, SlotExtractionResult, Urgency};
pub use reservation::{ReservationId, ReservationRecord, ReservationStatus};
pub use session::{
    CallIntent, CallSession, CancelCandidate, Credibility, HistoryEntry, ReservationSlots, Slot,
    SlotField, SlotValidity, Speaker,
};
