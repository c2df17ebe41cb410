pub mod audit;
pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod languages;
pub mod policy;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use config::{
    AnalyzerConfig, AnalyzerProvider, AppConfig, ConfigError, ConfigOverrides, LoadOptions,
    LogFormat, RestaurantConfig, ServiceWindow,
};
pub use dialogue::{DialogueAction, DialogueEngine, DialogueStep, TransitionOutcome, TurnEvent};
pub use domain::reservation::{ReservationId, ReservationRecord, ReservationStatus};
pub use domain::session::{
    CallIntent, CallSession, CancelCandidate, Credibility, ReservationSlots, Slot, SlotField,
    SlotValidity,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use languages::Language;
pub use policy::{OccupancyLookup, PolicyCode, PolicyVerdict, PolicyViolation, ReservationPolicy};
