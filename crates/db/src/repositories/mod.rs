use async_trait::async_trait;
use thiserror::Error;

use reserva_core::domain::reservation::{ReservationId, ReservationRecord};
use reserva_core::domain::session::CallSession;

pub mod memory;
pub mod reservation;
pub mod session;

pub use memory::{InMemoryCallSessionRepository, InMemoryReservationRepository};
pub use reservation::SqlReservationRepository;
pub use session::SqlCallSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Persistence for per-call dialogue state.
#[async_trait]
pub trait CallSessionRepository: Send + Sync {
    async fn find_by_call_sid(
        &self,
        call_sid: &str,
    ) -> Result<Option<CallSession>, RepositoryError>;

    /// Inserts or replaces the session for its call SID.
    async fn upsert(&self, session: &CallSession) -> Result<(), RepositoryError>;

    async fn delete(&self, call_sid: &str) -> Result<(), RepositoryError>;
}

/// Persistence for booked tables.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn insert(&self, reservation: &ReservationRecord) -> Result<(), RepositoryError>;

    /// Active reservations under a phone number, soonest first.
    async fn find_active_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<ReservationRecord>, RepositoryError>;

    /// Marks a reservation cancelled. The phone must match the one the
    /// booking was made with; returns `false` when nothing was cancelled.
    async fn cancel(&self, id: &ReservationId, phone: &str) -> Result<bool, RepositoryError>;
}
