use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::Row;

use reserva_core::domain::reservation::{ReservationId, ReservationRecord, ReservationStatus};
use reserva_core::policy::{OccupancyError, OccupancyLookup};

use super::{RepositoryError, ReservationRepository};
use crate::DbPool;

/// Storage layout for `reserved_at`. Lexicographic order matches
/// chronological order, which lets SQL sort and range-scan the column.
const RESERVED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqlReservationRepository {
    pool: DbPool,
}

impl SqlReservationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn format_reserved_at(at: NaiveDateTime) -> String {
    at.format(RESERVED_AT_FORMAT).to_string()
}

fn parse_reserved_at(raw: &str) -> Result<NaiveDateTime, RepositoryError> {
    NaiveDateTime::parse_from_str(raw, RESERVED_AT_FORMAT)
        .map_err(|e| RepositoryError::Decode(format!("reserved_at {raw:?}: {e}")))
}

fn row_to_reservation(row: &sqlx::sqlite::SqliteRow) -> Result<ReservationRecord, RepositoryError> {
    let id: String = row.try_get("id")?;
    let customer_name: String = row.try_get("customer_name")?;
    let phone: String = row.try_get("phone")?;
    let reserved_at_str: String = row.try_get("reserved_at")?;
    let party_size: i64 = row.try_get("party_size")?;
    let status_str: String = row.try_get("status")?;
    let notes: Option<String> = row.try_get("notes")?;
    let transcript: Option<String> = row.try_get("transcript")?;
    let created_at_str: String = row.try_get("created_at")?;

    let status: ReservationStatus =
        status_str.parse().map_err(|e| RepositoryError::Decode(format!("{e}")))?;
    let party_size =
        u32::try_from(party_size).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?
        .with_timezone(&Utc);

    Ok(ReservationRecord {
        id: ReservationId(id),
        customer_name,
        phone,
        reserved_at: parse_reserved_at(&reserved_at_str)?,
        party_size,
        status,
        notes,
        transcript,
        created_at,
    })
}

#[async_trait::async_trait]
impl ReservationRepository for SqlReservationRepository {
    async fn insert(&self, record: &ReservationRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO reservation (id, customer_name, phone, reserved_at, party_size,
                                      status, notes, transcript, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.customer_name)
        .bind(&record.phone)
        .bind(format_reserved_at(record.reserved_at))
        .bind(i64::from(record.party_size))
        .bind(record.status.as_str())
        .bind(&record.notes)
        .bind(&record.transcript)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_active_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<ReservationRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, customer_name, phone, reserved_at, party_size, status, notes,
                    transcript, created_at
             FROM reservation
             WHERE phone = ? AND status IN ('pending', 'confirmed')
             ORDER BY reserved_at ASC",
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_reservation).collect()
    }

    async fn cancel(&self, id: &ReservationId, phone: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE reservation SET status = 'cancelled'
             WHERE id = ? AND phone = ? AND status != 'cancelled'",
        )
        .bind(&id.0)
        .bind(phone)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl OccupancyLookup for SqlReservationRepository {
    async fn occupancy_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<u32, OccupancyError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(party_size), 0) AS total
             FROM reservation
             WHERE status IN ('pending', 'confirmed') AND reserved_at BETWEEN ? AND ?",
        )
        .bind(format_reserved_at(from))
        .bind(format_reserved_at(to))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| OccupancyError(e.to_string()))?;

        let total: i64 = row.try_get("total").map_err(|e| OccupancyError(e.to_string()))?;
        u32::try_from(total).map_err(|e| OccupancyError(e.to_string()))
    }
}
