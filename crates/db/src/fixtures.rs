use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical demo bookings and their verification contract.
const SEED_RESERVATIONS: &[SeedReservationContract] = &[
    SeedReservationContract {
        reservation_id: "demo-res-001",
        customer_name: "Carmen Ruiz",
        phone: "34600111222",
        reserved_at: "2030-05-10 20:00:00",
        party_size: 4,
        status: "confirmed",
        description: "Dinner for four, first match in the cancel-flow walkthrough",
    },
    SeedReservationContract {
        reservation_id: "demo-res-002",
        customer_name: "Carmen Ruiz",
        phone: "34600111222",
        reserved_at: "2030-05-11 13:30:00",
        party_size: 2,
        status: "confirmed",
        description: "Lunch for two on the same phone, second cancel-flow match",
    },
    SeedReservationContract {
        reservation_id: "demo-res-003",
        customer_name: "Luca Bianchi",
        phone: "393331234567",
        reserved_at: "2030-05-10 21:00:00",
        party_size: 6,
        status: "confirmed",
        description: "Unrelated party of six, exercises occupancy sums",
    },
    SeedReservationContract {
        reservation_id: "demo-res-004",
        customer_name: "John Smith",
        phone: "14155550123",
        reserved_at: "2024-01-15 19:00:00",
        party_size: 3,
        status: "cancelled",
        description: "Cancelled booking, must stay out of active lookups",
    },
];

const SEED_RESERVATION_IDS: &[&str] =
    &["demo-res-001", "demo-res-002", "demo-res-003", "demo-res-004"];

/// Deterministic demo dataset for smoke runs and manual cancel-flow demos.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// SQL fixture content for the demo bookings.
    pub const SQL: &'static str = include_str!("../../../config/fixtures/demo_reservations.sql");

    /// Load the demo bookings into the database. Reloading is idempotent.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let reservations_seeded = SEED_RESERVATIONS
            .iter()
            .map(|seed| ReservationSeedInfo {
                reservation_id: seed.reservation_id,
                phone: seed.phone,
                description: seed.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { reservations_seeded })
    }

    /// Verify that the seeded rows exist and match the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for seed in SEED_RESERVATIONS {
            let row_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM reservation
                 WHERE id = ?1 AND customer_name = ?2 AND phone = ?3
                   AND reserved_at = ?4 AND party_size = ?5 AND status = ?6)",
            )
            .bind(seed.reservation_id)
            .bind(seed.customer_name)
            .bind(seed.phone)
            .bind(seed.reserved_at)
            .bind(seed.party_size)
            .bind(seed.status)
            .fetch_one(pool)
            .await?;
            checks.push((seed.reservation_id, row_ok == 1));
        }

        // The shared phone must resolve to exactly its two active bookings.
        let carmen_active: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM reservation
             WHERE phone = '34600111222' AND status IN ('pending', 'confirmed')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("shared-phone-active-count", carmen_active == 2));

        let cancelled_active: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM reservation
             WHERE phone = '14155550123' AND status IN ('pending', 'confirmed')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("cancelled-stays-inactive", cancelled_active == 0));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seeded rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let quoted = SEED_RESERVATION_IDS
            .iter()
            .map(|id| format!("'{id}'"))
            .collect::<Vec<_>>()
            .join(",");
        sqlx::query(&format!("DELETE FROM reservation WHERE id IN ({quoted})"))
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedReservationContract {
    reservation_id: &'static str,
    customer_name: &'static str,
    phone: &'static str,
    reserved_at: &'static str,
    party_size: i64,
    status: &'static str,
    description: &'static str,
}

#[derive(Debug)]
pub struct SeedResult {
    pub reservations_seeded: Vec<ReservationSeedInfo>,
}

#[derive(Debug)]
pub struct ReservationSeedInfo {
    pub reservation_id: &'static str,
    pub phone: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
