use std::sync::Arc;
use std::time::Instant;

use crate::commands::CommandResult;
use reserva_agent::extractor::SlotExtractor;
use reserva_agent::runtime::TurnRuntime;
use reserva_core::audit::InMemoryAuditSink;
use reserva_core::config::{AnalyzerProvider, AppConfig, LoadOptions};
use reserva_db::repositories::{
    InMemoryCallSessionRepository, InMemoryReservationRepository, ReservationRepository,
};
use reserva_db::{connect_with_settings, migrations};
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("analyzer_readiness"));
            checks.push(skipped("db_connectivity"));
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("dialogue_turn"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let analyzer_started = Instant::now();
    let analyzer_ready = match config.analyzer.provider {
        AnalyzerProvider::Deterministic => true,
        AnalyzerProvider::Gemini => config
            .analyzer
            .api_key
            .as_ref()
            .map(|key| !key.expose_secret().trim().is_empty())
            .unwrap_or(false),
    };
    checks.push(SmokeCheck {
        name: "analyzer_readiness",
        status: if analyzer_ready { SmokeStatus::Pass } else { SmokeStatus::Fail },
        elapsed_ms: analyzer_started.elapsed().as_millis() as u64,
        message: if analyzer_ready {
            match config.analyzer.provider {
                AnalyzerProvider::Deterministic => {
                    "deterministic analyzer needs no credentials".to_string()
                }
                AnalyzerProvider::Gemini => {
                    format!("gemini credentials present for model `{}`", config.analyzer.model)
                }
            }
        } else {
            "expected a non-empty analyzer.api_key for the gemini provider".to_string()
        },
    });

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("dialogue_turn"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let db_started = Instant::now();
    let db_result = runtime.block_on(async {
        connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
    });

    let pool = match db_result {
        Ok(pool) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Pass,
                elapsed_ms: db_started.elapsed().as_millis() as u64,
                message: format!("connected using `{}`", config.database.url),
            });
            pool
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: db_started.elapsed().as_millis() as u64,
                message: format!("failed to connect: {error}"),
            });
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("dialogue_turn"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let migration_started = Instant::now();
    let migration_result = runtime.block_on(async { migrations::run_pending(&pool).await });
    runtime.block_on(async {
        pool.close().await;
    });

    match migration_result {
        Ok(()) => checks.push(SmokeCheck {
            name: "migration_visibility",
            status: SmokeStatus::Pass,
            elapsed_ms: migration_started.elapsed().as_millis() as u64,
            message: "migrations are visible and executable".to_string(),
        }),
        Err(error) => {
            checks.push(SmokeCheck {
                name: "migration_visibility",
                status: SmokeStatus::Fail,
                elapsed_ms: migration_started.elapsed().as_millis() as u64,
                message: format!("migration execution failed: {error}"),
            });
            checks.push(skipped("dialogue_turn"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    }

    let dialogue_started = Instant::now();
    let dialogue_result = runtime.block_on(scripted_booking(&config));
    match dialogue_result {
        Ok(message) => checks.push(SmokeCheck {
            name: "dialogue_turn",
            status: SmokeStatus::Pass,
            elapsed_ms: dialogue_started.elapsed().as_millis() as u64,
            message,
        }),
        Err(message) => checks.push(SmokeCheck {
            name: "dialogue_turn",
            status: SmokeStatus::Fail,
            elapsed_ms: dialogue_started.elapsed().as_millis() as u64,
            message,
        }),
    }

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

/// Books a table through the real turn pipeline against in-memory stores, so
/// a broken dialogue engine fails smoke before it ever reaches a caller.
async fn scripted_booking(config: &AppConfig) -> Result<String, String> {
    let sessions = Arc::new(InMemoryCallSessionRepository::default());
    let reservations = Arc::new(InMemoryReservationRepository::default());
    let turn_runtime = TurnRuntime::new(
        config.clone(),
        SlotExtractor::deterministic_only(),
        sessions,
        reservations.clone(),
        reservations.clone(),
        Arc::new(InMemoryAuditSink::default()),
    );

    let call_sid = "CAsmoke0000000000000000000000001";
    let phone_hint = Some("+34 600 111 222");

    let opening = turn_runtime.handle_turn(call_sid, "", phone_hint).await;
    if opening.terminal {
        return Err(format!("greeting turn ended the call early: {}", opening.text));
    }

    let details = turn_runtime
        .handle_turn(call_sid, "mesa para cuatro mañana a las 21:00, me llamo Ana García", phone_hint)
        .await;
    if details.terminal {
        return Err(format!("detail turn ended the call early: {}", details.text));
    }

    let confirmation = turn_runtime.handle_turn(call_sid, "sí, perfecto", phone_hint).await;
    if !confirmation.terminal {
        return Err(format!("confirmation turn did not close the call: {}", confirmation.text));
    }

    let booked = reservations
        .find_active_by_phone("34600111222")
        .await
        .map_err(|error| format!("reservation lookup failed: {error}"))?;
    if booked.len() != 1 {
        return Err(format!("expected one booked reservation, found {}", booked.len()));
    }

    Ok("scripted call booked a confirmed reservation in three turns".to_string())
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped because an earlier check failed".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
