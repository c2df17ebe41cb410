//! Slot extraction strategy chain.
//!
//! Strategies are tried in order; the first applicable one that succeeds
//! wins. The deterministic strategy is always applicable and infallible, so
//! the chain as a whole never fails to produce a result.

use chrono::{DateTime, NaiveDate, Utc};

use reserva_core::config::{AnalyzerConfig, AnalyzerProvider, RestaurantConfig};
use reserva_core::domain::extraction::SlotExtractionResult;
use reserva_core::domain::session::CallSession;
use reserva_core::errors::ApplicationError;

use crate::analyzer::AnalyzerStrategy;
use crate::fallback::DeterministicStrategy;
use crate::llm::GeminiClient;

/// Hard cap applied before any processing; keeps prompts bounded no matter
/// what the speech layer hands us.
pub const MAX_UTTERANCE_CHARS: usize = 10_000;

/// Truncates on a char boundary so multi-byte text never splits mid-scalar.
pub fn truncate_utterance(raw: &str) -> &str {
    match raw.char_indices().nth(MAX_UTTERANCE_CHARS) {
        Some((byte_index, _)) => &raw[..byte_index],
        None => raw,
    }
}

/// Everything a strategy may look at besides the utterance itself.
pub struct ExtractionContext<'a> {
    pub session: &'a CallSession,
    pub restaurant: &'a RestaurantConfig,
    pub now: DateTime<Utc>,
}

impl ExtractionContext<'_> {
    pub fn today(&self) -> NaiveDate {
        self.now.naive_utc().date()
    }
}

#[async_trait::async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn applicable(&self, ctx: &ExtractionContext<'_>) -> bool;

    async fn extract(
        &self,
        utterance: &str,
        ctx: &ExtractionContext<'_>,
    ) -> Result<SlotExtractionResult, ApplicationError>;
}

pub struct SlotExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl SlotExtractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Analyzer first when the config carries a usable Gemini setup, then
    /// the deterministic parser as the guaranteed last resort.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::new();
        if config.provider == AnalyzerProvider::Gemini {
            if let Some(client) = GeminiClient::from_config(config) {
                strategies.push(Box::new(AnalyzerStrategy::new(client)));
            }
        }
        strategies.push(Box::new(DeterministicStrategy));
        Self::new(strategies)
    }

    pub fn deterministic_only() -> Self {
        Self::new(vec![Box::new(DeterministicStrategy)])
    }

    pub async fn extract(
        &self,
        utterance: &str,
        ctx: &ExtractionContext<'_>,
    ) -> SlotExtractionResult {
        let utterance = truncate_utterance(utterance);
        for strategy in &self.strategies {
            if !strategy.applicable(ctx) {
                continue;
            }
            match strategy.extract(utterance, ctx).await {
                Ok(result) => return result,
                Err(error) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %error,
                        "extraction strategy failed, trying next"
                    );
                }
            }
        }
        // Unreachable with the default chain; kept so a custom chain that
        // exhausts itself still yields a clarification turn.
        SlotExtractionResult::empty(reserva_core::domain::extraction::ExtractionSource::Deterministic)
    }
}
