//! Repository trait abstractions (A4) separating persistence from business logic,
//! following the donor codebase's `TradeRepository`/`PortfolioRepository` pattern.

use crate::domain::performance::PerformanceMetrics;
use crate::domain::risk::state::CircuitBreakerState;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CircuitBreakerStateRepository: Send + Sync {
    async fn load(&self) -> Result<Option<CircuitBreakerState>>;
    async fn save(&self, state: &CircuitBreakerState) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryWindow {
    Daily,
    Weekly,
    Monthly,
}

#[async_trait]
pub trait PerformanceSummaryRepository: Send + Sync {
    /// Persist a JSON + Markdown summary for `window` keyed by `period` (e.g. "2025-01-15").
    async fn save_summary(
        &self,
        window: SummaryWindow,
        period: &str,
        metrics: &PerformanceMetrics,
    ) -> Result<()>;
}
