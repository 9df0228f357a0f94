//! `PerformanceSummaryRepository` implementation (§4.14, §6): writes
//! `logs/performance/<window>-<period>.{json,md}`.

use crate::domain::performance::PerformanceMetrics;
use crate::domain::repositories::{PerformanceSummaryRepository, SummaryWindow};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

pub struct FilePerformanceSummaryRepository {
    root: PathBuf,
}

impl FilePerformanceSummaryRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn window_label(window: SummaryWindow) -> &'static str {
        match window {
            SummaryWindow::Daily => "daily",
            SummaryWindow::Weekly => "weekly",
            SummaryWindow::Monthly => "monthly",
        }
    }

    fn render_markdown(window: SummaryWindow, period: &str, metrics: &PerformanceMetrics) -> String {
        format!(
            "# Performance summary ({}, {period})\n\n\
             | Metric | Value |\n|---|---|\n\
             | Total return | {} |\n\
             | Sharpe | {:.3} |\n\
             | Max drawdown | {} |\n\
             | Win rate | {:.1}% |\n\
             | Profit factor | {:.2} |\n\
             | Trades | {} |\n",
            Self::window_label(window),
            metrics.total_return,
            metrics.sharpe,
            metrics.max_drawdown,
            metrics.win_rate * 100.0,
            metrics.profit_factor,
            metrics.num_trades,
        )
    }
}

#[async_trait]
impl PerformanceSummaryRepository for FilePerformanceSummaryRepository {
    async fn save_summary(
        &self,
        window: SummaryWindow,
        period: &str,
        metrics: &PerformanceMetrics,
    ) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        let stem = format!("{}-{period}", Self::window_label(window));

        let json_path = self.root.join(format!("{stem}.json"));
        fs::write(&json_path, serde_json::to_string_pretty(metrics)?).await?;

        let md_path = self.root.join(format!("{stem}.md"));
        fs::write(&md_path, Self::render_markdown(window, period, metrics)).await?;

        Ok(())
    }
}
