//! `CircuitBreakerStateRepository` implementations (§4.14): a JSON file backed by
//! atomic write-temp+rename, and an in-memory double for tests.
//!
//! Grounded on the donor codebase's repository-trait pattern
//! (`TradeRepository`/`PortfolioRepository`), adapted to the single circuit-breaker
//! state file at `state/circuit_breaker.json`.

use crate::domain::repositories::CircuitBreakerStateRepository;
use crate::domain::risk::state::CircuitBreakerState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;

pub struct FileCircuitBreakerStateRepository {
    path: PathBuf,
}

impl FileCircuitBreakerStateRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CircuitBreakerStateRepository for FileCircuitBreakerStateRepository {
    async fn load(&self) -> Result<Option<CircuitBreakerState>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let state = serde_json::from_str(&contents)
                    .with_context(|| format!("malformed circuit breaker state at {:?}", self.path))?;
                Ok(Some(state))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Atomic write-temp+rename so a crash mid-write never leaves a half-written,
    /// unparseable state file behind (§4.5).
    async fn save(&self, state: &CircuitBreakerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(state)?;
        fs::write(&tmp_path, contents).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCircuitBreakerStateRepository {
    state: RwLock<Option<CircuitBreakerState>>,
}

#[async_trait]
impl CircuitBreakerStateRepository for InMemoryCircuitBreakerStateRepository {
    async fn load(&self) -> Result<Option<CircuitBreakerState>> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &CircuitBreakerState) -> Result<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }
}
