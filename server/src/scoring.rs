//! Fire-and-forget score reports to the external scoring service.
//!
//! Each report runs on its own task so a slow or failing endpoint never
//! stalls the simulation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::ScoringConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub user: String,
    pub score: u32,
    pub game: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("scoring service answered {0}")]
    Status(reqwest::StatusCode),
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<ScoringError>,
    },
}

/// Posts score reports with bounded retries. Cheap to clone.
#[derive(Clone)]
pub struct ScoreReporter {
    client: reqwest::Client,
    config: ScoringConfig,
}

impl ScoreReporter {
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(ScoringError::Client)?;
        Ok(Self { client, config })
    }

    pub fn report_for(&self, user: &str, score: u32) -> ScoreReport {
        ScoreReport {
            user: user.to_string(),
            score,
            game: self.config.game.clone(),
        }
    }

    /// POST the report, retrying with a fixed backoff. Returns the number of
    /// attempts used on success.
    pub async fn send(&self, report: &ScoreReport) -> Result<u32, ScoringError> {
        let backoff = Duration::from_millis(self.config.backoff_ms);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.post_once(report).await {
                Ok(()) => return Ok(attempt),
                Err(e) => {
                    tracing::warn!(
                        user = %report.user,
                        attempt,
                        error = %e,
                        "Score report attempt failed"
                    );
                    if attempt >= self.config.max_attempts {
                        return Err(ScoringError::Exhausted {
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn post_once(&self, report: &ScoreReport) -> Result<(), ScoringError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(report)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScoringError::Status(response.status()));
        }
        Ok(())
    }

    /// Send on a detached task; the outcome is only logged.
    pub fn spawn(&self, report: ScoreReport) -> JoinHandle<()> {
        let reporter = self.clone();
        tokio::spawn(async move {
            match reporter.send(&report).await {
                Ok(attempts) => {
                    tracing::info!(user = %report.user, score = report.score, attempts, "Score sent")
                }
                Err(e) => tracing::error!(
                    user = %report.user,
                    score = report.score,
                    game = %report.game,
                    error = %e,
                    "Dropping score report"
                ),
            }
        })
    }
}
