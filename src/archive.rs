use std::time::Duration;

use rand::Rng;
use tracing::{error, info, instrument};

use crate::config::USER_AGENT;
use crate::{Error, Result};

pub const SAVE_ENDPOINT: &str = "https://web.archive.org/save/";
const SAVE_TIMEOUT: Duration = Duration::from_secs(120);

/// Delay before each save request, jittered by up to `PACE_JITTER` either way.
const PACE: Duration = Duration::from_secs(10);
const PACE_JITTER: Duration = Duration::from_secs(3);

pub fn save_url(endpoint: &str, target: &str) -> String {
    format!("{endpoint}{target}")
}

pub fn jittered_delay<R: Rng + ?Sized>(rng: &mut R, pace: Duration, jitter: Duration) -> Duration {
    let jitter = jitter.as_secs_f64();
    let offset = if jitter > 0.0 {
        rng.random_range(-jitter..=jitter)
    } else {
        0.0
    };
    Duration::from_secs_f64((pace.as_secs_f64() + offset).max(0.0))
}

/// Requests Wayback Machine snapshots of the public mirror.
#[derive(Debug, Clone)]
pub struct Archiver {
    agent: ureq::Agent,
    endpoint: String,
    pace: Duration,
    jitter: Duration,
    urls: Vec<String>,
}

impl Archiver {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(SAVE_TIMEOUT)
                .user_agent(USER_AGENT)
                .build(),
            endpoint: SAVE_ENDPOINT.to_owned(),
            pace: PACE,
            jitter: PACE_JITTER,
            urls,
        }
    }

    /// Prefix each target url is appended to.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_pace(mut self, pace: Duration, jitter: Duration) -> Self {
        self.pace = pace;
        self.jitter = jitter;
        self
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    fn save(agent: &ureq::Agent, url: &str) -> Result<()> {
        agent.get(url).call().map_err(|e| Error::http(url, e))?;
        Ok(())
    }

    /// Archives every url in turn. Failures are logged and do not stop the pass.
    #[instrument(skip_all)]
    pub async fn archive_all(&self) {
        info!("starting archival of {} urls", self.urls.len());
        for target in &self.urls {
            let delay = jittered_delay(&mut rand::rng(), self.pace, self.jitter);
            info!("waiting {:.2} seconds before next archive", delay.as_secs_f64());
            tokio::time::sleep(delay).await;

            info!("archiving {}", target);
            let agent = self.agent.clone();
            let url = save_url(&self.endpoint, target);
            match tokio::task::spawn_blocking(move || Self::save(&agent, &url)).await {
                Ok(Ok(())) => info!("archived {}", target),
                Ok(Err(e)) => error!("failed to archive {}: {}", target, e),
                Err(e) => error!("archive task for {} failed: {}", target, e),
            }
        }
        info!("archival finished");
    }
}
