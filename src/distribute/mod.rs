//! Per-platform distribution.
//!
//! Every configured [`Publisher`] is attempted concurrently and
//! independently:
//!
//! ```text
//! caption ──┬──▶ tiktok     ──▶ Published | Skipped | Failed
//!           └──▶ instagram  ──▶ Published | Skipped | Failed
//!                    join_all ──▶ Vec<DistributionResult>
//! ```
//!
//! Missing credentials are a `Skipped` result, never an error.  A failure on
//! one platform never prevents another's attempt.  Nothing is retried.

pub mod caption;
pub mod instagram;
pub mod tiktok;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;

use crate::content::ContentPackage;

pub use caption::build_caption;
pub use instagram::InstagramPublisher;
pub use tiktok::TikTokPublisher;

// ---------------------------------------------------------------------------
// PublishError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PublishError {
    /// Credentials were present but refused.
    #[error("authorization failed: {detail}. {guidance}")]
    Auth { detail: String, guidance: String },

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("platform returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected platform response: {0}")]
    Protocol(String),

    #[error("could not read artifact: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        PublishError::Request(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Publisher trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Stable platform name used in results and logs.
    fn platform(&self) -> &'static str;

    /// Whether every credential this platform needs is configured.
    fn has_credentials(&self) -> bool;

    /// Upload and publish; returns a platform identifier for the post.
    async fn publish(&self, caption: &str, artifact: &Path) -> Result<String, PublishError>;
}

// ---------------------------------------------------------------------------
// DistributionResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Published,
    Skipped,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Published => "published",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "FAILED",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionResult {
    pub platform: String,
    pub outcome: Outcome,
    pub detail: String,
}

impl DistributionResult {
    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

impl fmt::Display for DistributionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10} {:<9} {}", self.platform, self.outcome, self.detail)
    }
}

// ---------------------------------------------------------------------------
// Distributor
// ---------------------------------------------------------------------------

pub struct Distributor {
    publishers: Vec<Arc<dyn Publisher>>,
    extra_hashtags: Vec<String>,
}

impl Distributor {
    pub fn new(publishers: Vec<Arc<dyn Publisher>>, extra_hashtags: Vec<String>) -> Self {
        Self {
            publishers,
            extra_hashtags,
        }
    }

    /// One result per publisher, in publisher order.
    pub async fn publish(
        &self,
        package: &ContentPackage,
        artifact: &Path,
    ) -> Vec<DistributionResult> {
        let caption = build_caption(package, &self.extra_hashtags);
        log::debug!("distribute: caption {caption:?}");

        let attempts = self
            .publishers
            .iter()
            .map(|publisher| attempt(publisher.as_ref(), &caption, artifact));
        let results = join_all(attempts).await;

        for r in &results {
            match r.outcome {
                Outcome::Failed => log::error!("distribute: {}: {}", r.platform, r.detail),
                _ => log::info!("distribute: {}: {} ({})", r.platform, r.outcome, r.detail),
            }
        }
        results
    }
}

async fn attempt(publisher: &dyn Publisher, caption: &str, artifact: &Path) -> DistributionResult {
    let platform = publisher.platform().to_string();

    if !publisher.has_credentials() {
        return DistributionResult {
            platform,
            outcome: Outcome::Skipped,
            detail: "credentials not configured".into(),
        };
    }

    match publisher.publish(caption, artifact).await {
        Ok(id) => DistributionResult {
            platform,
            outcome: Outcome::Published,
            detail: id,
        },
        Err(e) => DistributionResult {
            platform,
            outcome: Outcome::Failed,
            detail: e.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakePublisher {
        name: &'static str,
        credentials: bool,
        fail: bool,
        delay_ms: u64,
        calls: AtomicUsize,
    }

    impl FakePublisher {
        fn new(name: &'static str, credentials: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                credentials,
                fail,
                delay_ms: 0,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        fn platform(&self) -> &'static str {
            self.name
        }

        fn has_credentials(&self) -> bool {
            self.credentials
        }

        async fn publish(&self, caption: &str, _artifact: &Path) -> Result<String, PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(caption.contains("#WordOfTheDay"));
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            if self.fail {
                Err(PublishError::Auth {
                    detail: "token expired".into(),
                    guidance: "Re-authenticate.".into(),
                })
            } else {
                Ok(format!("{}-post-1", self.name))
            }
        }
    }

    fn package() -> ContentPackage {
        ContentPackage::from_value(&serde_json::json!({
            "word": "sonder",
            "definitions": ["one", "two", "three"],
            "narration": "Everyone has a story.",
            "on_screen_text": ["Everyone is", "a main character"],
            "background_hex": "#0d1b2a"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn no_credentials_means_all_skipped() {
        let a = FakePublisher::new("tiktok", false, false);
        let b = FakePublisher::new("instagram", false, false);
        let publishers: Vec<Arc<dyn Publisher>> = vec![a.clone(), b.clone()];
        let distributor = Distributor::new(publishers, vec![]);

        let results = distributor.publish(&package(), Path::new("/x.mp4")).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.outcome == Outcome::Skipped));
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn one_failure_does_not_affect_others() {
        let broken = FakePublisher::new("tiktok", true, true);
        let healthy = FakePublisher::new("instagram", true, false);
        let publishers: Vec<Arc<dyn Publisher>> = vec![broken, healthy.clone()];
        let distributor = Distributor::new(publishers, vec![]);

        let results = distributor.publish(&package(), Path::new("/x.mp4")).await;

        assert_eq!(results[0].outcome, Outcome::Failed);
        assert!(results[0].detail.contains("Re-authenticate"));
        assert_eq!(results[1].outcome, Outcome::Published);
        assert_eq!(results[1].detail, "instagram-post-1");
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_run_concurrently_and_keep_order() {
        let slow = |name| {
            Arc::new(FakePublisher {
                name,
                credentials: true,
                fail: false,
                delay_ms: 5_000,
                calls: AtomicUsize::new(0),
            })
        };
        let publishers: Vec<Arc<dyn Publisher>> = vec![slow("first"), slow("second")];
        let distributor = Distributor::new(publishers, vec![]);

        let started = tokio::time::Instant::now();
        let results = distributor.publish(&package(), Path::new("/x.mp4")).await;

        assert!(started.elapsed() < Duration::from_secs(6));
        assert_eq!(results[0].platform, "first");
        assert_eq!(results[1].platform, "second");
    }

    #[test]
    fn result_display_is_one_line() {
        let r = DistributionResult {
            platform: "tiktok".into(),
            outcome: Outcome::Skipped,
            detail: "credentials not configured".into(),
        };
        let line = r.to_string();
        assert!(line.starts_with("tiktok"));
        assert!(line.contains("skipped"));
        assert!(!line.contains('\n'));
    }
}
