//! Live-first word acquisition with alert + fallback.

use std::sync::Arc;

use crate::alert::Alerter;

use super::{FallbackSet, SourceError, WordRecord, WordSource};

/// Subject line of the alert sent when the live source fails.
pub const SOURCE_ALERT_SUBJECT: &str = "WOTD Scraper Failed";

/// The acquired word plus whether it came from the fallback set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredWord {
    pub record: WordRecord,
    pub fallback: bool,
}

/// Obtains today's word.
///
/// Any live-source failure is absorbed: the operator is alerted and a local
/// fallback record is returned instead.  The only error that escapes is
/// [`SourceError::FallbackUnavailable`].
pub struct SourceAcquirer {
    live: Arc<dyn WordSource>,
    fallback: FallbackSet,
    alerter: Arc<dyn Alerter>,
}

impl SourceAcquirer {
    pub fn new(live: Arc<dyn WordSource>, fallback: FallbackSet, alerter: Arc<dyn Alerter>) -> Self {
        Self {
            live,
            fallback,
            alerter,
        }
    }

    pub async fn acquire(&self) -> Result<AcquiredWord, SourceError> {
        let err = match self.live.fetch().await {
            Ok(record) => {
                return Ok(AcquiredWord {
                    record,
                    fallback: false,
                })
            }
            Err(e) => e,
        };

        log::warn!("source: live source failed ({err}), falling back to local set");
        self.alerter
            .alert(
                SOURCE_ALERT_SUBJECT,
                &format!(
                    "The word-of-the-day scraper encountered an error:\n\n{err}\n\nFalling back to local data."
                ),
            )
            .await;

        let record = self.fallback.pick()?;
        log::info!("source: using fallback word {:?}", record.word);
        Ok(AcquiredWord {
            record,
            fallback: true,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct OkSource;

    #[async_trait]
    impl WordSource for OkSource {
        async fn fetch(&self) -> Result<WordRecord, SourceError> {
            Ok(record("live"))
        }
    }

    struct DownSource;

    #[async_trait]
    impl WordSource for DownSource {
        async fn fetch(&self) -> Result<WordRecord, SourceError> {
            Err(SourceError::Timeout)
        }
    }

    #[derive(Default)]
    struct RecordingAlerter {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Alerter for RecordingAlerter {
        async fn alert(&self, subject: &str, body: &str) {
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), body.to_string()));
        }
    }

    fn record(word: &str) -> WordRecord {
        WordRecord {
            word: word.into(),
            phonetic: None,
            definitions: vec!["a".into(), "b".into(), "c".into()],
        }
    }

    #[tokio::test]
    async fn live_success_skips_fallback_and_alert() {
        let alerter = Arc::new(RecordingAlerter::default());
        let acquirer = SourceAcquirer::new(
            Arc::new(OkSource),
            FallbackSet::from_records(vec![record("spare")]),
            alerter.clone(),
        );

        let got = acquirer.acquire().await.unwrap();
        assert_eq!(got.record.word, "live");
        assert!(!got.fallback);
        assert!(alerter.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn live_failure_alerts_and_uses_fallback() {
        let alerter = Arc::new(RecordingAlerter::default());
        let acquirer = SourceAcquirer::new(
            Arc::new(DownSource),
            FallbackSet::from_records(vec![record("spare")]),
            alerter.clone(),
        );

        let got = acquirer.acquire().await.unwrap();
        assert_eq!(got.record.word, "spare");
        assert!(got.fallback);

        let sent = alerter.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, SOURCE_ALERT_SUBJECT);
        assert!(sent[0].1.contains("timed out"));
    }

    #[tokio::test]
    async fn empty_fallback_is_the_only_fatal_case() {
        let alerter = Arc::new(RecordingAlerter::default());
        let acquirer = SourceAcquirer::new(
            Arc::new(DownSource),
            FallbackSet::from_records(Vec::new()),
            alerter.clone(),
        );

        let err = acquirer.acquire().await.unwrap_err();
        assert!(matches!(err, SourceError::FallbackUnavailable(_)));
        // The operator is still told about the live failure.
        assert_eq!(alerter.sent.lock().unwrap().len(), 1);
    }
}
