//! TikTok Content Posting API, direct post.
//!
//! 1. `POST {api_base}/v2/post/publish/video/init/` with post and source info
//! 2. single-chunk `PUT` of the whole file to the returned `upload_url`

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{credential, TikTokConfig};

use super::{PublishError, Publisher};

const TITLE_MAX_CHARS: usize = 150;
const REAUTH_GUIDANCE: &str = "Re-authenticate at https://developers.tiktok.com/apps/ and update TIKTOK_ACCESS_TOKEN";

pub struct TikTokPublisher {
    client: reqwest::Client,
    config: TikTokConfig,
}

impl TikTokPublisher {
    pub fn from_config(config: &TikTokConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn token(&self) -> Option<String> {
        credential(self.config.access_token.clone())
    }

    fn init_url(&self) -> String {
        format!(
            "{}/v2/post/publish/video/init/",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Request body for the init call.
    pub fn init_body(&self, caption: &str, video_size: u64) -> Value {
        let title: String = caption.chars().take(TITLE_MAX_CHARS).collect();
        json!({
            "post_info": {
                "title": title,
                "privacy_level": self.config.privacy_level,
                "disable_duet": false,
                "disable_comment": false,
                "disable_stitch": false,
            },
            "source_info": {
                "source": "FILE_UPLOAD",
                "video_size": video_size,
                "chunk_size": video_size,
                "total_chunk_count": 1,
            },
        })
    }
}

/// Map a non-successful init response to an error.  Expired or invalid
/// tokens become [`PublishError::Auth`] with re-authentication guidance.
pub fn init_error(status: u16, body: &Value) -> PublishError {
    let code = body["error"]["code"].as_str().unwrap_or_default();
    if status == 401 || code == "access_token_invalid" {
        let detail = body["error"]["message"]
            .as_str()
            .filter(|m| !m.is_empty())
            .unwrap_or("access token expired or invalid")
            .to_string();
        return PublishError::Auth {
            detail,
            guidance: REAUTH_GUIDANCE.into(),
        };
    }
    PublishError::Rejected {
        status,
        body: body.to_string(),
    }
}

#[async_trait]
impl Publisher for TikTokPublisher {
    fn platform(&self) -> &'static str {
        "tiktok"
    }

    fn has_credentials(&self) -> bool {
        self.token().is_some()
    }

    async fn publish(&self, caption: &str, artifact: &Path) -> Result<String, PublishError> {
        let token = self.token().ok_or_else(|| PublishError::Auth {
            detail: "TIKTOK_ACCESS_TOKEN is not configured".into(),
            guidance: REAUTH_GUIDANCE.into(),
        })?;

        let video = tokio::fs::read(artifact).await?;
        let size = video.len() as u64;
        if size == 0 {
            return Err(PublishError::Protocol(format!("{} is empty", artifact.display())));
        }

        let response = self
            .client
            .post(self.init_url())
            .bearer_auth(&token)
            .json(&self.init_body(caption, size))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        // TikTok reports some failures with HTTP 200 and a non-"ok" error code.
        let code = body["error"]["code"].as_str().unwrap_or("ok");
        if status != 200 || code != "ok" {
            return Err(init_error(status, &body));
        }

        let upload_url = body["data"]["upload_url"]
            .as_str()
            .ok_or_else(|| PublishError::Protocol("init response has no upload_url".into()))?;
        let publish_id = body["data"]["publish_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        log::info!("tiktok: uploading {size} bytes");
        let upload = self
            .client
            .put(upload_url)
            .header("Content-Type", "video/mp4")
            .header("Content-Range", format!("bytes 0-{}/{size}", size - 1))
            .body(video)
            .send()
            .await?;

        let status = upload.status();
        if !matches!(status.as_u16(), 200 | 201) {
            let body = upload.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(format!("publish_id {publish_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> TikTokPublisher {
        TikTokPublisher::from_config(&TikTokConfig {
            access_token: Some("act.valid".into()),
            ..TikTokConfig::default()
        })
    }

    #[test]
    fn credentials_follow_token() {
        assert!(!TikTokPublisher::from_config(&TikTokConfig::default()).has_credentials());
        assert!(!TikTokPublisher::from_config(&TikTokConfig {
            access_token: Some("your_tiktok_access_token".into()),
            ..TikTokConfig::default()
        })
        .has_credentials());
        assert!(configured().has_credentials());
    }

    #[test]
    fn init_body_is_single_chunk_private_post() {
        let long_caption = "x".repeat(400);
        let body = configured().init_body(&long_caption, 2_000_000);

        assert_eq!(body["post_info"]["privacy_level"], "SELF_ONLY");
        assert_eq!(body["post_info"]["title"].as_str().unwrap().len(), 150);
        assert_eq!(body["source_info"]["video_size"], 2_000_000);
        assert_eq!(body["source_info"]["chunk_size"], 2_000_000);
        assert_eq!(body["source_info"]["total_chunk_count"], 1);
    }

    #[test]
    fn expired_token_is_auth_failure_with_guidance() {
        let body = json!({"error": {"code": "access_token_invalid", "message": ""}});
        match init_error(200, &body) {
            PublishError::Auth { guidance, .. } => assert!(guidance.contains("Re-authenticate")),
            other => panic!("expected Auth, got {other:?}"),
        }
        assert!(matches!(init_error(401, &Value::Null), PublishError::Auth { .. }));
    }

    #[test]
    fn other_errors_are_rejections() {
        let body = json!({"error": {"code": "spam_risk_too_many_posts"}});
        assert!(matches!(
            init_error(403, &body),
            PublishError::Rejected { status: 403, .. }
        ));
    }

    #[test]
    fn init_url_is_normalised() {
        let publisher = TikTokPublisher::from_config(&TikTokConfig {
            api_base: "https://open.tiktokapis.com/".into(),
            ..TikTokConfig::default()
        });
        assert_eq!(
            publisher.init_url(),
            "https://open.tiktokapis.com/v2/post/publish/video/init/"
        );
    }
}
