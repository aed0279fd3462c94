//! Instagram Graph API reel publishing.
//!
//! ```text
//! POST {graph}/{user}/media  (REELS, resumable)  ──▶ container id + upload uri
//! POST {uri}  (raw bytes, offset 0)
//! GET  {graph}/{container}?fields=status_code     until FINISHED
//! POST {graph}/{user}/media_publish              ──▶ media id
//! ```

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{credential, InstagramConfig};

use super::{PublishError, Publisher};

/// Graph API code for an invalid or expired OAuth token.
const OAUTH_EXCEPTION: i64 = 190;
const REAUTH_GUIDANCE: &str =
    "Generate a new long-lived token and update INSTAGRAM_ACCESS_TOKEN";

const STATUS_POLL_ATTEMPTS: u32 = 30;
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct InstagramPublisher {
    client: reqwest::Client,
    config: InstagramConfig,
}

impl InstagramPublisher {
    pub fn from_config(config: &InstagramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn credentials(&self) -> Option<(String, String)> {
        Some((
            credential(self.config.user_id.clone())?,
            credential(self.config.access_token.clone())?,
        ))
    }

    fn graph(&self, path: &str) -> String {
        format!("{}/{path}", self.config.graph_base.trim_end_matches('/'))
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value, PublishError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        match graph_error(status, &body) {
            Some(e) => Err(e),
            None => Ok(body),
        }
    }

    async fn wait_until_ready(&self, container: &str, token: &str) -> Result<(), PublishError> {
        for _ in 0..STATUS_POLL_ATTEMPTS {
            let body = self
                .send_json(
                    self.client
                        .get(self.graph(container))
                        .query(&[("fields", "status_code"), ("access_token", token)]),
                )
                .await?;

            match body["status_code"].as_str().unwrap_or_default() {
                "FINISHED" => return Ok(()),
                "ERROR" | "EXPIRED" => {
                    return Err(PublishError::Protocol(format!(
                        "container {container} processing ended with {}",
                        body["status_code"]
                    )))
                }
                other => log::debug!("instagram: container {container} status {other:?}"),
            }
            tokio::time::sleep(STATUS_POLL_INTERVAL).await;
        }
        Err(PublishError::Protocol(format!(
            "container {container} was not ready in time"
        )))
    }
}

/// Error carried by a Graph API response, if any.  OAuth failures become
/// [`PublishError::Auth`].
pub fn graph_error(status: u16, body: &Value) -> Option<PublishError> {
    let error = &body["error"];
    if error.is_null() && (200..300).contains(&status) {
        return None;
    }

    if error["code"].as_i64() == Some(OAUTH_EXCEPTION) || status == 401 {
        let detail = error["message"]
            .as_str()
            .unwrap_or("access token expired or invalid")
            .to_string();
        return Some(PublishError::Auth {
            detail,
            guidance: REAUTH_GUIDANCE.into(),
        });
    }

    Some(PublishError::Rejected {
        status,
        body: body.to_string(),
    })
}

#[async_trait]
impl Publisher for InstagramPublisher {
    fn platform(&self) -> &'static str {
        "instagram"
    }

    fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    async fn publish(&self, caption: &str, artifact: &Path) -> Result<String, PublishError> {
        let (user_id, token) = self.credentials().ok_or_else(|| PublishError::Auth {
            detail: "INSTAGRAM_USER_ID / INSTAGRAM_ACCESS_TOKEN are not configured".into(),
            guidance: REAUTH_GUIDANCE.into(),
        })?;

        let video = tokio::fs::read(artifact).await?;
        let size = video.len();

        let container = self
            .send_json(self.client.post(self.graph(&format!("{user_id}/media"))).query(&[
                ("media_type", "REELS"),
                ("upload_type", "resumable"),
                ("caption", caption),
                ("access_token", token.as_str()),
            ]))
            .await?;
        let container_id = container["id"]
            .as_str()
            .ok_or_else(|| PublishError::Protocol("container response has no id".into()))?
            .to_string();
        let upload_uri = container["uri"]
            .as_str()
            .ok_or_else(|| PublishError::Protocol("container response has no upload uri".into()))?
            .to_string();

        log::info!("instagram: uploading {size} bytes to container {container_id}");
        self.send_json(
            self.client
                .post(&upload_uri)
                .header("Authorization", format!("OAuth {token}"))
                .header("offset", "0")
                .header("file_size", size.to_string())
                .body(video),
        )
        .await?;

        self.wait_until_ready(&container_id, &token).await?;

        let published = self
            .send_json(
                self.client
                    .post(self.graph(&format!("{user_id}/media_publish")))
                    .query(&[
                        ("creation_id", container_id.as_str()),
                        ("access_token", token.as_str()),
                    ]),
            )
            .await?;

        let media_id = published["id"].as_str().unwrap_or_default();
        Ok(format!("media_id {media_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn both_credentials_required() {
        let only_token = InstagramPublisher::from_config(&InstagramConfig {
            access_token: Some("EAAB".into()),
            ..InstagramConfig::default()
        });
        assert!(!only_token.has_credentials());

        let both = InstagramPublisher::from_config(&InstagramConfig {
            user_id: Some("1784".into()),
            access_token: Some("EAAB".into()),
            ..InstagramConfig::default()
        });
        assert!(both.has_credentials());
    }

    #[test]
    fn oauth_code_is_auth_failure() {
        let body = json!({"error": {"message": "Session has expired", "code": 190}});
        match graph_error(400, &body) {
            Some(PublishError::Auth { detail, guidance }) => {
                assert_eq!(detail, "Session has expired");
                assert!(guidance.contains("INSTAGRAM_ACCESS_TOKEN"));
            }
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn success_has_no_error() {
        assert!(graph_error(200, &json!({"id": "1790"})).is_none());
    }

    #[test]
    fn other_graph_errors_are_rejections() {
        let body = json!({"error": {"message": "Invalid parameter", "code": 100}});
        assert!(matches!(
            graph_error(400, &body),
            Some(PublishError::Rejected { status: 400, .. })
        ));
    }

    #[test]
    fn graph_paths_are_joined() {
        let publisher = InstagramPublisher::from_config(&InstagramConfig::default());
        assert_eq!(
            publisher.graph("1784/media"),
            "https://graph.facebook.com/v21.0/1784/media"
        );
    }
}
