//! WordPress page publisher (REST API, application-password basic auth).

use std::time::Duration;

use tracing::{info, warn};

use super::{PublishError, ReportPublisher};
use crate::config::WordPressConfig;

/// Longest response body kept in a `Rejected` error.
const MAX_ERROR_BODY: usize = 500;

pub struct WordPressPublisher {
    client: reqwest::blocking::Client,
    config: WordPressConfig,
}

impl WordPressPublisher {
    pub fn new(config: WordPressConfig) -> Result<Self, PublishError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }

    /// Page update endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/wp-json/wp/v2/pages/{}",
            self.config.url.trim_end_matches('/'),
            self.config.page_id
        )
    }
}

impl ReportPublisher for WordPressPublisher {
    fn name(&self) -> &str {
        "wordpress"
    }

    fn publish(&self, html: &str) -> Result<(), PublishError> {
        let url = self.endpoint();
        info!(%url, "posting report to WordPress");

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&serde_json::json!({ "content": html }))
            .send()?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let mut body = resp.text().unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|&i| body.is_char_boundary(i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            warn!(status = status.as_u16(), "WordPress rejected the update");
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("WordPress page updated");
        Ok(())
    }
}
