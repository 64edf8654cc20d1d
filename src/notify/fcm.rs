use async_trait::async_trait;
use google_cloud_auth::credentials::CredentialsFile;
use google_cloud_auth::project::Config;
use google_cloud_auth::token::DefaultTokenSourceProvider;
use google_cloud_token::{TokenSource, TokenSourceProvider};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::{render_body, AlertNotification, Notifier};
use crate::settings::NotifySettings;

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification credentials not configured. Set credentials_file in [notify] config or GOOGLE_APPLICATION_CREDENTIALS.")]
    MissingCredentials,
    #[error("Credential error: {0}")]
    Credentials(#[from] google_cloud_auth::error::Error),
    #[error("Service account JSON has no project_id")]
    MissingProjectId,
}

/// Topic-based FCM HTTP v1 sender.
///
/// Credentials are loaded once at startup; each alert becomes exactly one
/// topic message with Android priority `high`. No retry here - the caller
/// logs and discards failures.
pub struct FcmNotifier {
    client: reqwest::Client,
    token_source: Arc<dyn TokenSource>,
    endpoint: String,
    project_id: String,
    topic: String,
    title: String,
}

impl FcmNotifier {
    /// Resolution order for the service account: `credentials_file` in
    /// `[notify]` config, then `GOOGLE_APPLICATION_CREDENTIALS`, then error.
    pub async fn from_settings(settings: &NotifySettings) -> Result<Self, NotifyError> {
        let cred_path = settings
            .credentials_file
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok())
            .ok_or(NotifyError::MissingCredentials)?;

        info!("notify: Authenticating with service account from {}", cred_path);
        let credentials = CredentialsFile::new_from_file(cred_path).await?;
        let project_id = credentials
            .project_id
            .clone()
            .ok_or(NotifyError::MissingProjectId)?;

        let scopes = [FCM_SCOPE];
        let config = Config::default().with_scopes(&scopes);
        let provider =
            DefaultTokenSourceProvider::new_with_credentials(config, Box::new(credentials))
                .await?;

        Ok(Self::with_token_source(
            provider.token_source(),
            project_id,
            FCM_ENDPOINT.to_string(),
            settings.topic.clone(),
            settings.title.clone(),
        ))
    }

    pub fn with_token_source(
        token_source: Arc<dyn TokenSource>,
        project_id: String,
        endpoint: String,
        topic: String,
        title: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_source,
            endpoint,
            project_id,
            topic,
            title,
        }
    }
}

#[async_trait]
impl Notifier for FcmNotifier {
    async fn send_alert(
        &self,
        notification: &AlertNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let token = self.token_source.token().await?;
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.endpoint.trim_end_matches('/'),
            self.project_id
        );

        let payload = json!({
            "message": {
                "topic": self.topic,
                "notification": {
                    "title": self.title,
                    "body": render_body(notification.magnitude),
                },
                "android": { "priority": "high" },
            }
        });

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("FCM returned HTTP {}: {}", status, body).into());
        }

        Ok(())
    }
}
