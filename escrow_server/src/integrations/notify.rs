use std::sync::Arc;

use escrow_engine::traits::Notifier;
use log::*;
use reqwest::Client;
use serde_json::json;

/// Posts user notifications to the marketplace's notification service. When no endpoint is
/// configured the notification is logged instead, which keeps development setups working.
///
/// Failures are logged and swallowed: notification delivery must never affect a transaction.
#[derive(Clone)]
pub struct NotifyClient {
    endpoint: Option<String>,
    client: Arc<Client>,
}

impl NotifyClient {
    pub fn new(endpoint: Option<String>) -> Self {
        Self { endpoint, client: Arc::new(Client::new()) }
    }
}

impl Notifier for NotifyClient {
    async fn notify(&self, user_id: &str, kind: &str, title: &str, message: &str, link: &str) {
        let Some(endpoint) = &self.endpoint else {
            info!("📨️ [{kind}] to [{user_id}]: {title}. {message} ({link})");
            return;
        };
        let body = json!({
            "userId": user_id,
            "type": kind,
            "title": title,
            "message": message,
            "link": link,
        });
        match self.client.post(endpoint).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                trace!("📨️ Notification [{kind}] delivered to [{user_id}]");
            },
            Ok(resp) => {
                warn!("📨️ Notification service returned {} for [{kind}] to [{user_id}]", resp.status());
            },
            Err(e) => {
                warn!("📨️ Could not deliver notification [{kind}] to [{user_id}]: {e}");
            },
        }
    }
}
