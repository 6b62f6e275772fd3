use crate::domain::ports::{MailTransport, SendOptions};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

/// Posts rendered guest emails to the HTTP mail relay.
pub struct HttpMailTransport {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpMailTransport {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct MailPayload<'a> {
    from_alias: &'a str,
    to_addr: &'a str,
    to_name: &'a str,
    subject: &'a str,
    html_body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_body: Option<&'a str>,
}

#[derive(Deserialize)]
struct RelayResponse {
    message_id: Option<String>,
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(
        &self,
        recipient: &str,
        recipient_name: &str,
        subject: &str,
        html_body: &str,
        text_body: Option<&str>,
        options: &SendOptions,
    ) -> Result<String, AppError> {
        let payload = MailPayload {
            from_alias: "default",
            to_addr: recipient,
            to_name: recipient_name,
            subject,
            html_body,
            text_body,
        };

        let mut request = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(options.timeout)
            .json(&payload);
        if let Some(key) = &options.idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let res = request.send().await.map_err(|e| {
            let msg = format!("Mail relay connection error: {}", e);
            error!("{}", msg);
            AppError::TransientDispatch(msg)
        })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Mail relay rejected message. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::TransientDispatch(msg));
        }

        // Relays without a message id in the body still count as accepted.
        let message_id = res.json::<RelayResponse>().await.ok()
            .and_then(|r| r.message_id)
            .unwrap_or_else(|| format!("local-{}", Uuid::new_v4()));
        debug!(message_id = %message_id, "Mail relay accepted message");
        Ok(message_id)
    }
}
