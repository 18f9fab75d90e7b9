// [libs/infra/sms/src/client.rs]
/*!
 * =================================================================
 * APARATO: SMS PROVIDER UPLINK (ESTRATO L3)
 * RESPONSABILIDAD: ENVIO DE MENSAJES SALIENTES VIA PROVEEDOR EXTERNO
 *
 * Deliberately retry-free: a single request, a single response. Every
 * retry/backoff decision belongs to the Job Queue, which re-enqueues the
 * SMS job on failure rather than looping here.
 * =================================================================
 */

use crate::errors::ClientError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Serialize)]
pub struct SendSmsRequest {
    pub to: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messaging_profile_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendSmsResponse {
    pub provider_message_id: String,
    pub status: String,
}

/// Seam swapped in `AppState::new`; the concrete adapter is
/// `HttpSmsProvider`, tests stand in a recording fake implementing this
/// trait directly.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send(&self, request: SendSmsRequest) -> Result<SendSmsResponse, ClientError>;
}

pub struct HttpSmsProvider {
    session: Client,
    base_endpoint: String,
}

impl HttpSmsProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        let mut header_map = reqwest::header::HeaderMap::new();
        let auth_value = reqwest::header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .expect("invalid SMS provider API key format");
        header_map.insert(reqwest::header::AUTHORIZATION, auth_value);

        Self {
            session: Client::builder()
                .default_headers(header_map)
                .user_agent("frostwatch-gateway/sms-dispatcher")
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("failed to build SMS provider HTTP client"),
            base_endpoint: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SmsProvider for HttpSmsProvider {
    #[instrument(skip(self, request), fields(to = %request.to))]
    async fn send(&self, request: SendSmsRequest) -> Result<SendSmsResponse, ClientError> {
        let target_url = format!("{}/v1/messages", self.base_endpoint);
        let response = self.session.post(&target_url).json(&request).send().await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => {
                let body = response.json::<SendSmsResponse>().await?;
                info!(provider_message_id = %body.provider_message_id, "📤 sms accepted by provider");
                Ok(body)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("sms provider rejected credentials");
                Err(ClientError::Unauthorized)
            }
            other => Err(ClientError::ProviderRejection(format!("HTTP_{other}"))),
        }
    }
}
