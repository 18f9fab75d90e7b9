// [libs/infra/sms/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SMS PROVIDER ADAPTER (ESTRATO L3)
 * CLASIFICACION: INFRASTRUCTURE LIB
 * RESPONSABILIDAD: DESPLIEGUE Y ESCUCHA DE ESTADO DE MENSAJES SALIENTES
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod webhook;

pub use client::{HttpSmsProvider, SendSmsRequest, SendSmsResponse, SmsProvider};
pub use errors::ClientError;
pub use webhook::{parse_webhook_event, DeliveryWebhookEvent, WebhookEventKind, WebhookParseError};
