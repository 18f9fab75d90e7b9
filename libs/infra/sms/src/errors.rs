// [libs/infra/sms/src/errors.rs]
//! =================================================================
//! APARATO: SMS CLIENT ERRORS (ESTRATO L3)
//! RESPONSABILIDAD: CATALOGACION DE FALLOS DE DESPLIEGUE DE MENSAJES
//! =================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("[L3_SMS_NET_FAULT] failed to reach messaging provider: {0}")]
    NetworkFault(#[from] reqwest::Error),

    #[error("[L3_SMS_ENVELOPE_FAULT] malformed provider response: {0}")]
    DecodingFault(#[from] serde_json::Error),

    #[error("[L3_SMS_REJECTION] provider rejected the message: {0}")]
    ProviderRejection(String),

    #[error("[L3_SMS_IDENTITY_FAULT] messaging profile or credentials invalid")]
    Unauthorized,
}
