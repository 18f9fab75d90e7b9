// [apps/gateway/src/handlers/mod.rs]
//! HTTP- and WebSocket-facing surface (§7): the only layer allowed to
//! turn a `CoreError` into a response or read a request header directly.

pub mod alerts;
pub mod health;
pub mod ingestion;
pub mod sms_webhook;
pub mod stream;
