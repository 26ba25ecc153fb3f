//! REST client for the remote session negotiation API.
//!
//! All endpoints are bearer-token authenticated JSON POSTs with a `{ data }`
//! response envelope. Non-2xx responses surface as a typed error carrying the
//! status code and raw body; nothing is retried automatically.

mod client;
mod types;

pub use client::ApiClient;
pub use types::StartSessionResponse;
