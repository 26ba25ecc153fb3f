//! Streaming session management
//!
//! This module provides the `StreamingAvatar` abstraction that manages:
//! - Session negotiation with the remote avatar service
//! - The real-time transport (room protocol or raw chat socket)
//! - Voice chat lifecycle bound to the chosen transport
//! - Connection-quality fusion and the session event surface

mod session;

pub use session::{SessionPhase, StreamingAvatar};
