//! remotedial Client Library
//!
//! Client-side bootstrap for a persistent outbound tunnel:
//! - One-shot connection attempts with handshake diagnostics
//! - Pre-flight hooks bound to a per-attempt cancellation scope
//! - A supervisor that pauses after failed attempts
//! - WebSocket dialing and a passive keepalive session

pub mod tunnel;
