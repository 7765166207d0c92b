//! Local Webhook Capture and Replay
//!
//! This crate provides the core of a local webhook development server:
//! capture inbound webhook deliveries on a local port, inspect them, and
//! replay them against any target URL.
//!
//! # Features
//!
//! - **Capture Server**: every path on the listener records method, headers
//!   and raw body; a fixed `/health` route reports the capture count
//! - **Signature Verification**: HMAC-SHA256 over the raw body with
//!   constant-time comparison, recorded per event without gating capture
//! - **In-Memory Event Store**: concurrency-safe, append-only, with
//!   monotonically increasing `wh_<n>` identifiers
//! - **Replay**: resend any captured event verbatim through one shared,
//!   connection-pooling HTTP client
//! - **Persistence**: save/load single events as indented JSON files with
//!   owner-only permissions
//! - **Hardened Transport**: independent header-read, body-read, write and
//!   keep-alive idle timeouts bound slow or malicious clients
//!
//! # Example: Capturing Webhooks
//!
//! ```rust,no_run
//! use hookline::{CaptureServer, ServerConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = CaptureServer::new();
//!     let addr = server
//!         .start(ServerConfig::builder().port(8080).build())
//!         .await?;
//!     println!("capturing webhooks on http://{addr}");
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.stop(Duration::from_secs(10)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Example: Replaying a Captured Webhook
//!
//! ```rust,no_run
//! use hookline::{CaptureServer, ReplayClient};
//!
//! # async fn example(server: &CaptureServer) -> hookline::Result<()> {
//! let replay = ReplayClient::new(server.store());
//! replay.replay("wh_1", "https://api.example.com/hooks").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Verifying Signatures
//!
//! ```rust
//! use hookline::SignatureVerifier;
//!
//! let verifier = SignatureVerifier::new("s3cr3t");
//! let signature = verifier.sign(b"payload");
//! assert!(verifier.verify(b"payload", &signature));
//! ```

mod config;
mod error;
mod event;
pub mod persist;
mod replay;
mod server;
mod signature;
mod store;
mod timeout_io;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::CaptureError;
pub use event::CapturedEvent;
pub use replay::{DEFAULT_REPLAY_TIMEOUT, ReplayClient};
pub use server::{CaptureServer, HEALTH_PATH, ServerState};
pub use signature::{SIGNATURE_HEADER, SignatureVerifier};
pub use store::EventStore;

/// Result type for capture and replay operations
pub type Result<T> = std::result::Result<T, CaptureError>;
