//! `pidima-gateway`: Pidima admission gateway runtime.
//!
//! This crate provides the concrete implementations of the admission
//! contracts defined in `pidima-kernel::gateway`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | token issuance / validation | [`token::TokenIssuer`], [`token::TokenValidator`] |
//! | role claims → capabilities | [`auth::AuthoritiesMapper`] |
//! | rate-limit identity key | [`auth::IdentityResolver`] |
//! | admission state machine | [`pipeline::AdmissionPipeline`] |
//! | [`RateLimiter`](gateway::RateLimiter) | [`middleware::FixedWindowLimiter`] |
//! | [`Downstream`](gateway::Downstream) | [`backend::HttpUpstream`] |
//!
//! The [`server::GatewayServer`] wires everything together into an axum HTTP
//! service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pidima_gateway::server::GatewayServer;
//! use pidima_kernel::gateway::GatewayConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = GatewayConfig::with_secret("change-me-to-at-least-32-bytes!!")
//!         .with_upstream("http://chatbot:8081");
//!
//!     GatewayServer::new(config).start().await.unwrap();
//! }
//! ```

pub mod auth;
pub mod backend;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod token;

// Re-export the kernel gateway types for convenience.
pub use pidima_kernel::gateway;
