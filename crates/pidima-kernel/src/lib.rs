//! `pidima-kernel`: contracts for the Pidima admission gateway.
//!
//! This crate holds the types and traits shared by the gateway runtime:
//! request/response primitives, token claims, the admission state machine's
//! vocabulary, the error taxonomy, and the configuration model. It performs
//! no network I/O; concrete implementations live in `pidima-gateway`.

// gateway contracts
pub mod gateway;

// configuration loader
pub mod config;
