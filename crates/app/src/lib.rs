//! # catpoint-app
//!
//! Application layer — the security use-case and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `SecurityRepository` — sensors plus the arming and alarm statuses
//!   - `ImageClassifier` — "does this camera frame contain a cat"
//!   - `EventPublisher` — fan-out of security events
//! - Define the **driving/inbound port** `SecurityService`, the only place
//!   where sensor, arming and image events turn into alarm-status changes
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `catpoint-domain` only (plus `tokio::sync` for channels and locks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod ports;
pub mod services;
