//! # catpoint-domain
//!
//! Pure domain model for the catpoint home security system.
//!
//! ## Responsibilities
//! - Define **Sensors** (named door/window/motion activation sources) and
//!   their identity rules
//! - Define the **arming status** and the **alarm status** escalation ladder
//! - Define the opaque camera **Image** handed to classifiers
//! - Define **Security events** (records of status and sensor changes)
//! - Typed error conventions shared by every layer
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;

pub mod event;
pub mod image;
pub mod sensor;
pub mod status;
