//! # homebus-domain
//!
//! Pure domain model for the homebus telemetry and actuation bus.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Decode broker **topics** into addresses and build outbound ones
//! - Decode inbound **payloads** (scalars, objects, multi-sensor boards)
//! - Define **Readings**, **Devices**, **Commands** and **Alerts**
//! - Recognize the bus's own commands echoing back (**feedback guard**)
//! - Predict series trends and decide on **auto-control** commands
//! - Evaluate static alert **thresholds**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod alert;
pub mod command;
pub mod device;
pub mod event;
pub mod feedback;
pub mod inbound;
pub mod mapping;
pub mod payload;
pub mod policy;
pub mod prediction;
pub mod reading;
pub mod threshold;
pub mod topic;
