//! # homebus-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ReadingRepository`: append and query readings
//!   - `DeviceRepository`: device status and actuator lookup
//!   - `AlertRepository`: persist alerts
//!   - `CommandPublisher`: hand messages to the broker
//!   - `EventPublisher`: broadcast domain events
//! - Define **driving/inbound** use-cases:
//!   - `TelemetryRouter`: decode and dispatch every inbound broker message
//!   - `CommandService`: publish tagged commands (also used by the HTTP layer)
//!   - `AlertEmitter`: persist and announce alerts
//! - Provide **in-process infrastructure** (event bus, trend predictor) that
//!   doesn't need IO
//!
//! ## Dependency rule
//! Depends on `homebus-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod ports;
pub mod predictor;
pub mod router;
pub mod services;

#[cfg(test)]
mod testing;
