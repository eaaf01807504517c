//! Application layer use cases for the provider.
//!
//! - **`descriptor`** – Collects identity, geometry, color, and callback
//!   configuration before any remote registration occurs, and validates it
//!   when a display is created from it.
//!
//! - **`display`** – The live display object: registration, settings
//!   transitions, and the termination handshake. This is the most critical
//!   piece — it owns the concurrency and exactly-once guarantees.

pub mod descriptor;
pub mod display;
