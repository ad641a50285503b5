//! # fleetsim-app
//!
//! Application layer — the device lifecycle core and **port definitions**
//! (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `Transport` — connect, publish, subscribe, disconnect
//!   - `TransportEvents` — connection and message callbacks, invoked by the
//!     transport
//! - Run one independent publish loop per [`device::Device`]
//! - Own the device registry and bulk lifecycle in [`manager::DeviceManager`]
//! - Parse and fan out control messages ([`control::ControlListener`])
//! - Provide an in-process [`memory::InMemoryTransport`] that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `fleetsim-domain` only (plus `tokio` for tasks, timers and
//! channels). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod control;
pub mod device;
pub mod manager;
pub mod memory;
pub mod ports;
