//! # fleetsim-domain
//!
//! Pure domain model for the fleetsim telemetry simulator.
//!
//! ## Responsibilities
//! - Foundational types: device identifiers, error conventions, timestamps
//! - Define **Device kinds** (temperature/humidity, light, motion, smart switch)
//! - Define **Readings** (the immutable, timestamped record a device publishes)
//! - Define **Generators** (state → reading, one per device kind)
//! - Define the **topic layout** and **control messages** received on it
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod control;
pub mod device;
pub mod generator;
pub mod reading;
pub mod topic;
