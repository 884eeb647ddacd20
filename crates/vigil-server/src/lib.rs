//! Vigil Server - process wiring for the status service
//!
//! Loads configuration, initialises logging, wires the library crates into a
//! [`VigilService`](service::VigilService) and owns shutdown ordering.
//! All domain behaviour lives in the library crates.

pub mod config;
pub mod service;
pub mod startup;
