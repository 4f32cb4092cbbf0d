//! # quack
//!
//! Delivery surfaces for the Quack engine: an HTTP API, a CLI, and the
//! configuration that wires a [`quack_core::Network`] into both.

pub mod api;
pub mod cli;
pub mod config;
