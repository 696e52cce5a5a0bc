//! Kubti Core - Shared types library.
//!
//! This crate provides common types used across all Kubti components:
//! - `cart` - Cart reconciliation client (server cart + on-device cart)
//! - `cli` - Command-line front end for the cart client
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, quantities, prices, cart entries, totals and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
