//! Domain logic shared across the Slipway workspace.
//!
//! This crate has no internal dependencies so it can be used by the
//! repository layer, the deploy engine, and the API server alike.

pub mod error;
pub mod naming;
pub mod signing;
pub mod types;
