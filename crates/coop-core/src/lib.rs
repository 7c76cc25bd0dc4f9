//! Core records and trait definitions for the coop gateway.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! records mirror the directory application's schema as the gateway consumes
//! it; storage backends and the gateway itself depend on this crate.

pub mod error;
pub mod field;
pub mod foreign;
pub mod record;
pub mod slug;
pub mod store;

pub use error::{Error, Result};
