//! Socket and connection management.
//!
//! - [`pool`]: the idle connection cache and dial fallback
//! - [`stream`]: the pooled connection wrapper
//! - [`connectjob`]: DNS → TCP (or Unix) connect flow
//! - [`client`]: the `StreamSocket` abstraction over raw streams

pub mod address;
pub mod client;
pub mod config;
pub mod connectjob;
pub mod pool;
pub mod stream;

#[cfg(test)]
pub(crate) mod mock;
