//! Shared building blocks for billing platform services.
//!
//! Provides the error taxonomy, configuration loading, logging bootstrap,
//! and webhook signature helpers used across service crates.

pub mod config;
pub mod error;
pub mod observability;
pub mod signature;
