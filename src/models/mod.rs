//! Data models for the demonstrations.
//!
//! This module contains the values read from the `accounts` table and the
//! vocabulary used to narrate them.

/// Account names and balance values
pub mod account;
/// Transaction isolation levels
pub mod isolation;
/// Narrated balance readings
pub mod observation;
