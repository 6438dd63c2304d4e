//! Utility functions for the reputation scanner.
//!
//! This module is organized into focused submodules:
//!
//! - [`validation`] - Wallet address parsing and checksum validation
//! - [`conversion`] - Type conversions (U256 narrowing, day buckets, rounding)
//! - [`retry`] - Bounded retry with exponential backoff

mod conversion;
mod retry;
mod validation;

// ============================================
// Re-exports
// ============================================

// Conversion utilities
pub use conversion::{
    round2, serialize_as_string, u256_to_u128, u256_to_u64, utc_day, whole_days_between,
    SECONDS_PER_DAY,
};

// Retry utilities
pub use retry::RetryPolicy;

// Validation utilities
pub use validation::parse_wallet_address;
