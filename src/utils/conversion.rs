//! Type conversion and formatting utilities.
//!
//! Conversions between contract word values (`U256`) and native integers,
//! calendar-day bucketing of block timestamps, and score rounding.

use alloy::primitives::U256;
use anyhow::anyhow;
use chrono::{DateTime, NaiveDate};
use serde::Serializer;

// ============================================
// U256 Conversions
// ============================================

/// Narrow a contract word to `u64`, failing instead of truncating.
pub fn u256_to_u64(value: U256) -> anyhow::Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {} does not fit in u64", value))
}

/// Narrow a contract word to `u128`, failing instead of truncating.
pub fn u256_to_u128(value: U256) -> anyhow::Result<u128> {
    u128::try_from(value).map_err(|_| anyhow!("value {} does not fit in u128", value))
}

// ============================================
// Time
// ============================================

pub const SECONDS_PER_DAY: u64 = 24 * 3600;

/// UTC calendar day a block timestamp falls on.
///
/// Returns `None` for timestamps chrono cannot represent.
pub fn utc_day(timestamp: u64) -> Option<NaiveDate> {
    let secs = i64::try_from(timestamp).ok()?;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

/// Whole days elapsed between two unix timestamps, saturating at zero.
pub fn whole_days_between(from: u64, to: u64) -> u64 {
    to.saturating_sub(from) / SECONDS_PER_DAY
}

// ============================================
// Numeric Formatting
// ============================================

/// Round to two decimal places.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Serialize a wide integer as a decimal string so JSON consumers don't lose precision.
pub fn serialize_as_string<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
