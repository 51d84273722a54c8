//! Unit Conversion Utilities
//!
//! Bitcoin amounts are satoshis (`u64`). Minted token amounts carry 18
//! decimals, so one satoshi is `SATOSHI_MULTIPLIER` token units and token
//! amounts are `u128`.

/// Satoshis per Bitcoin
pub const SATS_PER_BTC: u64 = 100_000_000;

/// Token units per satoshi (18 - 8 decimals)
pub const SATOSHI_MULTIPLIER: u128 = 10_000_000_000;

/// Decimals of the minted token
pub const TOKEN_DECIMALS: u32 = 18;

/// Scale a satoshi amount to token units
///
/// Cannot overflow: `u64::MAX * 10^10` fits in a `u128`.
pub fn sats_to_token_units(sats: u64) -> u128 {
    sats as u128 * SATOSHI_MULTIPLIER
}

/// Whole satoshis contained in a token amount, rounded down
pub fn token_units_to_sats(units: u128) -> u128 {
    units / SATOSHI_MULTIPLIER
}

/// Convert satoshis to BTC string (e.g., "0.00100000")
pub fn sats_to_btc_string(sats: u64) -> String {
    format!("{}.{:08}", sats / SATS_PER_BTC, sats % SATS_PER_BTC)
}

/// Convert satoshis to human-readable string
/// e.g., 100000 -> "100,000 sats (0.00100000 BTC)"
pub fn sats_to_display(sats: u64) -> String {
    format!(
        "{} sats ({} BTC)",
        format_with_commas(sats as u128),
        sats_to_btc_string(sats)
    )
}

/// Render a token amount with all 18 decimals
pub fn token_units_to_display(units: u128) -> String {
    let scale = 10u128.pow(TOKEN_DECIMALS);
    format!("{}.{:018}", format_with_commas(units / scale), units % scale)
}

/// Format number with thousands separators
fn format_with_commas(n: u128) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);

    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result
}

/// Parse satoshi amount from string
pub fn parse_sats(s: &str) -> Option<u64> {
    s.trim().replace([',', '_'], "").parse().ok()
}

/// Token amounts can exceed `u64`, so they travel as decimal strings
pub mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
