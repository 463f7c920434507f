//! Conversions between the node's numeric wire encoding and native integers.
//!
//! Quantities are `0x`-prefixed, big-endian hex strings. Plain decimal strings are accepted too
//! since some nodes (and the store) use them.
use std::fmt;

use alloy_primitives::U256;
use error_stack::{Report, Result};

/// Number of decimals between the smallest unit (wei) and the principal unit (ether).
pub const PRINCIPAL_DECIMALS: usize = 18;

const SMALLEST_PER_PRINCIPAL: u64 = 1_000_000_000_000_000_000;

#[derive(Debug)]
pub struct QuantityError;

impl error_stack::Context for QuantityError {}

impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("malformed quantity")
    }
}

enum Digits<'a> {
    Hex(&'a str),
    Decimal(&'a str),
}

fn split_digits(value: &str) -> Result<Digits<'_>, QuantityError> {
    let value = value.trim();

    let digits = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            Digits::Hex(hex)
        }
        Some(_) => return Err(malformed(value)),
        None if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
            Digits::Decimal(value)
        }
        None => return Err(malformed(value)),
    };

    Ok(digits)
}

fn malformed(value: &str) -> Report<QuantityError> {
    Report::new(QuantityError).attach_printable(format!("value: {value:?}"))
}

/// Parses a quantity into a signed 64 bit integer.
pub fn parse_i64(value: &str) -> Result<i64, QuantityError> {
    let parsed = match split_digits(value)? {
        Digits::Hex(hex) => i64::from_str_radix(hex, 16),
        Digits::Decimal(dec) => dec.parse::<i64>(),
    };

    parsed.map_err(|err| {
        malformed(value)
            .attach_printable(err.to_string())
            .attach_printable("value does not fit in a signed 64 bit integer")
    })
}

/// Parses a quantity into an unsigned 256 bit integer.
///
/// Used for values that can exceed 2^63, like transferred value and balances.
pub fn parse_u256(value: &str) -> Result<U256, QuantityError> {
    let parsed = match split_digits(value)? {
        Digits::Hex(hex) => U256::from_str_radix(hex, 16),
        Digits::Decimal(dec) => U256::from_str_radix(dec, 10),
    };

    parsed.map_err(|err| malformed(value).attach_printable(err.to_string()))
}

/// Encodes an integer as a `0x`-prefixed quantity.
pub fn to_quantity(value: i64) -> String {
    format!("{value:#x}")
}

/// Formats an amount of the smallest unit as an exact decimal amount of the principal unit.
///
/// `1500000000000000000` becomes `1.5`. Trailing zeros are dropped and whole amounts carry no
/// decimal point.
pub fn format_principal(amount: U256) -> String {
    let unit = U256::from(SMALLEST_PER_PRINCIPAL);
    let whole = amount / unit;
    let fraction = amount % unit;

    if fraction.is_zero() {
        return whole.to_string();
    }

    let fraction = format!("{:0>width$}", fraction.to_string(), width = PRINCIPAL_DECIMALS);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}
