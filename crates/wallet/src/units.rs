//! Wei quantity parsing and display formatting.

use alloy::primitives::U256;
use serde_json::Value;

/// 10^18 wei per QUAI.
const WEI_PER_UNIT: u128 = 1_000_000_000_000_000_000;

/// 10^14 wei per displayed fractional step (4 decimal places).
const WEI_PER_STEP: u128 = 100_000_000_000_000;

const STEPS_PER_UNIT: u64 = 10_000;

/// Parse an RPC quantity: `0x`-prefixed hex, a decimal string or a JSON number.
pub fn parse_quantity(value: &Value) -> Option<U256> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some("") => Some(U256::ZERO),
                Some(hex) => U256::from_str_radix(hex, 16).ok(),
                None => U256::from_str_radix(s, 10).ok(),
            }
        }
        Value::Number(n) => n.as_u64().map(U256::from),
        _ => None,
    }
}

/// Render a wei amount in whole units, rounded half-up to 4 decimals.
pub fn format_units(wei: U256) -> String {
    let unit = U256::from(WEI_PER_UNIT);
    let step = U256::from(WEI_PER_STEP);

    let mut whole = wei / unit;
    let mut frac = (wei % unit + step / U256::from(2u8)) / step;
    if frac >= U256::from(STEPS_PER_UNIT) {
        whole += U256::from(1u8);
        frac -= U256::from(STEPS_PER_UNIT);
    }

    let frac = u64::try_from(frac).unwrap_or_default();
    format!("{whole}.{frac:04}")
}

/// Format an `eth_getBalance` result, or `None` if it is not a quantity.
pub fn format_balance(value: &Value) -> Option<String> {
    parse_quantity(value).map(format_units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quantity_forms() {
        assert_eq!(parse_quantity(&json!("0x10")), Some(U256::from(16u8)));
        assert_eq!(parse_quantity(&json!("0x")), Some(U256::ZERO));
        assert_eq!(parse_quantity(&json!("250")), Some(U256::from(250u16)));
        assert_eq!(parse_quantity(&json!(42)), Some(U256::from(42u8)));
        assert_eq!(parse_quantity(&json!("0xzz")), None);
        assert_eq!(parse_quantity(&Value::Null), None);
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::ZERO), "0.0000");
        // 1 QUAI
        assert_eq!(format_units(U256::from(WEI_PER_UNIT)), "1.0000");
        // 1.5 QUAI
        assert_eq!(
            format_balance(&json!("0x14d1120d7b160000")).as_deref(),
            Some("1.5000")
        );
        // 0.00005 rounds half-up to 0.0001
        assert_eq!(format_units(U256::from(50_000_000_000_000u128)), "0.0001");
    }

    #[test]
    fn test_format_units_carries_into_whole_part() {
        // 1.99999 QUAI rounds to 2.0000
        let wei = U256::from(1_999_990_000_000_000_000u128);
        assert_eq!(format_units(wei), "2.0000");
    }
}
