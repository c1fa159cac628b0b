//! Ether amounts for payable calls

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;
const ETHER_DECIMALS: usize = 18;

/// Parse a decimal ether amount ("1", "0.25", ".5") into wei
pub fn parse_ether(value: &str) -> Result<u128, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty amount".to_string());
    }

    let (integer_part, decimal_part) = match value.split_once('.') {
        Some((integer, decimal)) => (integer, decimal),
        None => (value, ""),
    };
    if integer_part.is_empty() && decimal_part.is_empty() {
        return Err(format!("Invalid amount: {}", value));
    }
    if !integer_part.bytes().all(|b| b.is_ascii_digit())
        || !decimal_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(format!("Invalid amount: {}", value));
    }

    let integer: u128 = if integer_part.is_empty() {
        0
    } else {
        integer_part
            .parse()
            .map_err(|_| format!("Invalid integer: {}", integer_part))?
    };

    let decimal_wei = if decimal_part.is_empty() {
        0u128
    } else {
        if decimal_part.len() > ETHER_DECIMALS {
            return Err("Too many decimal places for ether".to_string());
        }
        let padded = format!("{:0<width$}", decimal_part, width = ETHER_DECIMALS);
        padded
            .parse()
            .map_err(|_| format!("Invalid decimal: {}", decimal_part))?
    };

    integer
        .checked_mul(WEI_PER_ETHER)
        .and_then(|v| v.checked_add(decimal_wei))
        .ok_or_else(|| "Overflow".to_string())
}
