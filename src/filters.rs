use askama::Result;
use rust_decimal::Decimal;

// Quantities print without trailing zeros: `12.50` shows as `12.5`.
// Used as `|qty` in the report templates.
#[allow(clippy::unnecessary_wraps)]
pub fn qty(value: &Decimal) -> Result<String> {
    Ok(value.normalize().to_string())
}
