//! Input validation for CLI arguments

use serde_json::Value;

/// Parse `property=value`.
///
/// The value is read as JSON when it parses (`age=29`, `active=true`) and as
/// a plain string otherwise (`lang=java`).
pub fn parse_property_filter(input: &str) -> Result<(String, Value), String> {
    let (property, raw) = input
        .split_once('=')
        .ok_or_else(|| format!("expected PROPERTY=VALUE, got '{input}'"))?;

    let property = property.trim();
    if property.is_empty() {
        return Err(format!("missing property name in '{input}'"));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((property.to_string(), value))
}
