use serde_json::{Map, Number, Value};

/// Stored in place of any absent or unrecognizable odds value. Keeping the
/// column type uniform (always TEXT, never NULL) is what lets the sink
/// tolerate the producer's inconsistent encodings.
pub const PLACEHOLDER: &str = "-";

// Market labels. The handicap and over/under legs arrive under either an
// English or a localized label depending on which source page the producer
// scraped; the English label wins when both are present (fixed precedence,
// never a merge).
pub const OUTCOME_FIRST: &str = "1";
pub const OUTCOME_DRAW: &str = "X";
pub const OUTCOME_SECOND: &str = "2";
pub const HANDICAP_1: &str = "HANDICAP 1";
pub const HANDICAP_1_ALIAS: &str = "ФОРА 1";
pub const HANDICAP_2: &str = "HANDICAP 2";
pub const HANDICAP_2_ALIAS: &str = "ФОРА 2";
pub const TOTAL: &str = "TOTAL";
pub const OVER: &str = "OVER";
pub const OVER_ALIAS: &str = "Б";
pub const UNDER: &str = "UNDER";
pub const UNDER_ALIAS: &str = "М";

/// Display text for one scalar odds value.
///
/// Numbers are rendered with Rust's default float formatting: locale
/// independent, no exponent, no thousands separators, and integral floats
/// drop the fractional part (4.0 → "4"). Strings pass through untouched.
/// Anything else is the placeholder.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        _ => PLACEHOLDER.to_string(),
    }
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else if let Some(f) = n.as_f64() {
        format!("{f}")
    } else {
        PLACEHOLDER.to_string()
    }
}

/// First non-null value under `primary`, then `alias`. The first hit is
/// authoritative — a null primary falls through to the alias.
fn scalar_entry<'a>(odds: &'a Map<String, Value>, primary: &str, alias: &str) -> Option<&'a Value> {
    odds.get(primary)
        .filter(|v| !v.is_null())
        .or_else(|| odds.get(alias).filter(|v| !v.is_null()))
}

/// Handicap legs only count when the entry is a `{value, param}` object;
/// a scalar under the primary label falls through to the alias.
fn handicap_entry<'a>(
    odds: &'a Map<String, Value>,
    primary: &str,
    alias: &str,
) -> Option<&'a Map<String, Value>> {
    odds.get(primary)
        .and_then(Value::as_object)
        .or_else(|| odds.get(alias).and_then(Value::as_object))
}

fn scalar_display(odds: &Map<String, Value>, primary: &str, alias: &str) -> String {
    scalar_entry(odds, primary, alias)
        .map(display_value)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Renders a handicap leg as `"<value> (<param>)"`. A missing `param` is the
/// producer's implicit zero spread.
fn handicap_display(leg: &Map<String, Value>) -> String {
    let value = leg
        .get("value")
        .map(display_value)
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let param = leg
        .get("param")
        .filter(|v| !v.is_null())
        .map(display_value)
        .unwrap_or_else(|| "0".to_string());
    format!("{value} ({param})")
}

/// The eight display strings shared by match and event rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketOdds {
    pub first: String,
    pub draw: String,
    pub second: String,
    pub first_fora: String,
    pub second_fora: String,
    pub total: String,
    pub over: String,
    pub under: String,
}

impl MarketOdds {
    pub fn from_map(odds: &Map<String, Value>) -> Self {
        Self {
            first: scalar_display(odds, OUTCOME_FIRST, OUTCOME_FIRST),
            draw: scalar_display(odds, OUTCOME_DRAW, OUTCOME_DRAW),
            second: scalar_display(odds, OUTCOME_SECOND, OUTCOME_SECOND),
            first_fora: handicap_entry(odds, HANDICAP_1, HANDICAP_1_ALIAS)
                .map(handicap_display)
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            second_fora: handicap_entry(odds, HANDICAP_2, HANDICAP_2_ALIAS)
                .map(handicap_display)
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            total: scalar_display(odds, TOTAL, TOTAL),
            over: scalar_display(odds, OVER, OVER_ALIAS),
            under: scalar_display(odds, UNDER, UNDER_ALIAS),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
