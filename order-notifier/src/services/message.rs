//! Plain-text rendering of an order for the shop operator's chat.
//!
//! Values are printed the way the storefront's JavaScript would print them:
//! missing fields read `undefined`, non-numeric quantities turn the line
//! subtotal into `NaN`, and totals use en-US digit grouping.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde_json::Value;

use crate::models::{OrderItem, OrderRequest};

pub const MESSAGE_HEADER: &str = "Yangi buyurtma - INKORE";
pub const CURRENCY: &str = "UZS";

/// Largest magnitude, in milliseconds, a JavaScript `Date` can hold.
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

/// Render the notification text. Pure: the same order and timestamp always
/// produce the same string.
pub fn format_order_message(order: &OrderRequest, placed_at: DateTime<FixedOffset>) -> String {
    let mut lines = Vec::with_capacity(order.items.len() + 5);

    lines.push(MESSAGE_HEADER.to_string());
    lines.push(format!("Vaqt: {}", format_local_datetime(&placed_at)));
    lines.push(String::new());
    lines.extend(order.items.iter().map(format_item_line));
    lines.push(String::new());
    lines.push(format!(
        "Jami: {} {}",
        format_grouped(to_number(order.total.as_ref())),
        CURRENCY
    ));

    lines.join("\n")
}

/// `<title> — <qty> x <price> UZS = <qty*price> UZS`
pub fn format_item_line(item: &OrderItem) -> String {
    let subtotal = to_number(item.qty.as_ref()) * to_number(item.price.as_ref());

    format!(
        "{} — {} x {} {CURRENCY} = {} {CURRENCY}",
        display_value(item.title.as_ref()),
        display_value(item.qty.as_ref()),
        display_value(item.price.as_ref()),
        format_number(subtotal),
    )
}

/// Pick the order time: a usable `created_at`, otherwise `now`, shown in
/// `zone` with the offset that zone had at that instant.
///
/// Falsy values (`0`, `""`, `false`, `null`) and anything that does not parse
/// as a date fall back to `now`.
pub fn resolve_placed_at<Tz: TimeZone>(
    created_at: Option<&Value>,
    now: DateTime<Utc>,
    zone: &Tz,
) -> DateTime<FixedOffset> {
    let local = created_at
        .and_then(|value| parse_timestamp(value, zone))
        .unwrap_or(now)
        .with_timezone(zone);
    let offset = local.offset().fix();

    local.with_timezone(&offset)
}

fn parse_timestamp<Tz: TimeZone>(value: &Value, zone: &Tz) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_f64()?;
            if millis == 0.0 || !millis.is_finite() || millis.abs() > MAX_EPOCH_MILLIS {
                return None;
            }
            DateTime::<Utc>::from_timestamp_millis(millis.trunc() as i64)
        }
        Value::String(s) => parse_date_str(s.trim(), zone),
        _ => None,
    }
}

fn parse_date_str<Tz: TimeZone>(s: &str, zone: &Tz) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Date-time without a zone is wall-clock time where the shop is.
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            return zone
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    // Bare dates are UTC midnight.
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// en-US style: `3/5/2024, 7:07:09 PM`.
pub fn format_local_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// String conversion of a loose JSON value.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(format_number)
            .unwrap_or_else(|| n.to_string()),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_value(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

/// Numeric coercion of a loose JSON value. Never fails; unusable input is
/// `NaN`.
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_numeric_str(s),
        Some(array @ Value::Array(_)) => parse_numeric_str(&display_value(Some(array))),
        Some(Value::Object(_)) => f64::NAN,
    }
}

fn parse_numeric_str(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefixes, radix) in [(["0x", "0X"], 16), (["0o", "0O"], 8), (["0b", "0B"], 2)] {
        if let Some(digits) = prefixes.iter().find_map(|p| trimmed.strip_prefix(p)) {
            return parse_radix_digits(digits, radix);
        }
    }

    // Rust also accepts "inf" and "nan"; those are not numbers here.
    let plain_decimal = trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !plain_decimal {
        return f64::NAN;
    }

    trimmed.parse().unwrap_or(f64::NAN)
}

/// Prefixed literals take bare digits only: no sign, no separators.
fn parse_radix_digits(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }

    digits
        .chars()
        .try_fold(0.0, |acc: f64, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

/// Shortest round-trip rendering: integers without a fraction, exponent
/// notation outside `[1e-6, 1e21)`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let exp = format!("{:e}", n);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                format!("{}e+{}", mantissa, power)
            }
            _ => exp,
        };
    }
    if n.fract() == 0.0 {
        return format!("{:.0}", n);
    }

    n.to_string()
}

/// en-US grouping with at most three fraction digits: `1,234,567.891`.
///
/// Rounding works on the shortest decimal form of `n`, halves away from
/// zero. Negative values keep their sign even when they round to zero.
pub fn format_grouped(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let thousandths = format!("{:0>4}", round_to_thousandths(n.abs()));
    let (int_part, frac_part) = thousandths.split_at(thousandths.len() - 3);
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 5);
    if n.is_sign_negative() {
        grouped.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if !frac_part.is_empty() {
        grouped.push('.');
        grouped.push_str(frac_part);
    }

    grouped
}

/// Decimal digits of `magnitude * 1000`, rounded half up.
fn round_to_thousandths(magnitude: f64) -> String {
    // `{:e}` yields the shortest digits that round-trip, e.g. `1.0005e0`.
    let scientific = format!("{:e}", magnitude);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i64 = exponent.parse().unwrap_or(0);
    let significant: Vec<u8> = mantissa.bytes().filter(u8::is_ascii_digit).collect();

    let kept_len = exponent + 1 + 3;
    if kept_len < 0 {
        return "0".to_string();
    }
    let kept_len = kept_len as usize;

    let mut kept: Vec<u8> = (0..kept_len)
        .map(|i| significant.get(i).copied().unwrap_or(b'0'))
        .collect();
    if significant.get(kept_len).is_some_and(|d| *d >= b'5') {
        let mut carry = true;
        for digit in kept.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, b'1');
        }
    }

    let digits: String = kept.iter().map(|&d| char::from(d)).collect();
    match digits.trim_start_matches('0') {
        "" => "0".to_string(),
        trimmed => trimmed.to_string(),
    }
}
