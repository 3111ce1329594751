//! Quantity parsing, formatting, and arithmetic.
//!
//! Quantities are free text ("2 cups", "1/2 tsp", "to taste"). When a
//! quantity starts with a number it is treated as a magnitude plus an
//! optional unit token; otherwise it is symbolic and only survives
//! arithmetic through the documented fallbacks below.
//!
//! | Function | Parsed inputs | Unparseable input |
//! |----------|---------------|-------------------|
//! | [`combine`] | sum, first-seen unit | existing quantity unchanged |
//! | [`scale_by_count`] | value × count | `"{count}x"` |
//! | [`recalculate_quantity`] | sum of sources | source counts as 1 |
//!
//! Unit conversion is out of scope: `"1 cup"` plus `"2 tbsp"` is `"3 cup"`.

use crate::models::Contribution;
use crate::normalize::normalize;

/// A quantity split into its leading number, unit token, and remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuantity {
    pub value: f64,
    /// Alphabetic run directly after the number; empty when absent.
    pub unit: String,
    /// Whatever follows the unit, trimmed.
    pub rest: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum NumberForm {
    Integer,
    Decimal,
    Fraction,
}

/// Scan an integer, decimal (`1.5`, `.5`), or simple fraction (`3/4`)
/// at the very start of `s`. Returns the value and the bytes consumed.
fn scan_number(s: &str) -> Option<(f64, usize, NumberForm)> {
    let bytes = s.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let int_len = digits_from(0);

    if int_len > 0 && bytes.get(int_len) == Some(&b'/') {
        let den_len = digits_from(int_len + 1);
        if den_len > 0 {
            let end = int_len + 1 + den_len;
            let numerator: f64 = s[..int_len].parse().ok()?;
            let denominator: f64 = s[int_len + 1..end].parse().ok()?;
            if denominator == 0.0 {
                return None;
            }
            return Some((numerator / denominator, end, NumberForm::Fraction));
        }
    }

    if bytes.get(int_len) == Some(&b'.') {
        let frac_len = digits_from(int_len + 1);
        if frac_len > 0 {
            let end = int_len + 1 + frac_len;
            let value: f64 = s[..end].parse().ok()?;
            return Some((value, end, NumberForm::Decimal));
        }
    }

    if int_len == 0 {
        return None;
    }
    let value: f64 = s[..int_len].parse().ok()?;
    Some((value, int_len, NumberForm::Integer))
}

/// Parse a leading number and unit out of a quantity or ingredient line.
///
/// Accepts an integer, decimal, simple fraction, or a mixed number
/// (`"1 1/2 cups"`), optionally followed by an alphabetic unit token.
/// Returns `None` when the text does not start with a number.
///
/// ```rust
/// use mealcart_core::quantity::parse_leading_number;
///
/// let p = parse_leading_number("1 cup milk").unwrap();
/// assert_eq!(p.value, 1.0);
/// assert_eq!(p.unit, "cup");
/// assert_eq!(p.rest, "milk");
/// assert!(parse_leading_number("to taste").is_none());
/// ```
pub fn parse_leading_number(text: &str) -> Option<ParsedQuantity> {
    let s = text.trim_start();
    let (mut value, mut consumed, form) = scan_number(s)?;

    if form == NumberForm::Integer {
        let after = &s[consumed..];
        let trimmed = after.trim_start();
        if trimmed.len() < after.len() {
            if let Some((frac, used, NumberForm::Fraction)) = scan_number(trimmed) {
                value += frac;
                consumed = s.len() - trimmed.len() + used;
            }
        }
    }

    let after = s[consumed..].trim_start();
    let unit_len = after
        .char_indices()
        .find(|(_, c)| !c.is_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(after.len());

    Some(ParsedQuantity {
        value,
        unit: after[..unit_len].to_string(),
        rest: after[unit_len..].trim().to_string(),
    })
}

/// Render a magnitude: integers without a decimal point, everything else
/// to one decimal place with a trailing `.0` suppressed.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

/// Render a magnitude with an optional unit suffix.
pub fn format_quantity(value: f64, unit: &str) -> String {
    if unit.is_empty() {
        format_number(value)
    } else {
        format!("{} {}", format_number(value), unit)
    }
}

/// Add `additional` onto `existing`, keeping the existing unit.
///
/// Lossy by contract: if either side has no leading number, `existing`
/// is returned unchanged.
pub fn combine(existing: &str, additional: &str) -> String {
    match (
        parse_leading_number(existing),
        parse_leading_number(additional),
    ) {
        (Some(base), Some(extra)) => format_quantity(base.value + extra.value, &base.unit),
        _ => existing.to_string(),
    }
}

/// Multiply a quantity by how many times its recipe occurs in the plan.
pub fn scale_by_count(original: &str, count: u32) -> String {
    match parse_leading_number(original) {
        Some(p) => format_quantity(p.value * f64::from(count), &p.unit),
        None => format!("{}x", count),
    }
}

/// Recompute an entry's quantity from its remaining contributions.
///
/// Each unparseable contribution counts as 1. The unit comes from the
/// first contribution that carries one. Returns `"1"` for an empty list.
pub fn recalculate_quantity(sources: &[Contribution]) -> String {
    if sources.is_empty() {
        return "1".to_string();
    }

    let mut total = 0.0;
    let mut unit: Option<String> = None;
    for source in sources {
        match parse_leading_number(source.quantity()) {
            Some(p) => {
                total += p.value;
                if unit.is_none() && !p.unit.is_empty() {
                    unit = Some(p.unit);
                }
            }
            None => total += 1.0,
        }
    }

    format_quantity(total, unit.as_deref().unwrap_or(""))
}

/// Left fold of [`combine`] over the contribution quantities, in order.
///
/// This is the quantity an entry shows after a sequence of adds, computed
/// from the contribution set rather than patched incrementally.
pub fn combine_all(sources: &[Contribution]) -> String {
    let mut quantities = sources.iter().map(Contribution::quantity);
    match quantities.next() {
        Some(first) => quantities.fold(first.to_string(), |acc, q| combine(&acc, q)),
        None => "1".to_string(),
    }
}

/// Split a recipe ingredient line into `(item, quantity)`.
///
/// | Line | Item | Quantity |
/// |------|------|----------|
/// | `"1 cup milk"` | `milk` | `1 cup` |
/// | `"2 eggs"` | `eggs` | `2 eggs` |
/// | `"1/2 (15 oz) can beans"` | `(15 oz) can beans` | `0.5` |
/// | `"1 onion, diced"` | `onion, diced` | `1 onion` |
/// | `"salt to taste"` | `salt to taste` | `default_quantity` |
pub fn split_ingredient(line: &str, default_quantity: &str) -> (String, String) {
    let line = line.trim();
    match parse_leading_number(line) {
        None => (line.to_string(), default_quantity.to_string()),
        Some(p) => match (p.unit.is_empty(), p.rest.is_empty()) {
            (true, true) => (line.to_string(), default_quantity.to_string()),
            (true, false) => (p.rest, format_number(p.value)),
            (false, true) => {
                let quantity = format_quantity(p.value, &p.unit);
                (p.unit, quantity)
            }
            (false, false) if normalize(&p.rest).is_empty() => {
                // "1 onion, diced": the note carries no name of its own.
                let quantity = format_quantity(p.value, &p.unit);
                let item = if p.rest.starts_with(&[',', ';'][..]) {
                    format!("{}{}", p.unit, p.rest)
                } else {
                    format!("{} {}", p.unit, p.rest)
                };
                (item, quantity)
            }
            (false, false) => (p.rest, format_quantity(p.value, &p.unit)),
        },
    }
}
