//! Ingredient name normalization.
//!
//! Produces the deduplication key for shopping-list entries. The rules are
//! a heuristic, not a parser: singular/plural and synonym variants
//! ("tomato" vs "tomatoes") stay distinct keys.
//!
//! | Step | Example |
//! |------|---------|
//! | lower-case | `"Red Onion"` → `"red onion"` |
//! | drop `(...)` | `"butter (softened)"` → `"butter "` |
//! | truncate at first comma | `"onion, diced"` → `"onion"` |
//! | strip punctuation | `"salt & pepper"` → `"salt   pepper"` |
//! | collapse whitespace, trim | `"salt   pepper"` → `"salt pepper"` |

/// Normalize a raw ingredient name into its deduplication key.
///
/// The result contains only lower-case alphanumerics, hyphens, apostrophes
/// and single spaces, so `normalize(&normalize(x)) == normalize(x)`.
/// An unmatched `(` drops the rest of the string.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();

    let mut depth = 0usize;
    let mut unparenthesized = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => unparenthesized.push(ch),
            _ => {}
        }
    }

    let head = unparenthesized
        .split(',')
        .next()
        .unwrap_or_default();

    let cleaned: String = head
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
