//! LIKE prefix rewriting
//!
//! `prop LIKE 'abc%'` becomes `prop >= 'abc' AND prop < 'abd'`. Only a
//! non-empty literal prefix followed by a single trailing `%` qualifies.

/// Half-open string range `[lower, upper)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRange {
    pub lower: String,
    pub upper: String,
}

/// Returns the range matching `pattern`, or `None` if it is not a prefix pattern.
pub fn prefix_range(pattern: &str) -> Option<PrefixRange> {
    let prefix = pattern.strip_suffix('%')?;
    if prefix.is_empty() || prefix.contains(|c: char| c == '%' || c == '_') {
        return None;
    }

    let mut chars: Vec<char> = prefix.chars().collect();
    let last = chars.pop()?;
    chars.push(next_char(last)?);

    Some(PrefixRange {
        lower: prefix.to_string(),
        upper: chars.into_iter().collect(),
    })
}

fn next_char(c: char) -> Option<char> {
    match c {
        // Skip the surrogate block
        '\u{D7FF}' => Some('\u{E000}'),
        _ => char::from_u32(c as u32 + 1),
    }
}
