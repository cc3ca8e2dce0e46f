//! Author list normalization
//!
//! Author strings use the BibTeX convention of names separated by the
//! literal `" and "`. Normalized names are always `"Last, First"`.

/// Separator between names in an author list
pub const SEPARATOR: &str = " and ";

/// Normalize a single name to `"Last, First"` form
///
/// Names that already carry a comma are only trimmed. A single token
/// (mononym or initials) is kept as is.
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    if name.contains(',') {
        return name.to_string();
    }

    let tokens: Vec<&str> = name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => String::new(),
        [single] => single.to_string(),
        [first, last] => format!("{}, {}", last, first),
        [rest @ .., last] => format!("{}, {}", last, rest.join(" ")),
    }
}

/// Normalize a whole author list
///
/// Idempotent: normalizing twice gives the same result as once.
pub fn normalize(authors: &str) -> String {
    split(authors).join(SEPARATOR)
}

/// Split an author list into normalized names, dropping empty ones
pub fn split(authors: &str) -> Vec<String> {
    authors
        .split(SEPARATOR)
        .map(normalize_name)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Last name of a normalized name: the text before the first comma
pub fn last_name(name: &str) -> &str {
    name.split(',').next().unwrap_or(name).trim()
}

/// Join names as `A, B, and C`; two names become `A, and B`
pub fn oxford_join(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [single] => single.clone(),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}
