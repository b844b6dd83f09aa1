//! Small string utilities shared across crates.

/// Collapse interior newlines (`\n`, `\r\n`, `\r`) to single spaces.
///
/// Runs of consecutive line breaks collapse to one space; leading and
/// trailing breaks are dropped. Used when flattening turn content into the
/// single-line transcript form.
#[must_use]
pub fn collapse_newlines(s: &str) -> String {
    if !s.contains(['\n', '\r']) {
        return s.to_owned();
    }
    s.split(['\n', '\r'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate a string to at most `max` characters, appending `…` when cut.
///
/// Used to keep log lines bounded when echoing payload previews.
#[must_use]
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}
