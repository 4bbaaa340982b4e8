//! Operator input parsing: task selections and playback ranges
//!
//! Selections use 1-based task numbers: `1,3`, `2-6`, `0` (everything) and
//! `0 5 7-15` (everything except 5 and 7 through 15).

use crate::error::{SyncError, SyncResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s]+").expect("static regex"));
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));

/// Resolve a selection against `total` tasks, returning sorted 1-based numbers
///
/// Numbers outside `1..=total` are ignored; ranges may be written backwards.
/// Unparsable tokens and empty results are input errors.
pub fn parse_selection(input: &str, total: usize) -> SyncResult<Vec<usize>> {
    if total == 0 {
        return Err(SyncError::UserInput("No tasks to select from".to_string()));
    }

    let mut tokens: Vec<&str> = SEPARATORS
        .split(input.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(SyncError::UserInput("Empty selection".to_string()));
    }

    let exclude = tokens[0] == "0";
    let mut selected: BTreeSet<usize> = if exclude {
        tokens.remove(0);
        (1..=total).collect()
    } else {
        BTreeSet::new()
    };

    for token in tokens {
        let (low, high) = parse_token(token)?;
        for n in low.max(1)..=high.min(total) {
            if exclude {
                selected.remove(&n);
            } else {
                selected.insert(n);
            }
        }
    }

    let result: Vec<usize> = selected
        .into_iter()
        .filter(|n| (1..=total).contains(n))
        .collect();
    if result.is_empty() {
        return Err(SyncError::UserInput(format!(
            "Selection '{}' matches no task (valid: 1-{})",
            input.trim(),
            total
        )));
    }
    Ok(result)
}

fn parse_token(token: &str) -> SyncResult<(usize, usize)> {
    let invalid = || SyncError::UserInput(format!("Invalid selection token '{}'", token));
    match token.split_once('-') {
        Some((a, b)) if !a.is_empty() => {
            let a: usize = a.parse().map_err(|_| invalid())?;
            let b: usize = b.parse().map_err(|_| invalid())?;
            Ok((a.min(b), a.max(b)))
        }
        // A leading dash is a stray sign, not a range
        Some((_, b)) => {
            let n: usize = b.parse().map_err(|_| invalid())?;
            Ok((n, n))
        }
        None => {
            let n: usize = token.parse().map_err(|_| invalid())?;
            Ok((n, n))
        }
    }
}

/// Parse a playback range in seconds: `5` → (5, 0), `10-20` → (10, 20)
///
/// Anything without digits means the full range, (0, 0).
pub fn parse_range(input: &str) -> (i64, i64) {
    let numbers: Vec<i64> = NUMBER
        .find_iter(input)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    match numbers.as_slice() {
        [start, end, ..] => (*start, *end),
        [start] => (*start, 0),
        [] => (0, 0),
    }
}
