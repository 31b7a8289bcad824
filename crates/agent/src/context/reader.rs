//! Bounded, line-granular file reading.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Longest UTF-8 encoding of one character.
const MAX_CHAR_BYTES: usize = 4;

/// Read at most `max_chars` characters from the start of `path`.
///
/// Whole lines are taken while they fit; the line that would cross the
/// limit is cut at a character boundary. Missing or unreadable files yield
/// an empty string. Invalid UTF-8 is replaced, never rejected. No more than
/// `4 * max_chars` bytes are ever buffered.
pub fn read_bounded(path: &Path, max_chars: usize) -> String {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "Content unavailable");
            return String::new();
        }
    };

    let mut reader = BufReader::new(file);
    let mut out = String::new();
    let mut used = 0usize;
    let mut line = Vec::new();

    while used < max_chars {
        line.clear();
        let budget = (max_chars - used).saturating_mul(MAX_CHAR_BYTES);
        let limit = u64::try_from(budget).unwrap_or(u64::MAX);
        match reader.by_ref().take(limit).read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::trace!(path = %path.display(), error = %e, "Read stopped early");
                break;
            }
        }

        let text = String::from_utf8_lossy(&line);
        let chars = text.chars().count();
        if used + chars <= max_chars {
            out.push_str(&text);
            used += chars;
        } else {
            out.push_str(truncate_chars(&text, max_chars - used));
            break;
        }
    }

    out
}

/// The longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
