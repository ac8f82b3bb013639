//! LRC synced-lyrics parser.
//!
//! Accepts one `[mm:ss.xx]` or `[mm:ss.xxx]` timestamp per line. Anything else
//! is skipped, so a malformed payload degrades to fewer lines instead of an
//! error.

use crate::types::SyncedLyricLine;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static LRC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d{2}):(\d{2})\.(\d{2,3})\]\s*(.*)$").expect("LRC line pattern should compile")
});

/// Parse an LRC payload into timed lines, in source order.
///
/// ```
/// use core_lyrics::parser::parse;
/// use core_lyrics::SyncedLyricLine;
///
/// assert_eq!(
///     parse("[00:01.50] hello\n[00:00.20] world"),
///     vec![
///         SyncedLyricLine::new(1500, "hello"),
///         SyncedLyricLine::new(200, "world"),
///     ]
/// );
/// ```
pub fn parse(raw: &str) -> Vec<SyncedLyricLine> {
    raw.split('\n')
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let parsed = parse_line(line);
            if parsed.is_none() {
                warn!(line = %line, "Skipping unparsable lyric line");
            }
            parsed
        })
        .collect()
}

fn parse_line(line: &str) -> Option<SyncedLyricLine> {
    let captures = LRC_LINE.captures(line)?;

    let minutes: u64 = captures[1].parse().ok()?;
    let seconds: u64 = captures[2].parse().ok()?;
    let millis = fraction_millis(&captures[3])?;

    Some(SyncedLyricLine {
        offset_ms: minutes * 60_000 + seconds * 1_000 + millis,
        text: captures[4].trim().to_string(),
    })
}

/// `"50"` is half a second, `"050"` is fifty milliseconds.
fn fraction_millis(digits: &str) -> Option<u64> {
    let mut padded: String = digits.chars().take(3).collect();
    while padded.len() < 3 {
        padded.push('0');
    }
    padded.parse().ok()
}
