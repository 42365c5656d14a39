//! Card file name parsing.
//!
//! Accepted shape is `<level>_<name>.<ext>`, e.g. `3_charlie.gif`.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{ImageExtension, NameRejection, ParsedName};

pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 5;
/// Width of the `cards.name` column.
pub const MAX_NAME_LENGTH: usize = 200;

fn filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)_([^/\\]+)\.(jpg|jpeg|png|gif)$")
            .expect("Invalid regex pattern defined in code")
    })
}

/// Turn underscores into spaces, collapse whitespace runs and trim.
pub fn normalize_name(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a raw file name. Matching is case-insensitive and the resulting
/// name is lowercased.
pub fn parse_card_filename(file_name: &str) -> Result<ParsedName, NameRejection> {
    let lowered = file_name.trim().to_lowercase();
    let caps = filename_regex()
        .captures(&lowered)
        .ok_or(NameRejection::Pattern)?;

    let level_str = &caps[1];
    let level = level_str
        .parse::<i32>()
        .ok()
        .filter(|l| (MIN_LEVEL..=MAX_LEVEL).contains(l))
        .ok_or_else(|| NameRejection::LevelOutOfRange(level_str.to_string()))?;

    let display_name = normalize_name(&caps[2]);
    if display_name.is_empty() {
        return Err(NameRejection::EmptyName);
    }
    if display_name.chars().count() > MAX_NAME_LENGTH {
        return Err(NameRejection::TooLong(MAX_NAME_LENGTH));
    }

    let extension = ImageExtension::parse(&caps[3]).ok_or(NameRejection::Pattern)?;
    let canonical_key = format!(
        "{}_{}.{}",
        level,
        display_name.replace(' ', "_"),
        extension
    );

    Ok(ParsedName {
        original: file_name.to_string(),
        level,
        display_name,
        extension,
        is_animated: extension.is_animated(),
        canonical_key,
    })
}
