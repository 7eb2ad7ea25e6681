use chrono::DateTime;

use crate::storypark::{MediaItem, Story};

/// Name of the per-story metadata file.
pub const INFO_FILE_NAME: &str = "info.json";

/// Directory name for a story: `{created_at}.{id}.{slug}`, or `{created_at}.{id}`
/// when the title has nothing sluggable in it.
///
/// The id segment keeps names unique when two stories share a timestamp and
/// title, and nothing here depends on run state, so a story resolves to the
/// same directory on every run.
pub fn story_dir_name(story: &Story) -> String {
    let created = normalize_created_at(story.created_at());
    let id = clean_filename(story.id().as_str());
    let slug = slugify(story.title());
    if slug.is_empty() {
        format!("{created}.{id}")
    } else {
        format!("{created}.{id}.{slug}")
    }
}

/// Reduce an API timestamp to second precision with filesystem-safe separators,
/// e.g. `2021-01-22T21:28:00.123Z` becomes `2021-01-22T21-28-00Z`.
///
/// The wall-clock digits are kept as sent; no timezone conversion is applied.
/// Strings that are not RFC 3339 are cut at the fractional seconds instead.
pub fn normalize_created_at(created_at: &str) -> String {
    let wall_clock = match DateTime::parse_from_rfc3339(created_at) {
        Ok(dt) => dt.naive_local().format("%Y-%m-%dT%H-%M-%S").to_string(),
        Err(_) => {
            let whole_seconds = created_at.split('.').next().unwrap_or(created_at);
            clean_filename(&whole_seconds.trim_end_matches('Z').replace(':', "-"))
        }
    };
    format!("{wall_clock}Z")
}

/// Lowercase ASCII, hyphen-separated form of a title, e.g. "Tom's Day Out"
/// becomes `tom-s-day-out` and "Kia ora, whānau" becomes `kia-ora-whanau`.
///
/// Letters are transliterated to ASCII and every run of other characters,
/// quotes included, collapses to one hyphen. A comma between digits is
/// dropped so "1,000" stays one number.
pub fn slugify(title: &str) -> String {
    let chars: Vec<char> = title.chars().collect();
    let joined: String = chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| {
            let digit_comma = c == ','
                && i > 0
                && chars[i - 1].is_ascii_digit()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            !digit_comma
        })
        .map(|(_, &c)| c)
        .collect();
    slug::slugify(joined)
}

/// Remove characters that are invalid in file names on common filesystems:
/// `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`, and control characters.
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect()
}

/// MIME type to file extension, for the media types Storypark serves.
const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/pjpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/heic", ".heic"),
    ("image/heif", ".heif"),
    ("image/bmp", ".bmp"),
    ("image/tiff", ".tiff"),
    ("image/svg+xml", ".svg"),
    ("video/mp4", ".mp4"),
    ("video/quicktime", ".mov"),
    ("video/mpeg", ".mpeg"),
    ("video/webm", ".webm"),
    ("video/x-msvideo", ".avi"),
    ("video/x-m4v", ".m4v"),
    ("video/3gpp", ".3gp"),
    ("audio/mpeg", ".mp3"),
    ("audio/mp4", ".m4a"),
    ("audio/x-m4a", ".m4a"),
    ("audio/aac", ".aac"),
    ("audio/wav", ".wav"),
    ("audio/x-wav", ".wav"),
    ("audio/ogg", ".ogg"),
    ("application/pdf", ".pdf"),
    ("application/msword", ".doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    ("text/plain", ".txt"),
];

/// Guess a file extension (with leading dot) from a MIME type.
///
/// Parameters such as `; charset=utf-8` are ignored and matching is
/// case-insensitive. Unknown types yield `None`.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Local file name for a media item: its `file_name` plus an extension guessed
/// from its content type.
pub fn media_file_name(item: &MediaItem) -> String {
    let stem = clean_filename(&item.file_name);
    match extension_for_content_type(&item.content_type) {
        Some(ext) => format!("{stem}{ext}"),
        None => stem,
    }
}
