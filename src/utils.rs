//! Utility functions for filename derivation

/// UTF-8 byte budget for a sanitized filename stem, leaving headroom for
/// suffixes within typical 255-byte filesystem limits
pub const MAX_FILENAME_BYTES: usize = 240;

/// Marker appended when a title is truncated to fit the byte budget
const ELLIPSIS: &str = "…";

/// Characters that are unsafe in filenames across common filesystems
fn is_unsafe(c: char) -> bool {
    matches!(
        c,
        '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>'
    ) || c.is_control()
}

/// Sanitize a media title into a filesystem-safe filename stem.
///
/// Unsafe characters become hyphens. If the UTF-8 byte length exceeds
/// [`MAX_FILENAME_BYTES`], the string is truncated at a character boundary
/// (never splitting a multi-byte sequence) and an ellipsis marker is
/// appended, keeping the result within the budget.
///
/// # Examples
///
/// ```
/// use media_courier::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("What? A/B: test"), "What- A-B- test");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    let mut out: String = title
        .chars()
        .map(|c| if is_unsafe(c) { '-' } else { c })
        .collect();

    if out.len() > MAX_FILENAME_BYTES {
        let budget = MAX_FILENAME_BYTES - ELLIPSIS.len();
        let mut cut = budget;
        while cut > 0 && !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out.push_str(ELLIPSIS);
    }

    out
}

/// Derive a unique artifact filename from a title.
///
/// The millisecond timestamp suffix keeps concurrent jobs for identically
/// titled items from colliding in the shared temp directory.
pub fn unique_artifact_name(title: &str, extension: &str) -> String {
    let stem = sanitize_filename(title);
    let millis = chrono::Utc::now().timestamp_millis();
    format!("{stem}-{millis}.{extension}")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_characters_become_hyphens() {
        assert_eq!(sanitize_filename("a/b?c:d"), "a-b-c-d");
        assert_eq!(sanitize_filename("x|y*z\"w"), "x-y-z-w");
        assert_eq!(sanitize_filename("tab\there"), "tab-here");
    }

    #[test]
    fn short_titles_pass_through() {
        assert_eq!(sanitize_filename("Plain Title 123"), "Plain Title 123");
    }

    #[test]
    fn long_ascii_title_is_truncated_within_budget() {
        let title = "x".repeat(500);
        let out = sanitize_filename(&title);
        assert!(out.len() <= MAX_FILENAME_BYTES, "got {} bytes", out.len());
        assert!(out.ends_with(ELLIPSIS));
    }

    #[test]
    fn multibyte_title_truncates_on_char_boundary() {
        // Each 'ß' is 2 bytes; 500 bytes total forces truncation in the
        // middle of the sequence, which must snap to a boundary
        let title = "ß".repeat(250);
        assert_eq!(title.len(), 500);

        let out = sanitize_filename(&title);
        assert!(out.len() <= MAX_FILENAME_BYTES);
        assert!(out.ends_with(ELLIPSIS));
        // Valid UTF-8 is implied by String, but re-encode to be explicit
        assert!(String::from_utf8(out.clone().into_bytes()).is_ok());
    }

    #[test]
    fn four_byte_chars_survive_truncation() {
        let title = "😀".repeat(100); // 400 bytes
        let out = sanitize_filename(&title);
        assert!(out.len() <= MAX_FILENAME_BYTES);
        assert!(out.chars().rev().skip(1).all(|c| c == '😀'));
    }

    #[test]
    fn exactly_at_budget_is_untouched() {
        let title = "y".repeat(MAX_FILENAME_BYTES);
        let out = sanitize_filename(&title);
        assert_eq!(out.len(), MAX_FILENAME_BYTES);
        assert!(!out.contains(ELLIPSIS));
    }

    #[test]
    fn unique_names_differ_for_same_title() {
        let a = unique_artifact_name("Video", "mp4");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = unique_artifact_name("Video", "mp4");
        assert_ne!(a, b);
        assert!(a.ends_with(".mp4"));
    }
}
