//! Ownership guard and metadata derivation shared by flush and the lifecycle.

use super::SkipReason;
use stagesync_common::{SessionId, StartSlice};

/// Default number of characters kept when deriving a title from source text.
pub const DEFAULT_TITLE_MAX_CHARS: usize = 20;

const ELLIPSIS: &str = "...";

/// Confirm the live session is the one an operation was scheduled for.
///
/// `expected == None` means the caller captured no token and accepts whatever
/// session is live. Returns the live id to operate on.
pub fn check_ownership(
    live: Option<SessionId>,
    expected: Option<SessionId>,
) -> Result<SessionId, SkipReason> {
    let actual = live.ok_or(SkipReason::NoActiveSession)?;
    match expected {
        Some(expected) if expected != actual => {
            Err(SkipReason::OwnershipMismatch { expected, actual })
        }
        _ => Ok(actual),
    }
}

/// Derive a session title from the entry-stage slice.
///
/// Trimmed source text wins, truncated to `max_chars` characters plus `"..."` when
/// longer. The campaign name is used only when the source text is empty.
/// Returns an empty string when neither is set.
pub fn derive_title(start: &StartSlice, max_chars: usize) -> String {
    let source = start.source_text.trim();
    if !source.is_empty() {
        return truncate_title(source, max_chars);
    }
    start.campaign_name.trim().to_string()
}

/// Truncate on character boundaries, appending `"..."` only if anything was cut.
pub fn truncate_title(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut title: String = text.chars().take(max_chars).collect();
    title.push_str(ELLIPSIS);
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(source_text: &str, campaign_name: &str) -> StartSlice {
        StartSlice {
            source_text: source_text.to_string(),
            campaign_name: campaign_name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ownership_matching_token() {
        let id = SessionId::new();
        assert_eq!(check_ownership(Some(id), Some(id)), Ok(id));
        assert_eq!(check_ownership(Some(id), None), Ok(id));
    }

    #[test]
    fn test_ownership_mismatch_reports_both_ids() {
        let expected = SessionId::new();
        let actual = SessionId::new();
        assert_eq!(
            check_ownership(Some(actual), Some(expected)),
            Err(SkipReason::OwnershipMismatch { expected, actual })
        );
    }

    #[test]
    fn test_ownership_without_live_session() {
        assert_eq!(
            check_ownership(None, Some(SessionId::new())),
            Err(SkipReason::NoActiveSession)
        );
    }

    #[test]
    fn test_title_truncates_long_source_text() {
        let slice = start("a trending dance challenge with neon lighting...", "");
        assert_eq!(
            derive_title(&slice, DEFAULT_TITLE_MAX_CHARS),
            "a trending dance cha..."
        );
    }

    #[test]
    fn test_title_ignores_surrounding_whitespace() {
        let slice = start("   a trending dance challenge with neon lighting   ", "");
        assert_eq!(
            derive_title(&slice, DEFAULT_TITLE_MAX_CHARS),
            "a trending dance cha..."
        );
        assert_eq!(
            derive_title(&start("  neon dance \n", ""), DEFAULT_TITLE_MAX_CHARS),
            "neon dance"
        );
    }

    #[test]
    fn test_title_keeps_short_source_text() {
        let slice = start("neon dance", "Summer Tour");
        assert_eq!(derive_title(&slice, DEFAULT_TITLE_MAX_CHARS), "neon dance");
    }

    #[test]
    fn test_title_exact_length_has_no_ellipsis() {
        let text = "x".repeat(DEFAULT_TITLE_MAX_CHARS);
        assert_eq!(truncate_title(&text, DEFAULT_TITLE_MAX_CHARS), text);
    }

    #[test]
    fn test_title_falls_back_to_campaign_name() {
        let slice = start("", "Summer Tour");
        assert_eq!(derive_title(&slice, DEFAULT_TITLE_MAX_CHARS), "Summer Tour");
    }

    #[test]
    fn test_title_empty_when_nothing_set() {
        assert_eq!(derive_title(&start("  ", ""), DEFAULT_TITLE_MAX_CHARS), "");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_title("ééééé", 3), "ééé...");
    }
}
