//! Creation rules for customer frames.
//!
//! Checked by the frame creation hook inside the same transaction that
//! inserts the frame.

use crate::error::CoreError;

/// Maximum length of a frame display name.
pub const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Maximum length of a profession type.
pub const MAX_PROFESSION_TYPE_LEN: usize = 20;

/// A customer may own at most `no_of_post` frames.
pub fn validate_frame_quota(existing_frames: i64, no_of_post: i32) -> Result<(), CoreError> {
    if existing_frames >= i64::from(no_of_post) {
        return Err(CoreError::Validation(format!(
            "The customer has already reached the maximum number of frames ({no_of_post})"
        )));
    }
    Ok(())
}

/// Trim a display name and reject empty or over-long values.
///
/// `None` stays `None`; a blank string becomes `None`.
pub fn normalize_display_name(name: Option<&str>) -> Result<Option<String>, CoreError> {
    let Some(trimmed) = name.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Display name must not exceed {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Lower-case and trim a profession type; blank becomes `None`.
pub fn normalize_profession_type(value: Option<&str>) -> Result<Option<String>, CoreError> {
    let Some(trimmed) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if trimmed.len() > MAX_PROFESSION_TYPE_LEN {
        return Err(CoreError::Validation(format!(
            "Profession type must not exceed {MAX_PROFESSION_TYPE_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_allows_below_limit() {
        assert!(validate_frame_quota(0, 1).is_ok());
        assert!(validate_frame_quota(2, 3).is_ok());
    }

    #[test]
    fn quota_rejects_at_limit() {
        assert!(validate_frame_quota(3, 3).is_err());
        assert!(validate_frame_quota(0, 0).is_err());
    }

    #[test]
    fn display_name_is_trimmed() {
        assert_eq!(
            normalize_display_name(Some("  Clinic  ")).unwrap(),
            Some("Clinic".to_string())
        );
        assert_eq!(normalize_display_name(Some("   ")).unwrap(), None);
        assert_eq!(normalize_display_name(None).unwrap(), None);
    }

    #[test]
    fn display_name_length_is_bounded() {
        let long = "x".repeat(MAX_DISPLAY_NAME_LEN + 1);
        assert!(normalize_display_name(Some(&long)).is_err());
    }

    #[test]
    fn profession_is_lowercased() {
        assert_eq!(
            normalize_profession_type(Some(" Doctor ")).unwrap(),
            Some("doctor".to_string())
        );
        assert!(normalize_profession_type(Some(&"a".repeat(21))).is_err());
    }
}
