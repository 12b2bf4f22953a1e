use super::errors::AckError;
use super::types::{BillboardChannel, VisualType};
use url::Url;

/// Maximum sanitized player name length in characters.
pub const MAX_NAME_LEN: usize = 16;

/// Fallback name when sanitization leaves nothing.
pub const DEFAULT_NAME: &str = "PLAYER";

/// Maximum chat message length in characters after trimming.
pub const MAX_CHAT_LEN: usize = 200;

/// Maximum portal/billboard URL length.
pub const MAX_URL_LEN: usize = 420;

/// Maximum room code length.
pub const MAX_ROOM_CODE_LEN: usize = 24;

/// Sanitize a requested display name: collapse whitespace runs to `_`, strip
/// control characters, and truncate to [`MAX_NAME_LEN`] characters. Empty or
/// absent input yields [`DEFAULT_NAME`].
pub fn sanitize_player_name(raw: Option<&str>) -> String {
    let raw = raw.unwrap_or("").trim();
    let mut out = String::new();
    let mut in_whitespace = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !in_whitespace && !out.is_empty() {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_control() {
            continue;
        }
        out.push(ch);
        if out.chars().count() >= MAX_NAME_LEN {
            break;
        }
    }
    // A trailing separator from whitespace at the cut point reads badly.
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        out
    }
}

/// Validate and normalize a client-supplied room code: uppercase
/// `[A-Z0-9_-]`, 1..=24 characters.
pub fn normalize_room_code(raw: &str) -> Result<String, AckError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Err(AckError::RoomCodeRequired);
    }
    if code.len() > MAX_ROOM_CODE_LEN
        || !code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(AckError::RoomNotFound);
    }
    Ok(code)
}

/// Trim and bound a chat message. Empty results are rejected.
pub fn sanitize_chat_text(raw: &str) -> Result<String, AckError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AckError::EmptyMessage);
    }
    Ok(trimmed.chars().take(MAX_CHAT_LEN).collect())
}

/// Accept only absolute http/https URLs up to [`MAX_URL_LEN`] characters.
pub fn validate_http_url(raw: &str) -> bool {
    if raw.len() > MAX_URL_LEN {
        return false;
    }
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Validate the portal target URL.
pub fn validate_portal_target(raw: &str) -> Result<String, AckError> {
    let trimmed = raw.trim();
    if !validate_http_url(trimmed) {
        return Err(AckError::InvalidPortalTarget);
    }
    Ok(trimmed.to_string())
}

/// Validate a billboard channel assignment: URLs must be http/https and a
/// visual type other than `none` requires a visual URL.
pub fn validate_billboard_media(media: &BillboardChannel) -> Result<(), AckError> {
    if let Some(url) = media.visual_url.as_deref() {
        if !validate_http_url(url) {
            return Err(AckError::InvalidBillboardMedia);
        }
    }
    if let Some(url) = media.audio_url.as_deref() {
        if !validate_http_url(url) {
            return Err(AckError::InvalidBillboardMedia);
        }
    }
    if media.visual_type != VisualType::None && media.visual_url.is_none() {
        return Err(AckError::InvalidBillboardMedia);
    }
    Ok(())
}
