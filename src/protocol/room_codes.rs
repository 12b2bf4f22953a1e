use rand::RngExt;

/// Alphabet for generated room codes. Visually ambiguous glyphs
/// (0/O, 1/I/L) are excluded so codes survive being read aloud.
const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of random characters after the prefix.
pub const CODE_SUFFIX_LEN: usize = 5;

/// Attempts before giving up on collision-free random codes.
pub const CODE_RETRIES: usize = 24;

/// Generate a single candidate room code: `<prefix>` + 5 clean characters.
pub fn generate_candidate(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_CHARS.len());
            // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
            // always within [0, len).
            #[allow(clippy::indexing_slicing)]
            let ch = CODE_CHARS[idx] as char;
            ch
        })
        .collect();
    format!("{prefix}{suffix}")
}

/// Generate a room code that `taken` does not already contain, retrying up
/// to [`CODE_RETRIES`] times and falling back to a millisecond-timestamp
/// code that cannot collide with the random space.
pub fn generate_unique<F>(prefix: &str, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    for _ in 0..CODE_RETRIES {
        let candidate = generate_candidate(prefix);
        if !taken(&candidate) {
            return candidate;
        }
    }
    let ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
    format!("{prefix}{}", to_base36_upper(ms))
}

fn to_base36_upper(mut v: u64) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if v == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while v > 0 {
        // SAFETY: modulo 36 is always a valid index into the 36-char table.
        #[allow(clippy::indexing_slicing)]
        out.push(DIGITS[(v % 36) as usize]);
        v /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn candidate_has_prefix_and_clean_alphabet() {
        let code = generate_candidate("OX-");
        assert!(code.starts_with("OX-"));
        assert_eq!(code.len(), 3 + CODE_SUFFIX_LEN);
        for ch in code["OX-".len()..].chars() {
            assert!(!"01OIL".contains(ch), "ambiguous glyph {ch} in {code}");
            assert!(ch.is_ascii_uppercase() || ch.is_ascii_digit());
        }
    }

    #[test]
    fn unique_generation_avoids_taken_codes() {
        let mut taken = HashSet::new();
        for _ in 0..200 {
            let code = generate_unique("OX-", |c| taken.contains(c));
            assert!(taken.insert(code));
        }
    }

    #[test]
    fn exhausted_retries_fall_back_to_timestamp_code() {
        // Everything is taken: the fallback must still produce a code.
        let code = generate_unique("OX-", |_| true);
        assert!(code.starts_with("OX-"));
        assert!(code.len() > 3);
    }

    #[test]
    fn base36_round_trip() {
        assert_eq!(to_base36_upper(0), "0");
        assert_eq!(to_base36_upper(35), "Z");
        assert_eq!(to_base36_upper(36), "10");
        let v = u64::from_str_radix(&to_base36_upper(1_722_000_000_123), 36).unwrap();
        assert_eq!(v, 1_722_000_000_123);
    }
}
