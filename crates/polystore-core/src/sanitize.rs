// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sanitization Strategy: a one-way mapping from a
//! user-visible name to a backend-safe identifier, for backends with
//! restrictive key formats (Memcached's 250-byte ASCII limit, keychain
//! service/account fields, registry path segments, ...).

use sha2::{Digest, Sha256};

/// A predicate deciding whether a character is allowed verbatim in a
/// sanitized identifier. Plain `fn` pointers are `Copy`/`Debug`/`Send`/
/// `Sync`, so a strategy can be constructed as a `const` without pulling in
/// boxed closures.
pub type CharPredicate = fn(char) -> bool;

/// Default allowed-character predicate: ASCII alphanumerics, `-`, `_`, `.`.
#[must_use]
pub fn default_allowed_chars(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Number of characters the `-XXXXXXXX` hash suffix occupies.
const HASH_SUFFIX_LEN: usize = 9; // '-' + 8 hex chars

/// A pluggable one-way name-sanitization policy.
///
/// Round-tripping is explicitly not supported; two distinct inputs may
/// sanitize to related-looking outputs but never to the same output
/// (modulo a SHA-256 collision), and a sanitized identifier cannot be
/// reversed back to its source name.
#[derive(Debug, Clone, Copy)]
pub enum SanitizationStrategy {
    /// Reject inputs that violate length or charset constraints; never
    /// transform.
    Passthrough,
    /// Pass inputs through unchanged if they fit; otherwise truncate and
    /// append a stable hash suffix.
    HashExcessLength,
    /// Always append a hash suffix, regardless of whether the input would
    /// have fit unmodified.
    AlwaysHash,
    /// Replace disallowed characters with `replacement`, then apply
    /// excess-length hashing to the result.
    Hybrid {
        /// Character substituted for anything `allowed_chars` rejects.
        replacement: char,
    },
}

impl SanitizationStrategy {
    /// Applies this strategy to `name`, producing an identifier that is at
    /// most `max_length` characters and (except under [`Self::Passthrough`]
    /// rejection) composed only of characters `allowed_chars` accepts.
    pub fn apply(
        &self,
        name: &str,
        max_length: usize,
        allowed_chars: CharPredicate,
    ) -> polystore_error::Result<String> {
        match self {
            Self::Passthrough => {
                if fits(name, max_length, allowed_chars) {
                    Ok(name.to_string())
                } else {
                    Err(polystore_error::StoreError::new(
                        polystore_error::ErrorKind::InvalidKey,
                        "name violates sanitization constraints under Passthrough policy",
                    )
                    .with_context("name", name)
                    .with_context("max_length", max_length))
                }
            }
            Self::HashExcessLength => {
                if fits(name, max_length, allowed_chars) {
                    Ok(name.to_string())
                } else {
                    Ok(hash_and_truncate(name, max_length))
                }
            }
            Self::AlwaysHash => Ok(hash_and_truncate(name, max_length)),
            Self::Hybrid { replacement } => {
                let replaced: String = name
                    .chars()
                    .map(|c| if allowed_chars(c) { c } else { *replacement })
                    .collect();
                if replaced.chars().count() <= max_length {
                    Ok(replaced)
                } else {
                    Ok(hash_and_truncate(&replaced, max_length))
                }
            }
        }
    }
}

fn fits(name: &str, max_length: usize, allowed_chars: CharPredicate) -> bool {
    name.chars().count() <= max_length && name.chars().all(allowed_chars)
}

/// Truncates `name` to `max_length - 9` characters (always on a character
/// boundary) and appends `-` plus an 8-hex-char SHA-256 prefix of the
/// *original, untruncated* name, so identical inputs always sanitize to
/// identical outputs.
fn hash_and_truncate(name: &str, max_length: usize) -> String {
    let suffix = hash_suffix(name);
    let keep = max_length.saturating_sub(HASH_SUFFIX_LEN);
    let truncated: String = name.chars().take(keep).collect();
    format!("{truncated}-{suffix}")
}

fn hash_suffix(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    let hex = format!("{digest:x}");
    hex[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_accepts_conforming_name() {
        let s = SanitizationStrategy::Passthrough;
        assert_eq!(
            s.apply("user_1", 64, default_allowed_chars).unwrap(),
            "user_1"
        );
    }

    #[test]
    fn passthrough_rejects_oversize() {
        let s = SanitizationStrategy::Passthrough;
        assert!(s.apply(&"a".repeat(300), 250, default_allowed_chars).is_err());
    }

    #[test]
    fn passthrough_rejects_disallowed_chars() {
        let s = SanitizationStrategy::Passthrough;
        assert!(s.apply("has space", 64, default_allowed_chars).is_err());
    }

    #[test]
    fn hash_excess_length_passes_through_short_names() {
        let s = SanitizationStrategy::HashExcessLength;
        assert_eq!(s.apply("short", 64, default_allowed_chars).unwrap(), "short");
    }

    #[test]
    fn hash_excess_length_truncates_and_suffixes_long_names() {
        let s = SanitizationStrategy::HashExcessLength;
        let long = "x".repeat(300);
        let out = s.apply(&long, 250, default_allowed_chars).unwrap();
        assert_eq!(out.chars().count(), 250);
        assert!(out.contains('-'));
    }

    #[test]
    fn hash_excess_length_is_deterministic() {
        let s = SanitizationStrategy::HashExcessLength;
        let long = "y".repeat(300);
        let a = s.apply(&long, 250, default_allowed_chars).unwrap();
        let b = s.apply(&long, 250, default_allowed_chars).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn always_hash_transforms_even_short_names() {
        let s = SanitizationStrategy::AlwaysHash;
        let out = s.apply("short", 64, default_allowed_chars).unwrap();
        assert_ne!(out, "short");
        assert!(out.contains('-'));
    }

    #[test]
    fn always_hash_is_deterministic_for_identical_input() {
        let s = SanitizationStrategy::AlwaysHash;
        assert_eq!(
            s.apply("same", 64, default_allowed_chars).unwrap(),
            s.apply("same", 64, default_allowed_chars).unwrap()
        );
    }

    #[test]
    fn hybrid_replaces_disallowed_characters() {
        let s = SanitizationStrategy::Hybrid { replacement: '_' };
        let out = s.apply("has space!", 64, default_allowed_chars).unwrap();
        assert_eq!(out, "has_space_");
    }

    #[test]
    fn hybrid_falls_back_to_hash_when_still_oversize() {
        let s = SanitizationStrategy::Hybrid { replacement: '_' };
        let long = "a b".repeat(200);
        let out = s.apply(&long, 250, default_allowed_chars).unwrap();
        assert_eq!(out.chars().count(), 250);
        assert!(out.contains('-'));
    }

    #[test]
    fn truncation_never_splits_a_multibyte_char() {
        let s = SanitizationStrategy::HashExcessLength;
        let long = "\u{1F600}".repeat(100); // 4-byte emoji, 100 chars
        fn allow_all(_: char) -> bool {
            true
        }
        let out = s.apply(&long, 20, allow_all).unwrap();
        assert!(out.is_char_boundary(0));
        assert_eq!(out.chars().count(), 20);
    }
}
