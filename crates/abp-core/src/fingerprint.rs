//! Rule fingerprints
//!
//! A fingerprint is a fixed-width literal window taken from a rule pattern.
//! Any URL the rule matches contains the fingerprint verbatim, which makes it
//! a safe key for the Bloom index. Windows that collide with too many URLs
//! (scheme prefixes, generic path segments) are filtered out through an
//! injected denylist.

/// Exact width of every fingerprint, in bytes.
pub const FINGERPRINT_SIZE: usize = 8;

/// Built-in fingerprints that match a large share of ordinary URLs.
pub const DEFAULT_BAD_FINGERPRINTS: &[&str] = &[
    "/images/",
    "/static/",
    "/assets/",
    "/content",
    "/plugins",
    "/scripts",
    "/common/",
    "/public/",
    "/wp-cont",
    "wp-conte",
    "/themes/",
    "/upload/",
    "/uploads",
    "/styles/",
    "/search?",
    "/player/",
];

/// Built-in substrings that disqualify any window containing them.
pub const DEFAULT_BAD_SUBSTRINGS: &[&str] = &["http", "www"];

/// Denylist consulted when picking a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintDenylist {
    pub bad_fingerprints: Vec<String>,
    pub bad_substrings: Vec<String>,
}

impl Default for FingerprintDenylist {
    fn default() -> Self {
        Self {
            bad_fingerprints: DEFAULT_BAD_FINGERPRINTS.iter().map(|s| s.to_string()).collect(),
            bad_substrings: DEFAULT_BAD_SUBSTRINGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FingerprintDenylist {
    /// A denylist that accepts every window.
    pub fn empty() -> Self {
        Self {
            bad_fingerprints: Vec::new(),
            bad_substrings: Vec::new(),
        }
    }

    pub fn rejects(&self, candidate: &str) -> bool {
        self.bad_fingerprints.iter().any(|bad| bad == candidate)
            || self.bad_substrings.iter().any(|bad| candidate.contains(bad.as_str()))
    }
}

/// Byte class allowed inside a fingerprint window: `[./&_\-=a-zA-Z0-9]`.
#[inline]
fn is_fingerprint_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'/' | b'&' | b'_' | b'-' | b'=')
}

/// Where in the pattern a window search prefers to land.
#[derive(Debug, Clone, Copy)]
enum Preference {
    End,
    Start,
}

/// Find a fully valid window, scanning from the preferred side.
fn find_window(pattern: &str, preference: Preference) -> Option<&str> {
    let bytes = pattern.as_bytes();
    if bytes.len() < FINGERPRINT_SIZE {
        return None;
    }
    let last = bytes.len() - FINGERPRINT_SIZE;
    let valid = |i: &usize| bytes[*i..*i + FINGERPRINT_SIZE].iter().all(|&b| is_fingerprint_byte(b));
    let start = match preference {
        Preference::End => (0..=last).rev().find(valid),
        Preference::Start => (0..=last).find(valid),
    }?;
    // Every byte in the window is ASCII, so the slice sits on char boundaries.
    Some(&pattern[start..start + FINGERPRINT_SIZE])
}

/// Derives fingerprints from rule patterns.
#[derive(Debug, Clone, Default)]
pub struct Fingerprinter {
    denylist: FingerprintDenylist,
}

impl Fingerprinter {
    pub fn new(denylist: FingerprintDenylist) -> Self {
        Self { denylist }
    }

    pub fn denylist(&self) -> &FingerprintDenylist {
        &self.denylist
    }

    /// Pick a fingerprint for `pattern`, or `None` when no acceptable window
    /// exists.
    ///
    /// The window closest to the end is tried first, then the one closest to
    /// the start. When both are rejected the pattern loses one char from each
    /// end and the search repeats.
    pub fn fingerprint<'p>(&self, pattern: &'p str) -> Option<&'p str> {
        let mut window = pattern;
        loop {
            for preference in [Preference::End, Preference::Start] {
                if let Some(candidate) = find_window(window, preference) {
                    if !self.denylist.rejects(candidate) {
                        return Some(candidate);
                    }
                }
            }

            if window.len() <= FINGERPRINT_SIZE {
                return None;
            }
            let mut chars = window.chars();
            chars.next();
            chars.next_back();
            window = chars.as_str();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_prefers_window_near_end() {
        let fp = Fingerprinter::new(FingerprintDenylist::empty());
        assert_eq!(fp.fingerprint("/banner/*/img"), Some("/banner/"));
        assert_eq!(fp.fingerprint("ads.example.com^"), Some("mple.com"));
        assert_eq!(fp.fingerprint("abcdefghij"), Some("cdefghij"));
    }

    #[test]
    fn test_short_patterns_have_no_fingerprint() {
        let fp = Fingerprinter::default();
        assert_eq!(fp.fingerprint("adv"), None);
        assert_eq!(fp.fingerprint("*"), None);
        assert_eq!(fp.fingerprint("^ad^*^x^"), None);
    }

    #[test]
    fn test_falls_back_to_start_window() {
        let denylist = FingerprintDenylist {
            bad_fingerprints: vec!["cdefghij".to_string()],
            bad_substrings: Vec::new(),
        };
        let fp = Fingerprinter::new(denylist);
        assert_eq!(fp.fingerprint("abcdefghij"), Some("abcdefgh"));
    }

    #[test]
    fn test_shrinks_when_both_ends_rejected() {
        let denylist = FingerprintDenylist {
            bad_fingerprints: vec!["abcdefgh".to_string(), "cdefghij".to_string()],
            bad_substrings: Vec::new(),
        };
        let fp = Fingerprinter::new(denylist);
        assert_eq!(fp.fingerprint("abcdefghij"), Some("bcdefghi"));
    }

    #[test]
    fn test_bad_substrings_reject_scheme_windows() {
        let fp = Fingerprinter::default();
        // Every window of the scheme prefix contains "http" or "www" or a ':'
        assert_eq!(fp.fingerprint("|http://www"), None);
        assert_eq!(fp.fingerprint("http://example.com/"), Some("ple.com/"));
    }

    #[test]
    fn test_non_ascii_pattern() {
        let fp = Fingerprinter::new(FingerprintDenylist::empty());
        assert_eq!(fp.fingerprint("é/adframe/é"), Some("adframe/"));
        assert_eq!(fp.fingerprint("ééééé"), None);
    }

    proptest! {
        #[test]
        fn prop_fingerprint_is_literal_window(pattern in "[a-z0-9./^*|$-]{0,40}") {
            let fp = Fingerprinter::default();
            if let Some(found) = fp.fingerprint(&pattern) {
                prop_assert_eq!(found.len(), FINGERPRINT_SIZE);
                prop_assert!(pattern.contains(found));
                prop_assert!(found.bytes().all(is_fingerprint_byte));
                prop_assert!(!fp.denylist().rejects(found));
            }
        }
    }
}
