//! Pattern Matching
//!
//! This is the hot path - every candidate rule goes through here.
//! Matching works on byte offsets into the URL and never allocates.

use std::cell::OnceCell;

use crate::options::resolve;
use crate::rule::{PatternRule, Rule, RuleKind};
use crate::types::MatchContext;
use crate::url::{extract_host, is_same_or_subdomain, is_separator};

// =============================================================================
// Request
// =============================================================================

/// A URL under classification, with its host computed at most once.
#[derive(Debug)]
pub struct Request<'a> {
    url: &'a str,
    host: OnceCell<&'a str>,
}

impl<'a> Request<'a> {
    pub fn new(url: &'a str) -> Self {
        Self {
            url,
            host: OnceCell::new(),
        }
    }

    #[inline]
    pub fn url(&self) -> &'a str {
        self.url
    }

    #[inline]
    pub fn host(&self) -> &'a str {
        self.host.get_or_init(|| extract_host(self.url))
    }
}

// =============================================================================
// Rule Matching
// =============================================================================

/// Full check of one rule: options first, then the pattern.
///
/// Element hiding rules match whenever their options apply, which lets the
/// same check answer "does this selector apply on this domain".
pub fn matches_rule(rule: &Rule, request: &Request<'_>, ctx: &MatchContext<'_>) -> bool {
    if !resolve(rule, request, ctx) {
        return false;
    }
    pattern_matches(rule, request)
}

/// Check if a rule's pattern matches the URL, assuming its options resolved.
pub fn pattern_matches(rule: &Rule, request: &Request<'_>) -> bool {
    match rule.kind() {
        RuleKind::ElementHiding(_) => true,
        RuleKind::Regex(regex) => regex.is_match(request.url()),
        RuleKind::Pattern(pattern) => match_pattern(pattern, request),
    }
}

/// Anchored patterns compare `data` literally: a `*` inside a host-anchored
/// pattern is not a wildcard, so `||example.com/*/ad.js` never matches.
fn match_pattern(pattern: &PatternRule, request: &Request<'_>) -> bool {
    let url = request.url();
    let data = pattern.data.as_str();

    if pattern.left_anchored && pattern.right_anchored {
        return data == url;
    }
    if pattern.right_anchored {
        return url.ends_with(data);
    }
    if pattern.left_anchored {
        return url.starts_with(data);
    }
    if pattern.host_anchored {
        let host = pattern.host.as_deref().unwrap_or_default();
        return is_same_or_subdomain(request.host(), host) && find_filter(url, data, 0).is_some();
    }

    match_wildcards(url, data)
}

/// Locate every `*`-separated segment of `data` in order.
fn match_wildcards(url: &str, data: &str) -> bool {
    let mut cursor = 0;
    for segment in data.split('*') {
        if segment.is_empty() {
            continue;
        }
        match find_filter(url, segment, cursor) {
            Some((_, end)) => cursor = end,
            None => return false,
        }
    }
    true
}

// =============================================================================
// Separator-Aware Search
// =============================================================================

/// Like `url[start..].find(filter)` but with `^` treated as a separator
/// placeholder.
///
/// A `^` in front of a literal part requires a separator right before it.
/// A `^` after a literal part requires a separator right after it, unless
/// the part ends the URL. Returns the byte range from the start of the first
/// literal part to the end of the last one.
pub fn find_filter(url: &str, filter: &str, start: usize) -> Option<(usize, usize)> {
    if filter.len() > url.len() || start > url.len() {
        return None;
    }

    let bytes = url.as_bytes();
    let part_count = filter.split('^').count();
    let mut cursor = start;
    let mut first: Option<usize> = None;
    let mut needs_prefix_separator = false;

    for (i, part) in filter.split('^').enumerate() {
        if part.is_empty() {
            needs_prefix_separator = true;
            continue;
        }
        let has_separator_after = i + 1 < part_count;

        let mut from = cursor;
        let found = loop {
            let pos = from + url.get(from..)?.find(part)?;
            let end = pos + part.len();
            let prefix_ok = !needs_prefix_separator || (pos > 0 && is_separator(bytes[pos - 1]));
            let suffix_ok = !has_separator_after || end == bytes.len() || is_separator(bytes[end]);
            if prefix_ok && suffix_ok {
                break pos;
            }
            // Retry past the first char of this occurrence.
            from = pos + url[pos..].chars().next().map_or(1, char::len_utf8);
        };

        first.get_or_insert(found);
        cursor = found + part.len();
        needs_prefix_separator = false;
    }

    match first {
        Some(begin) => Some((begin, cursor)),
        // Only placeholders: any separator, or the end of the URL, will do.
        None => {
            let pos = bytes[start..]
                .iter()
                .position(|&b| is_separator(b))
                .map_or(bytes.len(), |i| start + i);
            Some((pos, pos))
        }
    }
}
