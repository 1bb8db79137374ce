//! Fast URL helpers for the hot path
//!
//! These functions avoid allocations and work directly on string slices.
//! Host extraction follows filter-list conventions rather than RFC 3986: the
//! host ends at the first separator character, so ports, paths and queries
//! are all cut off the same way.

/// Characters treated as URL component boundaries by the `^` placeholder.
pub const SEPARATOR_CHARS: &[u8] = b":?/=^";

// =============================================================================
// Separators
// =============================================================================

/// Check if a byte is a separator character.
#[inline]
pub fn is_separator(b: u8) -> bool {
    SEPARATOR_CHARS.contains(&b)
}

/// Find the first separator at or after `start`.
#[inline]
pub fn find_separator(input: &str, start: usize) -> Option<usize> {
    input
        .as_bytes()
        .get(start..)?
        .iter()
        .position(|&b| is_separator(b))
        .map(|i| start + i)
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Position where the host starts: just past the first `:` and any slashes
/// following it, or 0 when the input has no `:`.
#[inline]
pub fn host_start(url: &str) -> usize {
    let bytes = url.as_bytes();
    let mut pos = match bytes.iter().position(|&b| b == b':') {
        Some(colon) => colon + 1,
        None => 0,
    };
    while pos < bytes.len() && bytes[pos] == b'/' {
        pos += 1;
    }
    pos
}

/// Extract the host of a URL without allocating.
#[inline]
pub fn extract_host(url: &str) -> &str {
    let start = host_start(url);
    let end = find_separator(url, start).unwrap_or(url.len());
    &url[start..end]
}

// =============================================================================
// Domain Relations
// =============================================================================

/// Whether `host` equals `domain` or is one of its subdomains.
///
/// `ads.example.com` is a subdomain of `example.com`, `badexample.com` is not.
#[inline]
pub fn is_same_or_subdomain(host: &str, domain: &str) -> bool {
    if !host.ends_with(domain) {
        return false;
    }
    let prefix_len = host.len() - domain.len();
    prefix_len == 0 || host.as_bytes()[prefix_len - 1] == b'.'
}

/// Inverse of [`is_same_or_subdomain`]: `host` lies outside `domain`.
#[inline]
pub fn is_third_party_host(domain: &str, host: &str) -> bool {
    !is_same_or_subdomain(host, domain)
}
