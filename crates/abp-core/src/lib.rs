//! ABP Filter Core Library
//!
//! This crate provides the matching engine for Adblock Plus style filter
//! lists: rule types, option resolution, pattern matching and the
//! Bloom-gated classifier.
//!
//! # Architecture
//!
//! Parsed rules are filed into a [`RuleSet`]. Each pattern rule contributes
//! an 8-byte literal fingerprint to a Bloom index, so that most URLs are
//! rejected after a few bit probes. Only URLs that pass the index are checked
//! against individual rules.
//!
//! # Modules
//!
//! - `types`: Element type masks and the request context
//! - `hash`: Murmur3 hashing for the Bloom index
//! - `url`: Separator classes and host extraction
//! - `fingerprint`: Literal window selection with a denylist
//! - `bloom`: Fixed-size Bloom index
//! - `rule`: Parsed rule representation
//! - `options`: Option resolution (types, domains, party)
//! - `matcher`: Pattern matching against a URL
//! - `cache`: Per-session negative cache and statistics
//! - `ruleset`: Rule partitions and the classifier

pub mod bloom;
pub mod cache;
pub mod fingerprint;
pub mod hash;
pub mod matcher;
pub mod options;
pub mod rule;
pub mod ruleset;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use bloom::BloomIndex;
pub use cache::{MatchCache, MatchStats};
pub use fingerprint::{FingerprintDenylist, Fingerprinter};
pub use matcher::{matches_rule, Request};
pub use rule::{PatternRule, RegexRule, ResourceOptions, Rule, RuleError, RuleKind};
pub use ruleset::{Partition, RuleSet, RuleSetConfig};
pub use types::{ElementType, MatchContext};

/// Decide whether `url` should be blocked in `ctx`.
pub fn classify(rule_set: &RuleSet, url: &str, ctx: &MatchContext<'_>, cache: &mut MatchCache) -> bool {
    rule_set.classify(url, ctx, cache)
}
