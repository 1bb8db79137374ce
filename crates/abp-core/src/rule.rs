//! Parsed filter rules
//!
//! A rule is immutable once parsed. The only late mutation is the compiled
//! form of a regex rule, which is built on first use and cached in a
//! write-once cell.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::ElementType;

/// Error type for faults recorded against a single rule.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid regex in rule '{rule}': {source}")]
    InvalidRegex {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

// =============================================================================
// Options
// =============================================================================

/// Options parsed from the `$...` suffix of a rule, or the domain list of an
/// element hiding rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOptions {
    /// Option tokens other than `domain=`, kept verbatim (e.g. `third-party`,
    /// `~script`).
    pub binary_options: BTreeSet<String>,
    /// Types the rule is limited to. Empty means unconstrained.
    pub type_mask: ElementType,
    /// Types the rule never applies to.
    pub skip_type_mask: ElementType,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
}

impl ResourceOptions {
    pub fn has_option(&self, option: &str) -> bool {
        self.binary_options.contains(option)
    }

    pub fn has_domains(&self) -> bool {
        !self.include_domains.is_empty() || !self.exclude_domains.is_empty()
    }
}

// =============================================================================
// Rule Kinds
// =============================================================================

/// A literal pattern with optional anchors, `*` wildcards and `^` separators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternRule {
    pub data: String,
    pub left_anchored: bool,
    pub right_anchored: bool,
    pub host_anchored: bool,
    /// Domain prefix of a `||host...` rule.
    pub host: Option<String>,
}

/// A `/regex/` rule. The expression is compiled lazily, at most once.
pub struct RegexRule {
    source: String,
    compiled: OnceLock<Result<Regex, regex::Error>>,
}

impl RegexRule {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: OnceLock::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled expression, building it on first call.
    ///
    /// Concurrent first calls may both compile; only one result is kept and
    /// both are identical.
    pub fn regex(&self) -> Result<&Regex, &regex::Error> {
        self.compiled
            .get_or_init(|| {
                let compiled = Regex::new(&self.source);
                if let Err(e) = &compiled {
                    log::warn!("Regex rule /{}/ never matches: {}", self.source, e);
                }
                compiled
            })
            .as_ref()
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.regex().map(|re| re.is_match(url)).unwrap_or(false)
    }
}

impl Clone for RegexRule {
    fn clone(&self) -> Self {
        let compiled = OnceLock::new();
        if let Some(done) = self.compiled.get() {
            let _ = compiled.set(done.clone());
        }
        Self {
            source: self.source.clone(),
            compiled,
        }
    }
}

impl fmt::Debug for RegexRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexRule")
            .field("source", &self.source)
            .field("compiled", &self.compiled.get().map(|r| r.is_ok()))
            .finish()
    }
}

impl PartialEq for RegexRule {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RegexRule {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Pattern(PatternRule),
    Regex(RegexRule),
    /// CSS selector handed to the page's DOM layer.
    ElementHiding(String),
}

// =============================================================================
// Rule
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    raw: String,
    is_exception: bool,
    options: ResourceOptions,
    kind: RuleKind,
    fingerprint: Option<String>,
}

impl Rule {
    pub fn new(raw: impl Into<String>, is_exception: bool, options: ResourceOptions, kind: RuleKind) -> Self {
        Self {
            raw: raw.into(),
            is_exception,
            options,
            kind,
            fingerprint: None,
        }
    }

    /// The trimmed source line. Stable key for match telemetry.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_exception(&self) -> bool {
        self.is_exception
    }

    pub fn options(&self) -> &ResourceOptions {
        &self.options
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn is_element_hiding(&self) -> bool {
        matches!(self.kind, RuleKind::ElementHiding(_))
    }

    /// Pattern text for pattern rules, expression source for regex rules.
    pub fn data(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::Pattern(p) => Some(&p.data),
            RuleKind::Regex(r) => Some(r.source()),
            RuleKind::ElementHiding(_) => None,
        }
    }

    /// Host of a host-anchored rule.
    pub fn host(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::Pattern(p) => p.host.as_deref(),
            _ => None,
        }
    }

    pub fn selector(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::ElementHiding(selector) => Some(selector),
            _ => None,
        }
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub(crate) fn set_fingerprint(&mut self, fingerprint: Option<String>) {
        self.fingerprint = fingerprint;
    }

    /// Compile a regex rule now, surfacing the failure instead of logging it.
    pub fn validate(&self) -> Result<(), RuleError> {
        match &self.kind {
            RuleKind::Regex(r) => r.regex().map(|_| ()).map_err(|e| RuleError::InvalidRegex {
                rule: self.raw.clone(),
                source: e.clone(),
            }),
            _ => Ok(()),
        }
    }
}
