//! Rule Set and Classifier
//!
//! Rules are filed into partitions as they are added. Pattern rules with a
//! fingerprint feed a Bloom index, so that most URLs can be rejected with a
//! handful of bit probes before any rule is evaluated.
//!
//! Classification stages:
//! 1. Probe the Bloom index with every 8-byte window of the URL's first
//!    100 bytes. On a miss only the no-fingerprint rules can match.
//! 2. On a hit, consult the session's negative cache, then scan the
//!    fingerprinted and no-fingerprint rules.
//! 3. If a blocking rule matched, scan the exception rules (gated by their
//!    own Bloom index) for a veto.

use std::collections::HashSet;

use crate::bloom::{BloomIndex, DEFAULT_BITS_PER_ITEM, DEFAULT_EXPECTED_ITEMS};
use crate::cache::{MatchCache, MatchStats};
use crate::fingerprint::{FingerprintDenylist, Fingerprinter, FINGERPRINT_SIZE};
use crate::matcher::{matches_rule, Request};
use crate::options::resolve;
use crate::rule::{Rule, RuleError, RuleKind};
use crate::types::MatchContext;

/// Maximum number of URL bytes probed against the Bloom index.
pub const MAX_URL_CHARS: usize = 100;

/// Construction parameters for a [`RuleSet`].
#[derive(Debug, Clone)]
pub struct RuleSetConfig {
    pub denylist: FingerprintDenylist,
    /// Number of fingerprints each Bloom index is sized for.
    pub expected_rules: usize,
    pub bits_per_rule: usize,
}

impl Default for RuleSetConfig {
    fn default() -> Self {
        Self {
            denylist: FingerprintDenylist::default(),
            expected_rules: DEFAULT_EXPECTED_ITEMS,
            bits_per_rule: DEFAULT_BITS_PER_ITEM,
        }
    }
}

/// Partition a rule was filed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Rules,
    NoFingerprintRules,
    ExceptionRules,
    NoFingerprintExceptionRules,
    ElementHiding,
}

/// Compiled rules, ready for classification.
#[derive(Debug, Clone)]
pub struct RuleSet {
    fingerprinter: Fingerprinter,
    rules: Vec<Rule>,
    no_fingerprint_rules: Vec<Rule>,
    exception_rules: Vec<Rule>,
    no_fingerprint_exception_rules: Vec<Rule>,
    html_rules: Vec<Rule>,
    bloom: BloomIndex,
    exception_bloom: BloomIndex,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self::with_config(RuleSetConfig::default())
    }

    pub fn with_config(config: RuleSetConfig) -> Self {
        Self {
            fingerprinter: Fingerprinter::new(config.denylist),
            rules: Vec::new(),
            no_fingerprint_rules: Vec::new(),
            exception_rules: Vec::new(),
            no_fingerprint_exception_rules: Vec::new(),
            html_rules: Vec::new(),
            bloom: BloomIndex::with_capacity(config.expected_rules, config.bits_per_rule),
            exception_bloom: BloomIndex::with_capacity(config.expected_rules, config.bits_per_rule),
        }
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// File a parsed rule, deriving its fingerprint and feeding the matching
    /// Bloom index. Rules accumulate across calls.
    pub fn add_rule(&mut self, mut rule: Rule) -> Partition {
        if rule.is_element_hiding() {
            self.html_rules.push(rule);
            return Partition::ElementHiding;
        }

        // Regex sources are not literal text, so they never get a fingerprint.
        let fingerprint = match rule.kind() {
            RuleKind::Pattern(pattern) => self.fingerprinter.fingerprint(&pattern.data).map(str::to_string),
            _ => None,
        };

        let (partition, target) = match (&fingerprint, rule.is_exception()) {
            (Some(fp), true) => {
                self.exception_bloom.add(fp);
                (Partition::ExceptionRules, &mut self.exception_rules)
            }
            (Some(fp), false) => {
                self.bloom.add(fp);
                (Partition::Rules, &mut self.rules)
            }
            (None, true) => (
                Partition::NoFingerprintExceptionRules,
                &mut self.no_fingerprint_exception_rules,
            ),
            (None, false) => (Partition::NoFingerprintRules, &mut self.no_fingerprint_rules),
        };

        rule.set_fingerprint(fingerprint);
        target.push(rule);
        partition
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Total number of rules across all partitions.
    pub fn filter_count(&self) -> usize {
        self.rules.len()
            + self.no_fingerprint_rules.len()
            + self.exception_rules.len()
            + self.no_fingerprint_exception_rules.len()
            + self.html_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filter_count() == 0
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn no_fingerprint_rules(&self) -> &[Rule] {
        &self.no_fingerprint_rules
    }

    pub fn exception_rules(&self) -> &[Rule] {
        &self.exception_rules
    }

    pub fn no_fingerprint_exception_rules(&self) -> &[Rule] {
        &self.no_fingerprint_exception_rules
    }

    pub fn html_rules(&self) -> &[Rule] {
        &self.html_rules
    }

    pub fn bloom(&self) -> &BloomIndex {
        &self.bloom
    }

    pub fn exception_bloom(&self) -> &BloomIndex {
        &self.exception_bloom
    }

    pub fn fingerprinter(&self) -> &Fingerprinter {
        &self.fingerprinter
    }

    /// Every rule, partition by partition.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .chain(&self.no_fingerprint_rules)
            .chain(&self.exception_rules)
            .chain(&self.no_fingerprint_exception_rules)
            .chain(&self.html_rules)
    }

    /// Compile every regex rule and report the ones that fail.
    pub fn invalid_rules(&self) -> Vec<RuleError> {
        self.iter().filter_map(|rule| rule.validate().err()).collect()
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Decide whether `url` should be blocked in `ctx`, using a throwaway
    /// cache.
    pub fn matches(&self, url: &str, ctx: &MatchContext<'_>) -> bool {
        self.classify(url, ctx, &mut MatchCache::new(0))
    }

    /// Decide whether `url` should be blocked in `ctx`.
    pub fn classify(&self, url: &str, ctx: &MatchContext<'_>, cache: &mut MatchCache) -> bool {
        let request = Request::new(url);
        let probe = &url.as_bytes()[..url.len().min(MAX_URL_CHARS)];

        if self.bloom.contains_any_substring(probe, FINGERPRINT_SIZE) {
            cache.stats_mut().bloom_positive += 1;

            if cache.is_known_miss(url, ctx) {
                cache.stats_mut().not_matched += 1;
                return false;
            }

            let stats = cache.stats_mut();
            let blocked = first_match(&self.rules, &request, ctx, stats).is_some()
                || first_match(&self.no_fingerprint_rules, &request, ctx, stats).is_some();
            if !blocked {
                self.record_false_positive(url, probe, cache);
                cache.insert_miss(url, ctx);
                return false;
            }
        } else {
            let stats = cache.stats_mut();
            stats.bloom_negative += 1;
            if first_match(&self.no_fingerprint_rules, &request, ctx, stats).is_none() {
                stats.not_matched += 1;
                return false;
            }
        }

        // A blocking rule matched; look for a veto.
        let stats = cache.stats_mut();
        let exception_possible = self.exception_bloom.contains_any_substring(probe, FINGERPRINT_SIZE);
        let excepted = (exception_possible && first_match(&self.exception_rules, &request, ctx, stats).is_some())
            || first_match(&self.no_fingerprint_exception_rules, &request, ctx, stats).is_some();
        if excepted {
            stats.not_matched += 1;
            return false;
        }
        true
    }

    fn record_false_positive(&self, url: &str, probe: &[u8], cache: &mut MatchCache) {
        log::trace!("Bloom false positive for {}", url);
        let stats = cache.stats_mut();
        stats.not_matched += 1;
        stats.bloom_false_positive += 1;
        for window in self.bloom.matching_substrings(probe, FINGERPRINT_SIZE) {
            stats.record_suspect(window);
        }
    }

    // =========================================================================
    // Element Hiding
    // =========================================================================

    /// Selectors to hide on pages of `domain`.
    ///
    /// Generic rules apply everywhere. A selector is dropped when an
    /// applicable exception rule names the same selector.
    pub fn hiding_selectors(&self, domain: &str) -> Vec<&str> {
        let ctx = MatchContext::new().with_domain(domain);
        let request = Request::new(domain);

        let applicable = self.html_rules.iter().filter(|rule| resolve(rule, &request, &ctx));
        let (exceptions, hides): (Vec<&Rule>, Vec<&Rule>) = applicable.partition(|rule| rule.is_exception());

        let disabled: HashSet<&str> = exceptions.iter().filter_map(|rule| rule.selector()).collect();
        let mut seen = HashSet::new();
        hides
            .iter()
            .filter_map(|rule| rule.selector())
            .filter(|selector| !disabled.contains(selector) && seen.insert(*selector))
            .collect()
    }
}

/// First rule in `rules` that applies and matches, recording the hit.
fn first_match<'r>(
    rules: &'r [Rule],
    request: &Request<'_>,
    ctx: &MatchContext<'_>,
    stats: &mut MatchStats,
) -> Option<&'r Rule> {
    let found = rules.iter().find(|rule| matches_rule(rule, request, ctx))?;
    stats.record_rule(found.raw());
    Some(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{PatternRule, RegexRule, ResourceOptions};

    fn pattern_rule(raw: &str, data: &str, is_exception: bool) -> Rule {
        Rule::new(
            raw,
            is_exception,
            ResourceOptions::default(),
            RuleKind::Pattern(PatternRule {
                data: data.to_string(),
                ..Default::default()
            }),
        )
    }

    fn hiding_rule(raw: &str, selector: &str, is_exception: bool, include: &[&str]) -> Rule {
        let options = ResourceOptions {
            include_domains: include.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        Rule::new(raw, is_exception, options, RuleKind::ElementHiding(selector.to_string()))
    }

    #[test]
    fn test_partitions() {
        let mut set = RuleSet::new();
        assert_eq!(set.add_rule(pattern_rule("/adframe/", "/adframe/", false)), Partition::Rules);
        assert_eq!(set.add_rule(pattern_rule("adv", "adv", false)), Partition::NoFingerprintRules);
        assert_eq!(set.add_rule(pattern_rule("@@/adframe/ok", "/adframe/ok", true)), Partition::ExceptionRules);
        assert_eq!(set.add_rule(pattern_rule("@@ok", "ok", true)), Partition::NoFingerprintExceptionRules);
        assert_eq!(set.add_rule(hiding_rule("##.ad", ".ad", false, &[])), Partition::ElementHiding);
        assert_eq!(
            set.add_rule(Rule::new("/ad[0-9]{8}/", false, ResourceOptions::default(), RuleKind::Regex(RegexRule::new("ad[0-9]{8}")))),
            Partition::NoFingerprintRules
        );
        assert_eq!(set.filter_count(), 6);
        assert_eq!(set.rules()[0].fingerprint(), Some("adframe/"));
    }

    #[test]
    fn test_bloom_holds_every_fingerprint() {
        let mut set = RuleSet::new();
        for (raw, data) in [("/adframe/", "/adframe/"), ("/banner/*/img", "/banner/*/img"), ("-ad-300x250.", "-ad-300x250.")] {
            set.add_rule(pattern_rule(raw, data, false));
        }
        for rule in set.rules() {
            let fp = rule.fingerprint().unwrap();
            assert!(set.bloom().contains(fp));
        }
    }

    #[test]
    fn test_classify_fast_reject_and_match() {
        let mut set = RuleSet::new();
        set.add_rule(pattern_rule("/adframe/", "/adframe/", false));
        let ctx = MatchContext::new();
        let mut cache = MatchCache::default();

        assert!(!set.classify("http://example.com/index.html", &ctx, &mut cache));
        assert_eq!(cache.stats().bloom_negative, 1);

        assert!(set.classify("http://example.com/adframe/1.html", &ctx, &mut cache));
        assert_eq!(cache.stats().bloom_positive, 1);
        assert_eq!(cache.stats().matched_rules["/adframe/"], 1);
    }

    #[test]
    fn test_false_positive_is_cached() {
        let mut set = RuleSet::new();
        // The URL carries the fingerprint "adframe/" but not the leading '/'
        set.add_rule(pattern_rule("/adframe/", "/adframe/", false));
        let ctx = MatchContext::new();
        let mut cache = MatchCache::default();

        let url = "http://example.com/xadframe/1.html";
        assert!(!set.classify(url, &ctx, &mut cache));
        assert_eq!(cache.stats().bloom_false_positive, 1);
        assert!(cache.stats().suspect_fingerprints.contains_key("adframe/"));
        assert!(cache.is_known_miss(url, &ctx));

        assert!(!set.classify(url, &ctx, &mut cache));
        assert_eq!(cache.stats().bloom_false_positive, 1);
        assert_eq!(cache.stats().not_matched, 2);
    }

    #[test]
    fn test_exception_veto() {
        let mut set = RuleSet::new();
        set.add_rule(pattern_rule("@@advice.", "advice.", true));
        set.add_rule(pattern_rule("adv", "adv", false));
        let ctx = MatchContext::new();
        assert!(set.matches("http://example.com/advert.html", &ctx));
        assert!(!set.matches("http://example.com/advice.html", &ctx));
    }

    #[test]
    fn test_hiding_selectors() {
        let mut set = RuleSet::new();
        set.add_rule(hiding_rule("##.generic", ".generic", false, &[]));
        set.add_rule(hiding_rule("example.com##.banner", ".banner", false, &["example.com"]));
        set.add_rule(hiding_rule("foo.example.com#@#.banner", ".banner", true, &["foo.example.com"]));
        set.add_rule(hiding_rule("##.generic", ".generic", false, &[]));

        assert_eq!(set.hiding_selectors("example.com"), vec![".generic", ".banner"]);
        assert_eq!(set.hiding_selectors("foo.example.com"), vec![".generic"]);
        assert_eq!(set.hiding_selectors("other.org"), vec![".generic"]);
    }

    #[test]
    fn test_invalid_rules_reported() {
        let mut set = RuleSet::new();
        set.add_rule(Rule::new("/ad(/", false, ResourceOptions::default(), RuleKind::Regex(RegexRule::new("ad("))));
        set.add_rule(pattern_rule("adv", "adv", false));
        let errors = set.invalid_rules();
        assert_eq!(errors.len(), 1);
        assert!(!set.matches("http://x/ad(", &MatchContext::new()));
    }
}
