//! Per-session negative cache and match telemetry
//!
//! A `MatchCache` is owned by whoever drives a batch of lookups. It is never
//! shared between threads and never persisted.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::types::{ElementType, MatchContext};

/// Maximum number of URLs remembered as "not blocked".
pub const MAX_CACHED: usize = 100;

/// Counters collected while classifying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStats {
    /// Queries rejected by the Bloom index alone.
    pub bloom_negative: usize,
    /// Queries that went past the Bloom index.
    pub bloom_positive: usize,
    /// Bloom positives for which no rule matched.
    pub bloom_false_positive: usize,
    /// Queries answered "not blocked", for whatever reason.
    pub not_matched: usize,
    /// Hit count per raw rule text.
    pub matched_rules: HashMap<String, usize>,
    /// URL windows the Bloom index claimed present during a false positive.
    /// Frequent entries are denylist candidates.
    pub suspect_fingerprints: HashMap<String, usize>,
}

impl MatchStats {
    pub fn record_rule(&mut self, raw: &str) {
        *self.matched_rules.entry(raw.to_string()).or_insert(0) += 1;
    }

    pub fn record_suspect(&mut self, window: &[u8]) {
        let window = String::from_utf8_lossy(window).into_owned();
        *self.suspect_fingerprints.entry(window).or_insert(0) += 1;
    }
}

/// Owned copy of the context a cached miss was computed under.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedContext {
    domain: Option<String>,
    third_party: Option<bool>,
    element_types: Option<ElementType>,
}

impl CachedContext {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        self.domain.as_deref() == ctx.domain
            && self.third_party == ctx.third_party
            && self.element_types == ctx.element_types
    }
}

impl From<&MatchContext<'_>> for CachedContext {
    fn from(ctx: &MatchContext<'_>) -> Self {
        Self {
            domain: ctx.domain.map(str::to_string),
            third_party: ctx.third_party,
            element_types: ctx.element_types,
        }
    }
}

/// Bounded FIFO set of URLs known not to match, plus session statistics.
///
/// Cached misses are only valid for the context they were computed under;
/// querying with a different context starts a fresh miss set.
#[derive(Debug)]
pub struct MatchCache {
    capacity: usize,
    misses: HashSet<String>,
    order: VecDeque<String>,
    context: Option<CachedContext>,
    stats: MatchStats,
}

impl Default for MatchCache {
    fn default() -> Self {
        Self::new(MAX_CACHED)
    }
}

impl MatchCache {
    /// Create a cache remembering at most `capacity` misses.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            misses: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            context: None,
            stats: MatchStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.misses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.misses.is_empty()
    }

    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut MatchStats {
        &mut self.stats
    }

    /// Whether `url` is a known miss under `ctx`.
    pub fn is_known_miss(&self, url: &str, ctx: &MatchContext<'_>) -> bool {
        match &self.context {
            Some(cached) if cached.matches(ctx) => self.misses.contains(url),
            _ => false,
        }
    }

    /// Remember `url` as a miss under `ctx`, evicting the oldest entry when
    /// full.
    pub fn insert_miss(&mut self, url: &str, ctx: &MatchContext<'_>) {
        if self.capacity == 0 {
            return;
        }
        if !self.context.as_ref().is_some_and(|cached| cached.matches(ctx)) {
            self.clear();
            self.context = Some(CachedContext::from(ctx));
        }
        if self.misses.contains(url) {
            return;
        }
        if self.misses.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.misses.remove(&oldest);
            }
        }
        self.order.push_back(url.to_string());
        self.misses.insert(url.to_string());
    }

    /// Forget all cached misses. Statistics are kept.
    pub fn clear(&mut self) {
        self.misses.clear();
        self.order.clear();
        self.context = None;
    }
}
