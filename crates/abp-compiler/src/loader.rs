//! Filter list loading
//!
//! Splits filter text into lines, parses each one and files the resulting
//! rules into a [`RuleSet`]. Loading several lists into the same set merges
//! them.

use abp_core::ruleset::{Partition, RuleSet};

use crate::parser::parse_line;

/// What a single `load` call added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub lines: usize,
    /// Blank lines, comments and lines that did not form a rule.
    pub skipped: usize,
    pub rules: usize,
    pub no_fingerprint_rules: usize,
    pub exception_rules: usize,
    pub no_fingerprint_exception_rules: usize,
    pub html_rules: usize,
}

impl LoadStats {
    /// Rules added across all partitions.
    pub fn total(&self) -> usize {
        self.rules
            + self.no_fingerprint_rules
            + self.exception_rules
            + self.no_fingerprint_exception_rules
            + self.html_rules
    }

    fn record(&mut self, partition: Partition) {
        match partition {
            Partition::Rules => self.rules += 1,
            Partition::NoFingerprintRules => self.no_fingerprint_rules += 1,
            Partition::ExceptionRules => self.exception_rules += 1,
            Partition::NoFingerprintExceptionRules => self.no_fingerprint_exception_rules += 1,
            Partition::ElementHiding => self.html_rules += 1,
        }
    }
}

/// Parse `text` and append its rules to `rule_set`.
///
/// Lines are split on `\n`, or on `\r` when the text has no `\n` at all.
pub fn load(text: &str, rule_set: &mut RuleSet) -> LoadStats {
    let delimiter = if text.contains('\n') { '\n' } else { '\r' };
    let mut stats = LoadStats::default();

    for line in text.split(delimiter) {
        stats.lines += 1;
        match parse_line(line) {
            Some(rule) => stats.record(rule_set.add_rule(rule)),
            None => stats.skipped += 1,
        }
    }

    log::debug!(
        "Loaded {} rules from {} lines ({} fingerprinted, {} unfingerprinted, {} exceptions, {} hiding)",
        stats.total(),
        stats.lines,
        stats.rules,
        stats.no_fingerprint_rules,
        stats.exception_rules + stats.no_fingerprint_exception_rules,
        stats.html_rules
    );

    stats
}

/// Build a fresh rule set from one filter list.
pub fn compile(text: &str) -> RuleSet {
    let mut rule_set = RuleSet::new();
    load(text, &mut rule_set);
    rule_set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_counts_lines() {
        let mut set = RuleSet::new();
        let stats = load("! comment\n\nadv\n@@advice.\n##.ad\n/banner/*/img", &mut set);
        assert_eq!(stats.lines, 6);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.no_fingerprint_rules, 1);
        assert_eq!(stats.no_fingerprint_exception_rules, 1);
        assert_eq!(stats.html_rules, 1);
        assert_eq!(stats.rules, 1);
        assert_eq!(set.filter_count(), stats.total());
    }

    #[test]
    fn test_carriage_return_delimiter() {
        let set = compile("adv\r@@advice.\r##.ad");
        assert_eq!(set.filter_count(), 3);
    }

    #[test]
    fn test_crlf_lines_are_trimmed() {
        let set = compile("adv\r\n@@advice.\r\n");
        assert_eq!(set.filter_count(), 2);
        assert_eq!(set.no_fingerprint_rules()[0].raw(), "adv");
    }

    #[test]
    fn test_accumulates_across_loads() {
        let mut set = RuleSet::new();
        load("adv\n           @@test\n           ###test", &mut set);
        load(
            "adv2\n           @@test2\n           ###test2\n           adv3\n           @@test3\n           ###test3",
            &mut set,
        );
        assert_eq!(set.html_rules().len(), 3);
        assert_eq!(set.rules().len(), 0);
        assert_eq!(set.no_fingerprint_rules().len(), 3);
        assert_eq!(set.exception_rules().len() + set.no_fingerprint_exception_rules().len(), 3);
    }
}
