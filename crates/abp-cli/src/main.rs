//! ABP Filter CLI
//!
//! CLI tool for checking URLs against filter lists and inspecting compiled
//! rule sets.

mod lists;

use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use serde::Serialize;

use abp_core::{ElementType, MatchCache, MatchContext, MatchStats, RuleSet};
use lists::{load_lists, read_urls};

/// Suspect fingerprints listed in reports.
const TOP_SUSPECTS: usize = 20;

#[derive(Parser)]
#[command(name = "abp-cli")]
#[command(about = "Adblock Plus filter list matcher and tools")]
struct Cli {
    /// Log load summaries and regex failures (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify URLs against filter lists
    Check {
        /// Input filter list files
        #[arg(short, long, required = true)]
        list: Vec<String>,

        /// URLs to classify
        urls: Vec<String>,

        /// File with one URL per line
        #[arg(long)]
        urls_file: Option<String>,

        /// Domain of the page issuing the requests
        #[arg(short, long)]
        domain: Option<String>,

        /// Treat requests as third-party
        #[arg(long, conflicts_with = "first_party")]
        third_party: bool,

        /// Treat requests as first-party
        #[arg(long)]
        first_party: bool,

        /// Resource types, comma separated (e.g. "script,image")
        #[arg(short, long)]
        types: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Include match statistics
        #[arg(long)]
        stats: bool,
    },

    /// Show rule set statistics
    Info {
        /// Input filter list files
        #[arg(short, long, required = true)]
        list: Vec<String>,
    },

    /// List element hiding selectors for a domain
    Selectors {
        /// Input filter list files
        #[arg(short, long, required = true)]
        list: Vec<String>,

        /// Page domain
        domain: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            list,
            urls,
            urls_file,
            domain,
            third_party,
            first_party,
            types,
            json,
            stats,
        } => {
            let options = CheckOptions {
                domain,
                third_party: party_flag(third_party, first_party),
                types,
                json,
                stats,
            };
            cmd_check(&list, urls, urls_file.as_deref(), &options)
        }
        Commands::Info { list } => cmd_info(&list),
        Commands::Selectors { list, domain } => cmd_selectors(&list, &domain),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn party_flag(third_party: bool, first_party: bool) -> Option<bool> {
    match (third_party, first_party) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

// =============================================================================
// check
// =============================================================================

struct CheckOptions {
    domain: Option<String>,
    third_party: Option<bool>,
    types: Option<String>,
    json: bool,
    stats: bool,
}

#[derive(Serialize)]
struct Verdict<'a> {
    url: &'a str,
    blocked: bool,
}

#[derive(Serialize)]
struct StatsReport {
    bloom_negative: usize,
    bloom_positive: usize,
    bloom_false_positive: usize,
    not_matched: usize,
    matched_rules: BTreeMap<String, usize>,
    suspect_fingerprints: Vec<(String, usize)>,
}

impl From<&MatchStats> for StatsReport {
    fn from(stats: &MatchStats) -> Self {
        let mut suspects: Vec<(String, usize)> = stats
            .suspect_fingerprints
            .iter()
            .map(|(window, count)| (window.clone(), *count))
            .collect();
        suspects.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        suspects.truncate(TOP_SUSPECTS);

        Self {
            bloom_negative: stats.bloom_negative,
            bloom_positive: stats.bloom_positive,
            bloom_false_positive: stats.bloom_false_positive,
            not_matched: stats.not_matched,
            matched_rules: stats.matched_rules.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            suspect_fingerprints: suspects,
        }
    }
}

#[derive(Serialize)]
struct CheckReport<'a> {
    results: Vec<Verdict<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<StatsReport>,
}

fn cmd_check(
    lists: &[String],
    mut urls: Vec<String>,
    urls_file: Option<&str>,
    options: &CheckOptions,
) -> Result<(), String> {
    if let Some(path) = urls_file {
        urls.extend(read_urls(path)?);
    }
    if urls.is_empty() {
        return Err("No URLs to check".to_string());
    }

    let (rule_set, _) = load_lists(lists)?;

    let mut ctx = MatchContext::new();
    if let Some(domain) = options.domain.as_deref() {
        ctx = ctx.with_domain(domain);
    }
    if let Some(third_party) = options.third_party {
        ctx = ctx.with_third_party(third_party);
    }
    if let Some(types) = options.types.as_deref() {
        let mask = ElementType::from_names(types);
        if mask.is_empty() {
            return Err(format!("No known resource types in '{}'", types));
        }
        ctx = ctx.with_element_types(mask);
    }

    let mut cache = MatchCache::default();
    let results: Vec<Verdict> = urls
        .iter()
        .map(|url| Verdict {
            url,
            blocked: rule_set.classify(url, &ctx, &mut cache),
        })
        .collect();

    if options.json {
        let report = CheckReport {
            results,
            stats: options.stats.then(|| StatsReport::from(cache.stats())),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize results: {}", e))?;
        println!("{}", json);
        return Ok(());
    }

    for verdict in &results {
        let label = if verdict.blocked { "BLOCK" } else { "ALLOW" };
        println!("{}  {}", label, verdict.url);
    }
    if options.stats {
        print_stats(&StatsReport::from(cache.stats()));
    }

    Ok(())
}

fn print_stats(stats: &StatsReport) {
    println!();
    println!("Match stats:");
    println!("  Bloom negative:       {}", stats.bloom_negative);
    println!("  Bloom positive:       {}", stats.bloom_positive);
    println!("  Bloom false positive: {}", stats.bloom_false_positive);
    println!("  Not matched:          {}", stats.not_matched);
    for (rule, hits) in &stats.matched_rules {
        println!("  {:>6}  {}", hits, rule);
    }
    if !stats.suspect_fingerprints.is_empty() {
        println!("Suspect fingerprints:");
        for (window, count) in &stats.suspect_fingerprints {
            println!("  {:>6}  {:?}", count, window);
        }
    }
}

// =============================================================================
// info / selectors
// =============================================================================

fn cmd_info(lists: &[String]) -> Result<(), String> {
    let (rule_set, summary) = load_lists(lists)?;

    println!("Loaded {} filter lists", summary.lists);
    println!("  Lines:       {} ({} skipped)", summary.lines, summary.skipped);
    println!("  Time:        {:.1}ms", summary.total_ms);
    println!();
    print_partitions(&rule_set);

    let invalid = rule_set.invalid_rules();
    if !invalid.is_empty() {
        println!();
        println!("Invalid rules ({}):", invalid.len());
        for error in &invalid {
            println!("  {}", error);
        }
    }

    Ok(())
}

fn print_partitions(rule_set: &RuleSet) {
    let bloom = rule_set.bloom();
    let exception_bloom = rule_set.exception_bloom();

    println!("Rules:");
    println!("  Total:                    {}", rule_set.filter_count());
    println!("  Fingerprinted:            {}", rule_set.rules().len());
    println!("  No fingerprint:           {}", rule_set.no_fingerprint_rules().len());
    println!("  Exceptions:               {}", rule_set.exception_rules().len());
    println!("  Exceptions, no fingerprint: {}", rule_set.no_fingerprint_exception_rules().len());
    println!("  Element hiding:           {}", rule_set.html_rules().len());
    println!();
    println!("Bloom indexes:");
    println!("  Rules:       {} keys, {} bits, {} hashes", bloom.len(), bloom.bit_count(), bloom.hash_count());
    println!(
        "  Exceptions:  {} keys, {} bits, {} hashes",
        exception_bloom.len(),
        exception_bloom.bit_count(),
        exception_bloom.hash_count()
    );
}

fn cmd_selectors(lists: &[String], domain: &str) -> Result<(), String> {
    let (rule_set, _) = load_lists(lists)?;

    for selector in rule_set.hiding_selectors(domain) {
        println!("{}", selector);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_flag() {
        assert_eq!(party_flag(true, false), Some(true));
        assert_eq!(party_flag(false, true), Some(false));
        assert_eq!(party_flag(false, false), None);
    }

    #[test]
    fn test_stats_report_orders_suspects() {
        let mut stats = MatchStats::default();
        stats.record_suspect(b"ple.com/");
        stats.record_suspect(b"ple.com/");
        stats.record_suspect(b"/adframe");
        stats.record_rule("adv");

        let report = StatsReport::from(&stats);
        assert_eq!(report.suspect_fingerprints[0], ("ple.com/".to_string(), 2));
        assert_eq!(report.matched_rules["adv"], 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["matched_rules"]["adv"], 1);
    }

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from([
            "abp-cli",
            "check",
            "-l",
            "easylist.txt",
            "--third-party",
            "-t",
            "script",
            "http://ads.example.com/a.js",
        ])
        .unwrap();
        match cli.command {
            Commands::Check { list, urls, third_party, types, .. } => {
                assert_eq!(list, vec!["easylist.txt"]);
                assert_eq!(urls, vec!["http://ads.example.com/a.js"]);
                assert!(third_party);
                assert_eq!(types.as_deref(), Some("script"));
            }
            _ => panic!("expected check"),
        }

        assert!(Cli::try_parse_from(["abp-cli", "check", "-l", "a.txt", "--third-party", "--first-party", "x"]).is_err());
    }
}
