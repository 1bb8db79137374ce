use std::fs;
use std::path::Path;
use std::time::Instant;

use abp_compiler::{load, LoadStats};
use abp_core::RuleSet;

#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub lists: usize,
    pub lines: usize,
    pub skipped: usize,
    pub total_ms: f64,
}

/// Read every filter list in `inputs` into one rule set. Per-list stats go
/// to the log so stdout stays free for reports.
pub fn load_lists(inputs: &[String]) -> Result<(RuleSet, LoadSummary), String> {
    if inputs.is_empty() {
        return Err("No filter lists specified".to_string());
    }

    let start = Instant::now();
    let mut rule_set = RuleSet::new();
    let mut summary = LoadSummary::default();

    for (list_id, path) in inputs.iter().enumerate() {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path, e))?;

        let stats = load(&content, &mut rule_set);
        summary.lists += 1;
        summary.lines += stats.lines;
        summary.skipped += stats.skipped;

        log::info!("{}", list_stats_line(list_id, path, &stats));
    }

    summary.total_ms = start.elapsed().as_secs_f64() * 1000.0;
    Ok((rule_set, summary))
}

fn list_stats_line(list_id: usize, path: &str, stats: &LoadStats) -> String {
    format!(
        "[{}] {} - {} lines, {} rules",
        list_id,
        Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
        stats.lines,
        stats.total()
    )
}

/// Read URLs from a file, one per line. Blank lines and `#` comments are
/// skipped.
pub fn read_urls(path: &str) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../abp-compiler/tests/data/easylist_sample.txt");

    #[test]
    fn test_list_stats_line() {
        let mut rule_set = RuleSet::new();
        let stats = load("adv\n! comment\n##.ad", &mut rule_set);
        assert_eq!(list_stats_line(0, "lists/easylist.txt", &stats), "[0] easylist.txt - 3 lines, 2 rules");
    }

    #[test]
    fn test_load_lists_accumulates() {
        let inputs = vec![SAMPLE.to_string(), SAMPLE.to_string()];
        let (rule_set, summary) = load_lists(&inputs).unwrap();
        let (single, _) = load_lists(&inputs[..1]).unwrap();

        assert_eq!(summary.lists, 2);
        assert_eq!(rule_set.filter_count(), 2 * single.filter_count());
        assert!(load_lists(&[]).is_err());
        assert!(load_lists(&["no/such/list.txt".to_string()]).is_err());
    }
}
