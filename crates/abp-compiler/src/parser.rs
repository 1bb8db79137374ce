use abp_core::rule::{PatternRule, RegexRule, ResourceOptions, Rule, RuleKind};
use abp_core::types::ElementType;
use abp_core::url::find_separator;

/// Parse one line of filter text.
///
/// Returns `None` for blank lines, comments and lines that cannot form a
/// rule. Never fails.
pub fn parse_line(line: &str) -> Option<Rule> {
    let line = line.trim();
    if line.is_empty() || is_comment_line(line) {
        return None;
    }

    let (is_exception, body) = match line.strip_prefix("@@") {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    // Only `##` and `#@` introduce a hiding rule; `adv#1` is a pattern.
    if let Some(hash) = body.find('#') {
        if matches!(body.as_bytes().get(hash + 1).copied(), Some(b'#' | b'@')) {
            return parse_html_rule(line, body, hash, is_exception);
        }
    }

    // Options are split off before the regex shape check, so `/ad/$script`
    // is still a regex rule.
    let (pattern, options) = split_rule_options(body);
    let options = options.map(parse_options).unwrap_or_default();

    if let Some(source) = regex_body(pattern) {
        return Some(Rule::new(
            line,
            is_exception,
            options,
            RuleKind::Regex(RegexRule::new(source)),
        ));
    }

    Some(Rule::new(
        line,
        is_exception,
        options,
        RuleKind::Pattern(parse_pattern_rule(pattern)),
    ))
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('[')
}

fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    match line.find('$') {
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    }
}

fn regex_body(pattern: &str) -> Option<&str> {
    if pattern.len() > 1 && pattern.starts_with('/') && pattern.ends_with('/') {
        Some(&pattern[1..pattern.len() - 1])
    } else {
        None
    }
}

// =============================================================================
// Element Hiding
// =============================================================================

/// `domains##selector`, `domains#@#selector` or `@@domains##selector`.
///
/// `#@#` toggles the exception flag, so `@@a.com#@#.x` is a plain hiding
/// rule again.
fn parse_html_rule(line: &str, body: &str, hash: usize, is_exception: bool) -> Option<Rule> {
    let mut options = ResourceOptions::default();
    parse_domains(&body[..hash], ',', &mut options);

    let toggled = body.as_bytes()[hash + 1] == b'@';
    let selector_start = if toggled { hash + 3 } else { hash + 2 };
    let selector = body.get(selector_start..)?;
    if selector.is_empty() {
        return None;
    }

    Some(Rule::new(
        line,
        is_exception ^ toggled,
        options,
        RuleKind::ElementHiding(selector.to_string()),
    ))
}

// =============================================================================
// Options
// =============================================================================

/// Parse the text after `$`.
///
/// `domain=` tokens feed the domain lists. Every other token is kept verbatim
/// in `binary_options`, and type names also set a bit in the type or skip
/// mask.
pub fn parse_options(input: &str) -> ResourceOptions {
    let mut options = ResourceOptions::default();

    for option in input.split(',') {
        let option = option.trim();
        if option.is_empty() {
            continue;
        }

        if let Some(domains) = option.strip_prefix("domain=") {
            parse_domains(domains.trim(), '|', &mut options);
            continue;
        }

        let (negated, name) = match option.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, option),
        };
        if let Some(ty) = ElementType::from_option_name(name) {
            if negated {
                options.skip_type_mask |= ty;
            } else {
                options.type_mask |= ty;
            }
        }

        options.binary_options.insert(option.to_string());
    }

    options
}

/// Append a `separator`-delimited domain list to `options`. Entries starting
/// with `~` are exclusions. Repeated lists accumulate.
pub fn parse_domains(input: &str, separator: char, options: &mut ResourceOptions) {
    for domain in input.split(separator).map(str::trim).filter(|d| !d.is_empty()) {
        match domain.strip_prefix('~') {
            Some(excluded) if !excluded.is_empty() => options.exclude_domains.push(excluded.to_string()),
            Some(_) => {}
            None => options.include_domains.push(domain.to_string()),
        }
    }
}

// =============================================================================
// Patterns
// =============================================================================

fn parse_pattern_rule(text: &str) -> PatternRule {
    let mut rule = PatternRule::default();

    let mut rest = text;
    if let Some(after) = rest.strip_prefix("||") {
        rule.host_anchored = true;
        rest = after;
    } else if let Some(after) = rest.strip_prefix('|') {
        rule.left_anchored = true;
        rest = after;
    }

    if let Some(before) = rest.strip_suffix('|') {
        rule.right_anchored = true;
        rest = before;
    }

    if rule.host_anchored {
        let end = find_separator(rest, 0).unwrap_or(rest.len());
        rule.host = Some(rest[..end].to_string());
    }

    rule.data = if rest.is_empty() { "*".to_string() } else { rest.to_string() };
    rule
}
