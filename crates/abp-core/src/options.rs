//! Option resolution
//!
//! Decides whether a rule applies in a request context, independently of
//! whether its pattern matches the URL. Each gate only runs when the context
//! carries the field it needs.

use crate::matcher::Request;
use crate::rule::{ResourceOptions, Rule};
use crate::types::{ElementType, MatchContext};
use crate::url::is_same_or_subdomain;

pub const THIRD_PARTY_OPTION: &str = "third-party";
pub const FIRST_PARTY_OPTION: &str = "~third-party";

/// Check if a rule's options allow it to apply to this request.
pub fn resolve(rule: &Rule, request: &Request<'_>, ctx: &MatchContext<'_>) -> bool {
    let options = rule.options();

    if let Some(types) = ctx.element_types {
        if !check_element_types(options, types) {
            return false;
        }
    }

    if let Some(domain) = ctx.domain {
        if options.has_domains() && !check_domains(options, domain) {
            return false;
        }
    }

    if let Some(third_party) = ctx.third_party {
        if !check_party(rule, request, third_party) {
            return false;
        }
    }

    true
}

/// Type gate. The skip mask is subtractive whether or not an include mask
/// is present.
pub fn check_element_types(options: &ResourceOptions, types: ElementType) -> bool {
    if !options.type_mask.is_empty() && !options.type_mask.intersects(types) {
        return false;
    }
    !options.skip_type_mask.intersects(types)
}

/// Domain gate (`$domain=` or the domain list of a hiding rule).
///
/// When an included and an excluded entry both cover `domain`, the more
/// specific one wins: `example.com|~foo.example.com` applies on
/// `example.com` but not on `www.foo.example.com`, and
/// `~example.com|foo.example.com` applies only under `foo.example.com`.
pub fn check_domains(options: &ResourceOptions, domain: &str) -> bool {
    let blocked_by: Vec<&str> = options
        .include_domains
        .iter()
        .map(String::as_str)
        .filter(|d| is_same_or_subdomain(domain, d))
        .collect();
    let skipped_by: Vec<&str> = options
        .exclude_domains
        .iter()
        .map(String::as_str)
        .filter(|d| is_same_or_subdomain(domain, d))
        .collect();

    if blocked_by.is_empty() && !options.include_domains.is_empty() {
        return false;
    }

    // An inclusion survives unless an exclusion nested under it covers us.
    let residual_block = blocked_by
        .iter()
        .filter(|b| !skipped_by.iter().any(|s| is_same_or_subdomain(s, b)))
        .count();
    if !blocked_by.is_empty() && residual_block == 0 {
        return false;
    }

    // An exclusion survives unless an inclusion nested under it covers us.
    let residual_skip = skipped_by
        .iter()
        .filter(|s| !blocked_by.iter().any(|b| is_same_or_subdomain(b, s)))
        .count();
    residual_skip == 0
}

/// Party gate for `third-party` / `~third-party` rules.
///
/// A `third-party` rule applies only in a third-party context, and only when
/// the request host belongs to the rule's anchored host (rules without a host
/// anchor skip the host comparison).
pub fn check_party(rule: &Rule, request: &Request<'_>, third_party: bool) -> bool {
    let options = rule.options();

    if options.has_option(THIRD_PARTY_OPTION) {
        if !third_party {
            return false;
        }
        if let Some(host) = rule.host() {
            if !is_same_or_subdomain(request.host(), host) {
                return false;
            }
        }
    }

    if options.has_option(FIRST_PARTY_OPTION) && third_party {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{PatternRule, RuleKind};

    fn options_with_domains(include: &[&str], exclude: &[&str]) -> ResourceOptions {
        ResourceOptions {
            include_domains: include.iter().map(|s| s.to_string()).collect(),
            exclude_domains: exclude.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn host_rule(host: &str, binary: &[&str]) -> Rule {
        let options = ResourceOptions {
            binary_options: binary.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        Rule::new(
            format!("||{host}^"),
            false,
            options,
            RuleKind::Pattern(PatternRule {
                data: format!("{host}^"),
                host_anchored: true,
                host: Some(host.to_string()),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_include_list() {
        let options = options_with_domains(&["example.com", "example.net"], &[]);
        assert!(check_domains(&options, "example.net"));
        assert!(check_domains(&options, "my.subdomain.example.com"));
        assert!(!check_domains(&options, "badexample.com"));
        assert!(!check_domains(&options, "otherdomain.net"));
    }

    #[test]
    fn test_specific_exclusion_wins() {
        let options = options_with_domains(&["example.com"], &["foo.example.com"]);
        assert!(check_domains(&options, "example.com"));
        assert!(check_domains(&options, "bar.example.com"));
        assert!(!check_domains(&options, "foo.example.com"));
        assert!(!check_domains(&options, "www.foo.example.com"));
    }

    #[test]
    fn test_specific_inclusion_wins() {
        let options = options_with_domains(&["foo.example.com"], &["example.com"]);
        assert!(!check_domains(&options, "example.com"));
        assert!(check_domains(&options, "foo.example.com"));
        assert!(check_domains(&options, "www.foo.example.com"));
    }

    #[test]
    fn test_exclusion_only() {
        let options = options_with_domains(&[], &["msnbc.msn.com", "www.nbcnews.com"]);
        assert!(check_domains(&options, "example.com"));
        assert!(!check_domains(&options, "msnbc.msn.com"));
        assert!(!check_domains(&options, "video.msnbc.msn.com"));
    }

    #[test]
    fn test_same_entry_included_and_excluded() {
        let options = options_with_domains(&["a.com"], &["a.com"]);
        assert!(!check_domains(&options, "a.com"));
    }

    #[test]
    fn test_element_types() {
        let options = ResourceOptions {
            type_mask: ElementType::SCRIPT | ElementType::IMAGE,
            ..Default::default()
        };
        assert!(check_element_types(&options, ElementType::SCRIPT));
        assert!(!check_element_types(&options, ElementType::STYLESHEET));

        // Skip mask alone: everything but the skipped types
        let options = ResourceOptions {
            skip_type_mask: ElementType::SCRIPT,
            ..Default::default()
        };
        assert!(!check_element_types(&options, ElementType::SCRIPT));
        assert!(check_element_types(&options, ElementType::IMAGE));

        assert!(check_element_types(&ResourceOptions::default(), ElementType::OTHER));
    }

    #[test]
    fn test_third_party_gate() {
        let rule = host_rule("example.com", &["third-party"]);
        let ctx = MatchContext::new().with_third_party(true);

        assert!(resolve(&rule, &Request::new("http://ad.example.com"), &ctx));
        assert!(!resolve(&rule, &Request::new("http://example2.com"), &ctx));
        assert!(!resolve(&rule, &Request::new("http://example.com.au"), &ctx));

        let first_party = MatchContext::new().with_third_party(false);
        assert!(!resolve(&rule, &Request::new("http://example.com"), &first_party));

        // No party information: the gate is off
        assert!(resolve(&rule, &Request::new("http://example2.com"), &MatchContext::new()));
    }

    #[test]
    fn test_first_party_gate() {
        let rule = host_rule("example.com", &["~third-party"]);
        let url = Request::new("http://example.com/x");
        assert!(resolve(&rule, &url, &MatchContext::new().with_third_party(false)));
        assert!(!resolve(&rule, &url, &MatchContext::new().with_third_party(true)));
    }

    #[test]
    fn test_missing_context_fields_disable_gates() {
        let base = host_rule("example.com", &[]);
        let options = ResourceOptions {
            type_mask: ElementType::SCRIPT,
            include_domains: vec!["site.com".to_string()],
            ..Default::default()
        };
        let rule = Rule::new(base.raw(), false, options, base.kind().clone());

        let request = Request::new("http://example.com/");
        assert!(resolve(&rule, &request, &MatchContext::new()));
        assert!(!resolve(&rule, &request, &MatchContext::new().with_domain("other.com")));
        assert!(!resolve(&rule, &request, &MatchContext::new().with_element_types(ElementType::IMAGE)));
    }
}
