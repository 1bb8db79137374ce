//! WebAssembly bindings for the ABP filter engine

use wasm_bindgen::prelude::*;

use abp_compiler::load;
use abp_core::{
    url::{extract_host, is_third_party_host},
    ElementType, MatchCache, MatchContext, RuleSet,
};

/// A rule set plus the negative cache for the page session using it.
#[wasm_bindgen]
pub struct FilterEngine {
    rule_set: RuleSet,
    cache: MatchCache,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl FilterEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            rule_set: RuleSet::new(),
            cache: MatchCache::default(),
        }
    }

    /// Add one filter list. Lists accumulate across calls.
    pub fn load(&mut self, text: &str) -> JsValue {
        let stats = load(text, &mut self.rule_set);
        // Cached misses may no longer hold once rules are added
        self.cache.clear();

        web_sys::console::log_1(&JsValue::from_str(&format!(
            "abp: loaded {} rules from {} lines",
            stats.total(),
            stats.lines
        )));

        let result = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&result, &"lines".into(), &JsValue::from(stats.lines as u32));
        let _ = js_sys::Reflect::set(&result, &"skipped".into(), &JsValue::from(stats.skipped as u32));
        let _ = js_sys::Reflect::set(&result, &"rules".into(), &JsValue::from(stats.total() as u32));
        let _ = js_sys::Reflect::set(&result, &"htmlRules".into(), &JsValue::from(stats.html_rules as u32));
        result.into()
    }

    /// Classify with an explicit context. Omitted arguments disable the
    /// matching gate.
    pub fn matches(
        &mut self,
        url: &str,
        domain: Option<String>,
        third_party: Option<bool>,
        types: Option<String>,
    ) -> bool {
        let mut ctx = MatchContext::new();
        if let Some(domain) = domain.as_deref() {
            ctx = ctx.with_domain(domain);
        }
        if let Some(third_party) = third_party {
            ctx = ctx.with_third_party(third_party);
        }
        if let Some(types) = types.as_deref() {
            ctx = ctx.with_element_types(ElementType::from_names(types));
        }
        self.rule_set.classify(url, &ctx, &mut self.cache)
    }

    /// Classify a browser request, deriving the context from the request
    /// type and the initiating page.
    pub fn should_block(&mut self, url: &str, request_type: &str, initiator: Option<String>) -> bool {
        let site_host = site_host(url, request_type, initiator.as_deref());
        let ctx = request_context(url, request_type, site_host);
        self.rule_set.classify(url, &ctx, &mut self.cache)
    }

    /// Element hiding selectors for pages on `domain`.
    pub fn hiding_selectors(&self, domain: &str) -> js_sys::Array {
        self.rule_set
            .hiding_selectors(domain)
            .into_iter()
            .map(JsValue::from_str)
            .collect()
    }

    /// Selectors for `domain` joined into one hiding stylesheet.
    pub fn hiding_css(&self, domain: &str) -> String {
        let selectors = self.rule_set.hiding_selectors(domain);
        if selectors.is_empty() {
            return String::new();
        }
        format!("{} {{ display: none !important; }}", selectors.join(",\n"))
    }

    pub fn filter_count(&self) -> u32 {
        self.rule_set.filter_count() as u32
    }

    pub fn stats(&self) -> JsValue {
        let stats = self.cache.stats();
        let result = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&result, &"filterCount".into(), &JsValue::from(self.rule_set.filter_count() as u32));
        let _ = js_sys::Reflect::set(&result, &"bloomNegative".into(), &JsValue::from(stats.bloom_negative as u32));
        let _ = js_sys::Reflect::set(&result, &"bloomPositive".into(), &JsValue::from(stats.bloom_positive as u32));
        let _ = js_sys::Reflect::set(&result, &"bloomFalsePositive".into(), &JsValue::from(stats.bloom_false_positive as u32));
        let _ = js_sys::Reflect::set(&result, &"notMatched".into(), &JsValue::from(stats.not_matched as u32));

        let matched = js_sys::Object::new();
        for (rule, hits) in &stats.matched_rules {
            let _ = js_sys::Reflect::set(&matched, &JsValue::from_str(rule), &JsValue::from(*hits as u32));
        }
        let _ = js_sys::Reflect::set(&result, &"matchedRules".into(), &matched);
        result.into()
    }

    /// Drop cached misses and start a new statistics session.
    pub fn reset_session(&mut self) {
        self.cache = MatchCache::default();
    }
}

#[wasm_bindgen]
pub fn extract_host_js(url: &str) -> String {
    extract_host(url).to_string()
}

#[wasm_bindgen]
pub fn is_third_party_js(site_host: &str, req_host: &str) -> bool {
    is_third_party_host(site_host, req_host)
}

/// Host of the page a request belongs to. Top-level documents are their own
/// site.
fn site_host<'a>(url: &'a str, request_type: &str, initiator: Option<&'a str>) -> &'a str {
    let req_host = extract_host(url);
    if matches!(request_type, "main_frame" | "document") {
        return req_host;
    }
    initiator
        .map(extract_host)
        .filter(|host| !host.is_empty())
        .unwrap_or(req_host)
}

fn request_context<'a>(url: &str, request_type: &str, site_host: &'a str) -> MatchContext<'a> {
    let req_host = extract_host(url);
    MatchContext::new()
        .with_domain(site_host)
        .with_third_party(is_third_party_host(site_host, req_host))
        .with_element_types(parse_request_type(request_type))
}

fn parse_request_type(request_type: &str) -> ElementType {
    match request_type {
        "main_frame" | "document" => ElementType::DOCUMENT,
        "sub_frame" | "subdocument" => ElementType::SUBDOCUMENT,
        "stylesheet" | "css" => ElementType::STYLESHEET,
        "script" | "js" => ElementType::SCRIPT,
        "image" | "img" => ElementType::IMAGE,
        "object" => ElementType::OBJECT,
        "object_subrequest" | "object-subrequest" => ElementType::OBJECT_SUBREQUEST,
        "xmlhttprequest" | "xhr" => ElementType::XMLHTTPREQUEST,
        _ => ElementType::OTHER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_type() {
        assert_eq!(parse_request_type("main_frame"), ElementType::DOCUMENT);
        assert_eq!(parse_request_type("sub_frame"), ElementType::SUBDOCUMENT);
        assert_eq!(parse_request_type("xhr"), ElementType::XMLHTTPREQUEST);
        assert_eq!(parse_request_type("websocket"), ElementType::OTHER);
    }

    #[test]
    fn test_site_host() {
        let url = "https://cdn.ads.net/a.js";
        assert_eq!(site_host(url, "script", Some("https://news.example.com/page")), "news.example.com");
        assert_eq!(site_host(url, "main_frame", Some("https://news.example.com/page")), "cdn.ads.net");
        assert_eq!(site_host(url, "script", None), "cdn.ads.net");
    }

    #[test]
    fn test_request_context() {
        let ctx = request_context("https://cdn.ads.net/a.js", "script", "news.example.com");
        assert_eq!(ctx.domain, Some("news.example.com"));
        assert_eq!(ctx.third_party, Some(true));
        assert_eq!(ctx.element_types, Some(ElementType::SCRIPT));

        let ctx = request_context("https://static.example.com/a.js", "script", "example.com");
        assert_eq!(ctx.third_party, Some(false));
    }

    #[test]
    fn test_engine_blocks_third_party_script() {
        let mut engine = FilterEngine::new();
        engine.rule_set = abp_compiler::compile("||ads.net^$third-party,script\n##.ad");

        assert!(engine.should_block("https://cdn.ads.net/a.js", "script", Some("https://news.example.com/".to_string())));
        assert!(!engine.should_block("https://cdn.ads.net/a.png", "image", Some("https://news.example.com/".to_string())));
        assert!(!engine.should_block("https://cdn.ads.net/a.js", "script", Some("https://www.ads.net/".to_string())));
        assert_eq!(engine.hiding_css("example.com"), ".ad { display: none !important; }");
        assert_eq!(engine.filter_count(), 2);
    }
}
