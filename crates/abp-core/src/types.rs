//! Core type definitions shared by the parser and the matching engine.

// =============================================================================
// Element Types (bit mask for resource type filtering)
// =============================================================================

bitflags::bitflags! {
    /// Resource type bit mask.
    ///
    /// On a rule an empty mask means the rule is not constrained by type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ElementType: u32 {
        const SCRIPT = 0o1;
        const IMAGE = 0o2;
        const STYLESHEET = 0o4;
        const OBJECT = 0o10;
        const XMLHTTPREQUEST = 0o20;
        const OBJECT_SUBREQUEST = 0o40;
        const SUBDOCUMENT = 0o100;
        const DOCUMENT = 0o200;
        const OTHER = 0o400;
    }
}

impl ElementType {
    /// Map a filter option name (without any `~` prefix) to its type bit.
    pub fn from_option_name(name: &str) -> Option<Self> {
        match name {
            "script" => Some(Self::SCRIPT),
            "image" => Some(Self::IMAGE),
            "stylesheet" => Some(Self::STYLESHEET),
            "object" => Some(Self::OBJECT),
            "xmlhttprequest" => Some(Self::XMLHTTPREQUEST),
            "object-subrequest" => Some(Self::OBJECT_SUBREQUEST),
            "subdocument" => Some(Self::SUBDOCUMENT),
            "document" => Some(Self::DOCUMENT),
            "other" => Some(Self::OTHER),
            _ => None,
        }
    }

    /// Parse a comma separated list of type names, e.g. `"script,image"`.
    /// Unknown names are ignored.
    pub fn from_names(names: &str) -> Self {
        names
            .split(',')
            .filter_map(|name| Self::from_option_name(name.trim()))
            .fold(Self::empty(), |acc, ty| acc | ty)
    }
}

// =============================================================================
// Match Context
// =============================================================================

/// Context for a request being classified.
///
/// Every field is optional. A missing field disables the gate that would
/// consult it rather than defaulting to a pass or fail value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchContext<'a> {
    /// Host of the page that issued the request.
    pub domain: Option<&'a str>,
    /// Whether the request targets a third-party host.
    pub third_party: Option<bool>,
    /// Resource type(s) of the request.
    pub element_types: Option<ElementType>,
}

impl<'a> MatchContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, domain: &'a str) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_third_party(mut self, third_party: bool) -> Self {
        self.third_party = Some(third_party);
        self
    }

    pub fn with_element_types(mut self, element_types: ElementType) -> Self {
        self.element_types = Some(element_types);
        self
    }
}
