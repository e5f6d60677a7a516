//! Dropdown catalogs: the fixed, ordered vocabularies behind constrained CRM
//! fields. Membership is case-insensitive but the canonical catalog casing is
//! what flows downstream, never the user's raw spelling.

/// Ordered list of canonical values for one dropdown field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropdownCatalog {
    field: &'static str,
    entries: Vec<String>,
}

impl DropdownCatalog {
    pub fn new(field: &'static str, entries: Vec<String>) -> Self {
        Self { field, entries }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Resolves `raw` to the canonical catalog entry, or `None` when the value
    /// is not in the catalog. Trims, compares ASCII-case-insensitively, first
    /// match in catalog order wins. No partial or fuzzy matching.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        let candidate = raw.trim();
        self.entries
            .iter()
            .find(|entry| entry.eq_ignore_ascii_case(candidate))
            .map(String::as_str)
    }

    pub fn render(&self) -> String {
        self.entries.join(", ")
    }
}

/// The two catalogs the router validates against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalogs {
    pub stages: DropdownCatalog,
    pub pipelines: DropdownCatalog,
}

impl Default for Catalogs {
    fn default() -> Self {
        Self {
            stages: DropdownCatalog::new("stage", default_stages()),
            pipelines: DropdownCatalog::new("pipeline", default_pipelines()),
        }
    }
}

impl Catalogs {
    pub fn from_entries(stages: Vec<String>, pipelines: Vec<String>) -> Self {
        Self {
            stages: DropdownCatalog::new("stage", stages),
            pipelines: DropdownCatalog::new("pipeline", pipelines),
        }
    }
}

pub fn default_stages() -> Vec<String> {
    [
        "Qualification",
        "Needs Analysis",
        "Value Proposition",
        "HFS Filtration",
        "Proposal/Price Quote",
        "Negotiation/Review",
        "Closed Won",
        "Closed Lost",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

pub fn default_pipelines() -> Vec<String> {
    ["Standard Sales", "Moneste", "Partner Referral"].into_iter().map(str::to_owned).collect()
}
