use anyhow::Result;
use serde::Serialize;

/// Subject namespaces that have a paired talk namespace named `<name> talk`.
const PAIRED_NAMESPACES: [&str; 9] = [
    "User",
    "Wikipedia",
    "File",
    "MediaWiki",
    "Template",
    "Help",
    "Category",
    "Portal",
    "Draft",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// Fail instead of overwriting an existing page.
    CreateOnly,
    /// Fail instead of implicitly creating a missing page.
    OverwriteOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    pub mode: SaveMode,
    pub bot: bool,
    pub minor: bool,
    pub tags: Option<String>,
}

impl SaveOptions {
    pub fn new(mode: SaveMode) -> Self {
        Self {
            mode,
            bot: true,
            minor: false,
            tags: None,
        }
    }
}

/// Everything the policies need to know about, and do to, live wiki pages.
pub trait PageGateway {
    fn exists(&mut self, title: &str) -> Result<bool>;
    fn is_redirect(&mut self, title: &str) -> Result<bool>;
    fn categories(&mut self, title: &str) -> Result<Vec<String>>;
    /// Current wikitext, or an empty string for a missing page.
    fn read_text(&mut self, title: &str) -> Result<String>;
    fn write_page(
        &mut self,
        title: &str,
        content: &str,
        summary: &str,
        options: &SaveOptions,
    ) -> Result<()>;
    /// Drop any page state cached while handling the previous title.
    fn forget_cached_pages(&mut self) {}
    fn request_count(&self) -> usize;
}

/// Map a subject page title to its talk page and back. Journal titles live in
/// the main namespace; namespace aliases such as `WP:` are not resolved.
pub fn toggle_talk_page(title: &str) -> String {
    let title = title.trim();
    if let Some(subject) = title.strip_prefix("Talk:") {
        return subject.to_string();
    }
    if let Some((prefix, rest)) = title.split_once(':') {
        if let Some(namespace) = prefix.strip_suffix(" talk")
            && PAIRED_NAMESPACES.contains(&namespace)
        {
            return format!("{namespace}:{rest}");
        }
        if PAIRED_NAMESPACES.contains(&prefix) {
            return format!("{prefix} talk:{rest}");
        }
    }
    format!("Talk:{title}")
}

pub(crate) fn contains_journal(value: &str) -> bool {
    value.to_lowercase().contains("journal")
}
