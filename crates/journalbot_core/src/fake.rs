//! In-memory wiki and abbreviation oracle shared by the policy tests.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};

use crate::abbrev::{AbbrevLookup, AbbreviationOracle, LanguageScope};
use crate::gateway::{PageGateway, SaveMode, SaveOptions};

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub text: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FakeWrite {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub options: SaveOptions,
}

#[derive(Debug, Default)]
pub struct FakeWiki {
    pub pages: BTreeMap<String, FakePage>,
    pub writes: Vec<FakeWrite>,
    pub request_count: usize,
    pub cache_resets: usize,
}

impl FakeWiki {
    pub fn insert_page(&mut self, title: &str, text: &str) {
        self.pages.insert(
            title.to_string(),
            FakePage {
                text: text.to_string(),
                categories: Vec::new(),
            },
        );
    }

    pub fn insert_categorized(&mut self, title: &str, text: &str, categories: &[&str]) {
        self.pages.insert(
            title.to_string(),
            FakePage {
                text: text.to_string(),
                categories: categories.iter().map(|item| (*item).to_string()).collect(),
            },
        );
    }

    pub fn text(&self, title: &str) -> Option<&str> {
        self.pages.get(title).map(|page| page.text.as_str())
    }

    pub fn written_titles(&self) -> BTreeSet<String> {
        self.writes.iter().map(|write| write.title.clone()).collect()
    }
}

impl PageGateway for FakeWiki {
    fn exists(&mut self, title: &str) -> Result<bool> {
        self.request_count += 1;
        Ok(self.pages.contains_key(title))
    }

    fn is_redirect(&mut self, title: &str) -> Result<bool> {
        self.request_count += 1;
        Ok(self
            .pages
            .get(title)
            .is_some_and(|page| page.text.trim_start().to_uppercase().starts_with("#REDIRECT")))
    }

    fn categories(&mut self, title: &str) -> Result<Vec<String>> {
        self.request_count += 1;
        Ok(self
            .pages
            .get(title)
            .map(|page| page.categories.clone())
            .unwrap_or_default())
    }

    fn read_text(&mut self, title: &str) -> Result<String> {
        self.request_count += 1;
        Ok(self.text(title).unwrap_or_default().to_string())
    }

    fn write_page(
        &mut self,
        title: &str,
        content: &str,
        summary: &str,
        options: &SaveOptions,
    ) -> Result<()> {
        self.request_count += 1;
        let exists = self.pages.contains_key(title);
        match options.mode {
            SaveMode::CreateOnly if exists => {
                bail!("MediaWiki API error [articleexists]: {title}")
            }
            SaveMode::OverwriteOnly if !exists => {
                bail!("MediaWiki API error [missingtitle]: {title}")
            }
            _ => {}
        }
        let page = self.pages.entry(title.to_string()).or_default();
        page.text = content.to_string();
        self.writes.push(FakeWrite {
            title: title.to_string(),
            content: content.to_string(),
            summary: summary.to_string(),
            options: options.clone(),
        });
        Ok(())
    }

    fn forget_cached_pages(&mut self) {
        self.cache_resets += 1;
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

/// Answers every lookup with the title itself unless told otherwise.
#[derive(Debug, Default)]
pub struct FakeOracle {
    pub abbreviations: BTreeMap<(String, LanguageScope), String>,
    pub pending: BTreeSet<String>,
    pub recorded: Vec<String>,
    pub lookups: Vec<(String, LanguageScope)>,
}

impl FakeOracle {
    pub fn pending(mut self, title: &str) -> Self {
        self.pending.insert(title.to_string());
        self
    }

    pub fn with(mut self, title: &str, scope: LanguageScope, abbreviation: &str) -> Self {
        self.abbreviations
            .insert((title.to_string(), scope), abbreviation.to_string());
        self
    }
}

impl AbbreviationOracle for FakeOracle {
    fn record_title(&mut self, title: &str) -> Result<()> {
        self.recorded.push(title.to_string());
        Ok(())
    }

    fn abbreviation(&mut self, title: &str, scope: LanguageScope) -> Result<AbbrevLookup> {
        self.lookups.push((title.to_string(), scope));
        if self.pending.contains(title) {
            return Ok(AbbrevLookup::NotComputedYet {
                message: format!("No computed abbreviation stored for [[{title}]]"),
            });
        }
        match self.abbreviations.get(&(title.to_string(), scope)) {
            Some(value) => Ok(AbbrevLookup::Ready(value.clone())),
            None => Ok(AbbrevLookup::Ready(title.to_string())),
        }
    }
}
