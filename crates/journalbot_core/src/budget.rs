use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{BotConfig, LimitsSection};
use crate::gateway::{PageGateway, SaveMode, SaveOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Create,
    Talk,
    Fix,
    Hatnote,
}

impl EditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Talk => "talk",
            Self::Fix => "fix",
            Self::Hatnote => "hatnote",
        }
    }
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BudgetError {
    #[error("undefined edit kind: \"{0}\" has no configured limit")]
    UndefinedKind(EditKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Quota {
    limit: usize,
    used: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EditUsage {
    pub kind: EditKind,
    pub limit: usize,
    pub used: usize,
}

/// Per-run edit quotas. Kinds absent from the budget cannot be saved at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBudget {
    quotas: BTreeMap<EditKind, Quota>,
}

impl EditBudget {
    pub fn new(limits: impl IntoIterator<Item = (EditKind, usize)>) -> Self {
        Self {
            quotas: limits
                .into_iter()
                .map(|(kind, limit)| (kind, Quota { limit, used: 0 }))
                .collect(),
        }
    }

    pub fn from_limits(limits: &LimitsSection) -> Self {
        Self::new([
            (EditKind::Create, limits.create),
            (EditKind::Talk, limits.talk),
            (EditKind::Fix, limits.fix),
            (EditKind::Hatnote, limits.hatnote),
        ])
    }

    pub fn remaining(&self, kind: EditKind) -> Result<usize, BudgetError> {
        self.quotas
            .get(&kind)
            .map(|quota| quota.limit.saturating_sub(quota.used))
            .ok_or(BudgetError::UndefinedKind(kind))
    }

    fn consume(&mut self, kind: EditKind) -> Result<(), BudgetError> {
        let quota = self
            .quotas
            .get_mut(&kind)
            .ok_or(BudgetError::UndefinedKind(kind))?;
        quota.used += 1;
        Ok(())
    }

    pub fn usage(&self) -> Vec<EditUsage> {
        self.quotas
            .iter()
            .map(|(kind, quota)| EditUsage {
                kind: *kind,
                limit: quota.limit,
                used: quota.used,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorSettings {
    pub simulate: bool,
    pub summary_prefix: String,
    pub summary_suffix: String,
    pub tags: Option<String>,
}

impl EditorSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            simulate: config.bot.simulate,
            summary_prefix: config.bot.summary_prefix.clone(),
            summary_suffix: config.bot.summary_suffix.clone(),
            tags: config.change_tag(),
        }
    }
}

/// Guarded save: the only path through which policies write to the wiki.
#[derive(Debug, Clone)]
pub struct Editor {
    settings: EditorSettings,
    budget: EditBudget,
}

impl Editor {
    pub fn new(settings: EditorSettings, budget: EditBudget) -> Self {
        Self { settings, budget }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(
            EditorSettings::from_config(config),
            EditBudget::from_limits(&config.limits),
        )
    }

    pub fn simulate(&self) -> bool {
        self.settings.simulate
    }

    pub fn budget(&self) -> &EditBudget {
        &self.budget
    }

    /// Returns `Ok(false)` without touching the wiki when simulating or when the
    /// quota for `kind` is spent.
    pub fn save<G: PageGateway>(
        &mut self,
        gateway: &mut G,
        title: &str,
        content: &str,
        summary: &str,
        mode: SaveMode,
        kind: EditKind,
    ) -> Result<bool> {
        let remaining = self.budget.remaining(kind)?;
        if self.settings.simulate {
            info!("Simulate: would save [[{title}]] ({kind}).");
            return Ok(false);
        }
        if remaining == 0 {
            debug!("Edit limit reached for {kind}; not saving [[{title}]].");
            return Ok(false);
        }

        let mut options = SaveOptions::new(mode);
        options.tags = self.settings.tags.clone();
        let summary = format!(
            "{}{}{}",
            self.settings.summary_prefix, summary, self.settings.summary_suffix
        );
        gateway.write_page(title, content, &summary, &options)?;
        self.budget.consume(kind)?;
        Ok(true)
    }
}
