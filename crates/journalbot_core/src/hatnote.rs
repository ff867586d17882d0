use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::budget::{EditKind, Editor};
use crate::gateway::{PageGateway, SaveMode, contains_journal};
use crate::redirect::JOURNAL_SUFFIX;

/// Suffixes predatory publishers bolt onto the name of an established journal.
pub const DECEPTIVE_SUFFIXES: [&str; 4] = [
    ": Open Access",
    "-Open Access",
    ": An Indian Journal",
    ": Current Research",
];

const HATNOTE_SUMMARY: &str = "Add hatnote to predatory journal clone.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HatnoteOutcome {
    NoDeceptiveSuffix,
    /// Neither the stripped title nor its " (journal)" form is a usable article.
    NoLegitimatePage { candidate: String },
    LegitimatePageIsRedirect { page: String },
    AlreadyHatnoted { page: String },
    Added { page: String, saved: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HatnoteReport {
    pub title: String,
    #[serde(flatten)]
    pub outcome: HatnoteOutcome,
}

/// The legitimate title a deceptive one imitates, if it carries a known suffix.
pub fn strip_deceptive_suffix(title: &str) -> Option<&str> {
    DECEPTIVE_SUFFIXES
        .iter()
        .find_map(|suffix| title.strip_suffix(suffix))
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
}

pub fn hatnote_text(predatory_title: &str, publisher: &str) -> String {
    format!("{{{{Confused|text=[[{predatory_title}]], published by the [[{publisher}]]}}}}\n")
}

fn has_confused_hatnote(text: &str) -> bool {
    text.contains("{{Confused|") || text.contains("{{confused|")
}

/// Warn readers of the legitimate journal's article about the predatory look-alike.
pub fn process_hatnote<G: PageGateway>(
    gateway: &mut G,
    editor: &mut Editor,
    title: &str,
    publisher: &str,
) -> Result<HatnoteReport> {
    let outcome = resolve_and_insert(gateway, editor, title, publisher)?;
    match &outcome {
        HatnoteOutcome::NoDeceptiveSuffix => {}
        HatnoteOutcome::NoLegitimatePage { candidate } => {
            info!("Skip hatnote: no legitimate journal article for [[{candidate}]].");
        }
        HatnoteOutcome::LegitimatePageIsRedirect { page } => {
            info!("Skip hatnote: [[{page}]] is a redirect.");
        }
        HatnoteOutcome::AlreadyHatnoted { page } => {
            info!("Skip: {{{{confused}}}} hatnote already on [[{page}]]");
        }
        HatnoteOutcome::Added { .. } => {}
    }
    Ok(HatnoteReport {
        title: title.to_string(),
        outcome,
    })
}

fn resolve_and_insert<G: PageGateway>(
    gateway: &mut G,
    editor: &mut Editor,
    title: &str,
    publisher: &str,
) -> Result<HatnoteOutcome> {
    let Some(candidate) = strip_deceptive_suffix(title) else {
        return Ok(HatnoteOutcome::NoDeceptiveSuffix);
    };
    if !gateway.exists(candidate)? {
        return Ok(HatnoteOutcome::NoLegitimatePage {
            candidate: candidate.to_string(),
        });
    }

    let is_journal = gateway
        .categories(candidate)?
        .iter()
        .any(|category| contains_journal(category));
    let page = if is_journal {
        candidate.to_string()
    } else {
        let disambiguated = format!("{candidate}{JOURNAL_SUFFIX}");
        if !gateway.exists(&disambiguated)? {
            return Ok(HatnoteOutcome::NoLegitimatePage {
                candidate: disambiguated,
            });
        }
        disambiguated
    };
    if gateway.is_redirect(&page)? {
        return Ok(HatnoteOutcome::LegitimatePageIsRedirect { page });
    }

    let text = gateway.read_text(&page)?;
    if has_confused_hatnote(&text) {
        return Ok(HatnoteOutcome::AlreadyHatnoted { page });
    }

    info!("Adding hatnote to [[{page}]]");
    let content = format!("{}{text}", hatnote_text(title, publisher));
    let saved = editor.save(
        gateway,
        &page,
        &content,
        HATNOTE_SUMMARY,
        SaveMode::OverwriteOnly,
        EditKind::Hatnote,
    )?;
    Ok(HatnoteOutcome::Added { page, saved })
}
