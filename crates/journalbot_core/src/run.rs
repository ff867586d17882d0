use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::abbrev::AbbreviationOracle;
use crate::budget::{EditUsage, Editor};
use crate::gateway::PageGateway;
use crate::hatnote::{HatnoteOutcome, HatnoteReport, process_hatnote};
use crate::redirect::{RedirectTarget, TitleOutcome, TitleReport, process_title};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Redirect target and category; `None` runs hatnotes only.
    pub redirects: Option<RedirectTarget>,
    /// Publisher named in hatnotes; `None` disables the hatnote pass.
    pub hatnote_publisher: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RunCounts {
    pub titles: usize,
    pub applied: usize,
    pub abandoned: usize,
    pub skipped: usize,
    pub hatnotes_added: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub simulate: bool,
    pub counts: RunCounts,
    pub titles: Vec<TitleReport>,
    pub hatnotes: Vec<HatnoteReport>,
    pub budget: Vec<EditUsage>,
    pub request_count: usize,
}

/// One title per line; surrounding whitespace and blank lines are dropped.
pub fn read_title_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read title list {}", path.display()))?;
    Ok(parse_title_list(&content))
}

pub fn parse_title_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Process titles strictly in input order. Any gateway error aborts the run.
pub fn run_titles<G, O>(
    titles: &[String],
    settings: &RunSettings,
    gateway: &mut G,
    oracle: &mut O,
    editor: &mut Editor,
) -> Result<RunReport>
where
    G: PageGateway,
    O: AbbreviationOracle,
{
    let mut counts = RunCounts::default();
    let mut title_reports = Vec::new();
    let mut hatnote_reports = Vec::new();

    for title in titles {
        counts.titles += 1;
        gateway.forget_cached_pages();
        if let Some(target) = &settings.redirects {
            let report = process_title(gateway, oracle, editor, title, target)
                .with_context(|| format!("redirect workflow failed for [[{title}]]"))?;
            match &report.outcome {
                TitleOutcome::Applied { .. } => counts.applied += 1,
                TitleOutcome::Abandoned { .. } => counts.abandoned += 1,
                TitleOutcome::Skipped { .. } => counts.skipped += 1,
            }
            title_reports.push(report);
        }
        if let Some(publisher) = &settings.hatnote_publisher {
            let report = process_hatnote(gateway, editor, title, publisher)
                .with_context(|| format!("hatnote workflow failed for [[{title}]]"))?;
            if matches!(report.outcome, HatnoteOutcome::Added { saved: true, .. }) {
                counts.hatnotes_added += 1;
            }
            hatnote_reports.push(report);
        }
    }

    info!(
        "Processed {} titles: {} applied, {} abandoned, {} skipped.",
        counts.titles, counts.applied, counts.abandoned, counts.skipped
    );
    Ok(RunReport {
        simulate: editor.simulate(),
        counts,
        titles: title_reports,
        hatnotes: hatnote_reports,
        budget: editor.budget().usage(),
        request_count: gateway.request_count(),
    })
}
