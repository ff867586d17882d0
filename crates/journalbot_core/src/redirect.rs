//! Redirect reconciliation for predatory-publisher journal titles.
//!
//! For one canonical title this module decides which redirect variants should
//! exist (plain, `and`/`&` swapped, ISO-4 abbreviated), what each of them must
//! contain, and whether an existing page can be rewritten. A title is handled
//! all-or-nothing: a try-only pass classifies every variant first, and nothing
//! is written if any variant turns out to be unfixable.

use std::collections::BTreeSet;
use std::fmt;

use anyhow::Result;
use serde::Serialize;
use similar::TextDiff;
use tracing::{info, warn};

use crate::abbrev::{AbbrevLookup, AbbreviationOracle, LanguageScope};
use crate::budget::{EditKind, Editor};
use crate::gateway::{PageGateway, SaveMode, contains_journal, toggle_talk_page};

pub const TALK_PAGE_BANNER: &str = "{{WPJournals}}";
pub const ISO4_MARKER: &str = "{{R from ISO 4}}";
pub const JOURNAL_SUFFIX: &str = " (journal)";
const CREATE_SUMMARY: &str = "Create redirect from predatory publisher's journal.";
const FIX_SUMMARY: &str = "Fix redirect from predatory publisher's journal.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectKind {
    Plain,
    AndAmpersand,
    Iso4,
}

impl RedirectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::AndAmpersand => "and",
            Self::Iso4 => "iso4",
        }
    }
}

impl fmt::Display for RedirectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RedirectVariant {
    pub title: String,
    pub kind: RedirectKind,
}

impl RedirectVariant {
    pub fn new(title: impl Into<String>, kind: RedirectKind) -> Self {
        Self {
            title: title.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectDisposition {
    Create,
    Done,
    Fix,
    Unfixable,
}

impl RedirectDisposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Done => "done",
            Self::Fix => "fix",
            Self::Unfixable => "unfixable",
        }
    }
}

/// Where a redirect should point and which category plain redirects join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub target: String,
    /// Empty means no category line.
    pub category: String,
}

impl RedirectTarget {
    pub fn new(target: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            category: category.into(),
        }
    }

    pub fn redirect_line(&self) -> String {
        format!("#REDIRECT[[{}]]\n", self.target)
    }

    pub fn category_line(&self) -> Option<String> {
        if self.category.is_empty() {
            None
        } else {
            Some(format!("[[Category:{}]]\n", self.category))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditRecord {
    pub title: String,
    pub kind: EditKind,
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectCheck {
    pub title: String,
    pub kind: RedirectKind,
    pub disposition: RedirectDisposition,
    pub expected: String,
    /// Live text when the page already existed.
    pub existing: Option<String>,
    pub edits: Vec<EditRecord>,
}

impl RedirectCheck {
    /// Unified diff from the live text to the expected content.
    pub fn diff(&self) -> String {
        let existing = self.existing.as_deref().unwrap_or_default();
        TextDiff::from_lines(existing, self.expected.as_str())
            .unified_diff()
            .header("is", "should be")
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// An article already exists and its title says it is a journal.
    TitleAlreadyJournal,
    /// An article already exists in a journal category.
    CategoryAlreadyJournal,
    AbbreviationNotComputed { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TitleAlreadyJournal => {
                f.write_str("already exists, title already has \"journal\"")
            }
            Self::CategoryAlreadyJournal => {
                f.write_str("already exists, has category containing \"journal\"")
            }
            Self::AbbreviationNotComputed { message } => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantPlan {
    Ready {
        variants: BTreeSet<RedirectVariant>,
        journal_suffix: bool,
    },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TitleOutcome {
    Skipped { skip: SkipReason },
    /// At least one variant is unfixable; nothing was written.
    Abandoned { conflicts: Vec<RedirectCheck> },
    Applied { checks: Vec<RedirectCheck> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleReport {
    pub title: String,
    #[serde(flatten)]
    pub outcome: TitleOutcome,
}

/// Redirect variants implied by the title text and its abbreviation.
pub fn redirect_variants(title: &str, abbreviation: &str) -> BTreeSet<RedirectVariant> {
    let mut variants = BTreeSet::new();
    variants.insert(RedirectVariant::new(title, RedirectKind::Plain));

    if title.contains(" and ") {
        variants.insert(RedirectVariant::new(
            title.replace(" and ", " & "),
            RedirectKind::AndAmpersand,
        ));
    } else if title.contains(" & ") && !title.contains("Acta") {
        variants.insert(RedirectVariant::new(
            title.replace(" & ", " and "),
            RedirectKind::AndAmpersand,
        ));
    }

    if abbreviation != title {
        // One entry per title: an abbreviation that collides with an earlier
        // variant keeps that variant's content.
        for iso_title in [abbreviation.to_string(), abbreviation.replace('.', "")] {
            if !variants.iter().any(|variant| variant.title == iso_title) {
                variants.insert(RedirectVariant::new(iso_title, RedirectKind::Iso4));
            }
        }
    }
    variants
}

/// Decide which variants to reconcile for `title`, consulting the live
/// canonical page and the abbreviation oracle.
pub fn plan_variants<G, O>(gateway: &mut G, oracle: &mut O, title: &str) -> Result<VariantPlan>
where
    G: PageGateway,
    O: AbbreviationOracle,
{
    // An existing article takes the plain title, so our redirects get " (journal)".
    let journal_suffix = gateway.exists(title)? && !gateway.is_redirect(title)?;
    if journal_suffix {
        if contains_journal(title) {
            return Ok(VariantPlan::Skipped(SkipReason::TitleAlreadyJournal));
        }
        if gateway
            .categories(title)?
            .iter()
            .any(|category| contains_journal(category))
        {
            return Ok(VariantPlan::Skipped(SkipReason::CategoryAlreadyJournal));
        }
    }

    oracle.record_title(title)?;
    let abbreviation = match oracle.abbreviation(title, LanguageScope::for_title(title))? {
        AbbrevLookup::Ready(abbreviation) => abbreviation,
        AbbrevLookup::NotComputedYet { message } => {
            return Ok(VariantPlan::Skipped(SkipReason::AbbreviationNotComputed {
                message,
            }));
        }
    };

    Ok(VariantPlan::Ready {
        variants: redirect_variants(title, &abbreviation),
        journal_suffix,
    })
}

/// Exact wikitext a redirect at `title` of the given kind must contain.
pub fn expected_content(title: &str, kind: RedirectKind, target: &RedirectTarget) -> String {
    let mut content = target.redirect_line();
    if let Some(sort_line) = default_sort_line(title) {
        content.push_str(&sort_line);
    }
    if kind == RedirectKind::Plain
        && let Some(category_line) = target.category_line()
    {
        content.push_str(&category_line);
    }
    if kind == RedirectKind::Iso4 {
        content.push_str(ISO4_MARKER);
        content.push('\n');
    }
    content
}

fn default_sort_line(title: &str) -> Option<String> {
    title
        .contains(" & ")
        .then(|| format!("{{{{DEFAULTSORT:{}}}}}\n", title.replace(" & ", " and ")))
}

pub(crate) fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// Whether `existing` is the bare redirect to the right target once known
/// boilerplate lines are removed.
pub fn is_fixable(existing: &str, title: &str, target: &RedirectTarget) -> bool {
    let mut remainder = existing.to_string();
    if let Some(category_line) = target.category_line() {
        remainder = remainder.replace(category_line.trim(), "");
    }
    remainder = remainder.replace(ISO4_MARKER, "");
    if let Some(sort_line) = default_sort_line(title) {
        remainder = remainder.replace(sort_line.trim(), "");
    }
    strip_whitespace(&remainder) == strip_whitespace(&target.redirect_line())
}

/// Classify one candidate redirect and, unless `try_only`, bring it in line.
pub fn reconcile_redirect<G: PageGateway>(
    gateway: &mut G,
    editor: &mut Editor,
    variant: &RedirectVariant,
    target: &RedirectTarget,
    try_only: bool,
) -> Result<RedirectCheck> {
    let title = variant.title.as_str();
    let expected = expected_content(title, variant.kind, target);
    let mut check = RedirectCheck {
        title: title.to_string(),
        kind: variant.kind,
        disposition: RedirectDisposition::Create,
        expected,
        existing: None,
        edits: Vec::new(),
    };

    if !gateway.exists(title)? {
        if !try_only {
            info!("Creating redirect from: [[{title}]].");
            let saved = editor.save(
                gateway,
                title,
                &check.expected,
                CREATE_SUMMARY,
                SaveMode::CreateOnly,
                EditKind::Create,
            )?;
            check.edits.push(EditRecord {
                title: title.to_string(),
                kind: EditKind::Create,
                saved,
            });
            ensure_talk_page(gateway, editor, title, CREATE_SUMMARY, &mut check.edits)?;
        }
        return Ok(check);
    }

    let existing = gateway.read_text(title)?;
    check.existing = Some(existing.clone());

    if strip_whitespace(&existing) == strip_whitespace(&check.expected) {
        check.disposition = RedirectDisposition::Done;
        if !try_only {
            let talk_title = toggle_talk_page(title);
            if gateway.exists(&talk_title)? {
                info!("Done: [[{title}]].");
            } else {
                info!("Done, but creating talk page: [[{title}]].");
                ensure_talk_page(gateway, editor, title, CREATE_SUMMARY, &mut check.edits)?;
            }
        }
        return Ok(check);
    }

    if !is_fixable(&existing, title, target) {
        check.disposition = RedirectDisposition::Unfixable;
        warn!(
            "Not fixable: [[{title}]] (type={}).\n{}",
            variant.kind,
            check.diff()
        );
        return Ok(check);
    }

    check.disposition = RedirectDisposition::Fix;
    if !try_only {
        info!(
            "Fixing redirect from: [[{title}]] (type={}).\n{}",
            variant.kind,
            check.diff()
        );
        let saved = editor.save(
            gateway,
            title,
            &check.expected,
            FIX_SUMMARY,
            SaveMode::OverwriteOnly,
            EditKind::Fix,
        )?;
        check.edits.push(EditRecord {
            title: title.to_string(),
            kind: EditKind::Fix,
            saved,
        });
        ensure_talk_page(gateway, editor, title, FIX_SUMMARY, &mut check.edits)?;
    }
    Ok(check)
}

fn ensure_talk_page<G: PageGateway>(
    gateway: &mut G,
    editor: &mut Editor,
    title: &str,
    summary: &str,
    edits: &mut Vec<EditRecord>,
) -> Result<()> {
    let talk_title = toggle_talk_page(title);
    if gateway.exists(&talk_title)? {
        return Ok(());
    }
    let saved = editor.save(
        gateway,
        &talk_title,
        TALK_PAGE_BANNER,
        summary,
        SaveMode::CreateOnly,
        EditKind::Talk,
    )?;
    edits.push(EditRecord {
        title: talk_title,
        kind: EditKind::Talk,
        saved,
    });
    Ok(())
}

/// Full redirect workflow for one canonical title.
pub fn process_title<G, O>(
    gateway: &mut G,
    oracle: &mut O,
    editor: &mut Editor,
    title: &str,
    target: &RedirectTarget,
) -> Result<TitleReport>
where
    G: PageGateway,
    O: AbbreviationOracle,
{
    let (variants, journal_suffix) = match plan_variants(gateway, oracle, title)? {
        VariantPlan::Ready {
            variants,
            journal_suffix,
        } => (variants, journal_suffix),
        VariantPlan::Skipped(skip) => {
            match &skip {
                SkipReason::AbbreviationNotComputed { message } => info!("{message}"),
                other => info!("Skip: [[{title}]] {other}."),
            }
            return Ok(TitleReport {
                title: title.to_string(),
                outcome: TitleOutcome::Skipped { skip },
            });
        }
    };

    let candidates: Vec<RedirectVariant> = variants
        .into_iter()
        .map(|variant| {
            if journal_suffix {
                RedirectVariant::new(format!("{}{JOURNAL_SUFFIX}", variant.title), variant.kind)
            } else {
                variant
            }
        })
        .collect();

    let mut conflicts = Vec::new();
    for candidate in &candidates {
        let check = reconcile_redirect(gateway, editor, candidate, target, true)?;
        if check.disposition == RedirectDisposition::Unfixable {
            conflicts.push(check);
        }
    }
    if !conflicts.is_empty() {
        info!("Skip: [[{title}]] unfixable.");
        return Ok(TitleReport {
            title: title.to_string(),
            outcome: TitleOutcome::Abandoned { conflicts },
        });
    }

    let mut checks = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        checks.push(reconcile_redirect(
            gateway, editor, candidate, target, false,
        )?);
    }
    Ok(TitleReport {
        title: title.to_string(),
        outcome: TitleOutcome::Applied { checks },
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{
        EditRecord, FIX_SUMMARY, RedirectDisposition, RedirectKind, RedirectTarget,
        RedirectVariant, SkipReason, TitleOutcome, expected_content, is_fixable, process_title,
        reconcile_redirect, redirect_variants, strip_whitespace,
    };
    use crate::abbrev::LanguageScope;
    use crate::budget::{EditBudget, EditKind, Editor, EditorSettings};
    use crate::config::LimitsSection;
    use crate::fake::{FakeOracle, FakeWiki};
    use crate::gateway::SaveMode;

    fn target() -> RedirectTarget {
        RedirectTarget::new("Pred Publisher", "Pred academic journals")
    }

    fn editor() -> Editor {
        Editor::new(
            EditorSettings::default(),
            EditBudget::from_limits(&LimitsSection::default()),
        )
    }

    fn variant_set(items: &[(&str, RedirectKind)]) -> BTreeSet<RedirectVariant> {
        items
            .iter()
            .map(|(title, kind)| RedirectVariant::new(*title, *kind))
            .collect()
    }

    #[test]
    fn plain_title_yields_single_variant() {
        let variants = redirect_variants("Foo Bar Journal", "Foo Bar Journal");
        assert_eq!(
            variants,
            variant_set(&[("Foo Bar Journal", RedirectKind::Plain)])
        );
    }

    #[test]
    fn and_is_swapped_for_ampersand_only() {
        let variants = redirect_variants("Law and Order", "Law and Order");
        assert_eq!(
            variants,
            variant_set(&[
                ("Law and Order", RedirectKind::Plain),
                ("Law & Order", RedirectKind::AndAmpersand),
            ])
        );
    }

    #[test]
    fn ampersand_is_swapped_for_and() {
        let variants = redirect_variants("Law & Order", "Law & Order");
        assert!(variants.contains(&RedirectVariant::new(
            "Law and Order",
            RedirectKind::AndAmpersand
        )));
    }

    #[test]
    fn acta_titles_keep_their_ampersand() {
        let variants = redirect_variants("Acta Medica & Biologica", "Acta Medica & Biologica");
        assert_eq!(variants.len(), 1);
        assert!(
            variants
                .iter()
                .all(|variant| variant.kind != RedirectKind::AndAmpersand)
        );
    }

    #[test]
    fn iso4_adds_dotted_and_undotted_forms() {
        let variants = redirect_variants("Journal of Physics and Chemistry", "J. Phys. Chem.");
        assert_eq!(
            variants,
            variant_set(&[
                ("Journal of Physics and Chemistry", RedirectKind::Plain),
                ("Journal of Physics & Chemistry", RedirectKind::AndAmpersand),
                ("J. Phys. Chem.", RedirectKind::Iso4),
                ("J Phys Chem", RedirectKind::Iso4),
            ])
        );
    }

    #[test]
    fn iso4_without_dots_collapses() {
        let variants = redirect_variants("Cancer Science Letters", "Cancer Sci Lett");
        assert_eq!(variants.len(), 2);
    }

    #[test]
    fn undotted_abbreviation_equal_to_title_keeps_plain_variant() {
        let variants = redirect_variants("J Foo", "J. Foo");
        assert_eq!(
            variants,
            variant_set(&[
                ("J Foo", RedirectKind::Plain),
                ("J. Foo", RedirectKind::Iso4),
            ])
        );

        let variants = redirect_variants("Foo & Bar", "Foo and Bar");
        assert_eq!(
            variants,
            variant_set(&[
                ("Foo & Bar", RedirectKind::Plain),
                ("Foo and Bar", RedirectKind::AndAmpersand),
            ])
        );
    }

    #[test]
    fn content_for_each_kind() {
        assert_eq!(
            expected_content("Foo", RedirectKind::Plain, &target()),
            "#REDIRECT[[Pred Publisher]]\n[[Category:Pred academic journals]]\n"
        );
        assert_eq!(
            expected_content("A & B", RedirectKind::AndAmpersand, &target()),
            "#REDIRECT[[Pred Publisher]]\n{{DEFAULTSORT:A and B}}\n"
        );
        assert_eq!(
            expected_content("J. Foo", RedirectKind::Iso4, &target()),
            "#REDIRECT[[Pred Publisher]]\n{{R from ISO 4}}\n"
        );
        assert_eq!(
            expected_content("Foo", RedirectKind::Plain, &RedirectTarget::new("Pred", "")),
            "#REDIRECT[[Pred]]\n"
        );
    }

    #[test]
    fn stripping_category_and_redirect_leaves_nothing() {
        let target = RedirectTarget::new("Pred Publisher", "C");
        let content = expected_content("Foo", RedirectKind::Plain, &target);
        let category_line = target.category_line().expect("category line");
        let remainder = content
            .replace(category_line.trim(), "")
            .replace(target.redirect_line().trim(), "");
        assert_eq!(strip_whitespace(&remainder), "");
    }

    #[test]
    fn reordered_boilerplate_with_extra_content_is_not_fixable() {
        let existing = "[[Category:Pred academic journals]]\n#REDIRECT[[Pred Publisher]]\n{{R from move}}\n";
        assert!(!is_fixable(existing, "Foo", &target()));
        let existing = "#REDIRECT [[Pred Publisher]]\n{{R from ISO 4}}\n";
        assert!(is_fixable(existing, "Foo", &target()));
    }

    #[test]
    fn creates_single_redirect_and_talk_page() {
        let mut wiki = FakeWiki::default();
        let mut oracle = FakeOracle::default();
        let mut editor = editor();

        let report = process_title(
            &mut wiki,
            &mut oracle,
            &mut editor,
            "Foo Bar Journal",
            &target(),
        )
        .expect("process");

        assert!(matches!(report.outcome, TitleOutcome::Applied { .. }));
        assert_eq!(
            wiki.text("Foo Bar Journal"),
            Some("#REDIRECT[[Pred Publisher]]\n[[Category:Pred academic journals]]\n")
        );
        assert_eq!(wiki.text("Talk:Foo Bar Journal"), Some("{{WPJournals}}"));
        assert_eq!(wiki.writes.len(), 2);
        assert_eq!(oracle.recorded, vec!["Foo Bar Journal".to_string()]);
        assert_eq!(
            oracle.lookups,
            vec![("Foo Bar Journal".to_string(), LanguageScope::Eng)]
        );
    }

    #[test]
    fn creates_and_ampersand_pair() {
        let mut wiki = FakeWiki::default();
        let mut oracle = FakeOracle::default();
        let mut editor = editor();

        process_title(&mut wiki, &mut oracle, &mut editor, "A and B", &target())
            .expect("process");

        assert_eq!(
            wiki.text("A and B"),
            Some("#REDIRECT[[Pred Publisher]]\n[[Category:Pred academic journals]]\n")
        );
        assert_eq!(
            wiki.text("A & B"),
            Some("#REDIRECT[[Pred Publisher]]\n{{DEFAULTSORT:A and B}}\n")
        );
        assert_eq!(wiki.text("Talk:A & B"), Some("{{WPJournals}}"));
        assert_eq!(editor.budget().remaining(EditKind::Create), Ok(13));
    }

    #[test]
    fn done_redirect_only_gains_talk_page() {
        let mut wiki = FakeWiki::default();
        wiki.insert_page(
            "Foo Bar Journal",
            "#REDIRECT [[Pred Publisher]]\n\n[[Category:Pred academic journals]]",
        );
        let mut oracle = FakeOracle::default();
        let mut editor = editor();

        let report = process_title(
            &mut wiki,
            &mut oracle,
            &mut editor,
            "Foo Bar Journal",
            &target(),
        )
        .expect("process");

        let TitleOutcome::Applied { checks } = report.outcome else {
            panic!("expected applied outcome");
        };
        assert_eq!(checks[0].disposition, RedirectDisposition::Done);
        assert_eq!(
            wiki.written_titles(),
            BTreeSet::from(["Talk:Foo Bar Journal".to_string()])
        );
        assert_eq!(
            wiki.text("Foo Bar Journal"),
            Some("#REDIRECT [[Pred Publisher]]\n\n[[Category:Pred academic journals]]")
        );
    }

    #[test]
    fn fixable_redirect_is_overwritten() {
        let mut wiki = FakeWiki::default();
        wiki.insert_page("Foo Bar Journal", "#REDIRECT[[Pred Publisher]]\n");
        wiki.insert_page("Talk:Foo Bar Journal", "{{WPJournals}}");
        let mut editor = editor();

        let check = reconcile_redirect(
            &mut wiki,
            &mut editor,
            &RedirectVariant::new("Foo Bar Journal", RedirectKind::Plain),
            &target(),
            false,
        )
        .expect("reconcile");

        assert_eq!(check.disposition, RedirectDisposition::Fix);
        assert_eq!(
            wiki.text("Foo Bar Journal"),
            Some("#REDIRECT[[Pred Publisher]]\n[[Category:Pred academic journals]]\n")
        );
        assert_eq!(wiki.writes.len(), 1);
        assert_eq!(editor.budget().remaining(EditKind::Fix), Ok(14));
    }

    #[test]
    fn fix_creates_missing_talk_page() {
        let mut wiki = FakeWiki::default();
        wiki.insert_page("Foo Bar Journal", "#REDIRECT[[Pred Publisher]]\n");
        let mut editor = editor();

        let check = reconcile_redirect(
            &mut wiki,
            &mut editor,
            &RedirectVariant::new("Foo Bar Journal", RedirectKind::Plain),
            &target(),
            false,
        )
        .expect("reconcile");

        assert_eq!(check.disposition, RedirectDisposition::Fix);
        assert_eq!(wiki.text("Talk:Foo Bar Journal"), Some("{{WPJournals}}"));
        let talk_write = wiki
            .writes
            .iter()
            .find(|write| write.title == "Talk:Foo Bar Journal")
            .expect("talk write");
        assert_eq!(talk_write.summary, FIX_SUMMARY);
        assert_eq!(talk_write.options.mode, SaveMode::CreateOnly);
        assert_eq!(
            check.edits.last(),
            Some(&EditRecord {
                title: "Talk:Foo Bar Journal".to_string(),
                kind: EditKind::Talk,
                saved: true,
            })
        );
        assert_eq!(editor.budget().remaining(EditKind::Talk), Ok(14));
        assert_eq!(editor.budget().remaining(EditKind::Fix), Ok(14));
    }

    #[test]
    fn colliding_abbreviation_settles_after_one_run() {
        let mut wiki = FakeWiki::default();
        let mut oracle = FakeOracle::default().with("J Foo", LanguageScope::Eng, "J. Foo");
        let mut editor = editor();

        process_title(&mut wiki, &mut oracle, &mut editor, "J Foo", &target())
            .expect("first run");
        assert_eq!(
            wiki.text("J Foo"),
            Some("#REDIRECT[[Pred Publisher]]\n[[Category:Pred academic journals]]\n")
        );
        assert_eq!(
            wiki.text("J. Foo"),
            Some("#REDIRECT[[Pred Publisher]]\n{{R from ISO 4}}\n")
        );
        let first_run_writes = wiki.writes.len();
        assert_eq!(first_run_writes, 4);

        let report = process_title(&mut wiki, &mut oracle, &mut editor, "J Foo", &target())
            .expect("second run");
        let TitleOutcome::Applied { checks } = report.outcome else {
            panic!("expected applied outcome");
        };
        assert!(
            checks
                .iter()
                .all(|check| check.disposition == RedirectDisposition::Done)
        );
        assert_eq!(wiki.writes.len(), first_run_writes);
    }

    #[test]
    fn extra_iso_marker_on_plain_redirect_is_fixed() {
        let mut wiki = FakeWiki::default();
        wiki.insert_page(
            "Foo",
            "#REDIRECT[[Pred Publisher]]\n{{R from ISO 4}}\n",
        );
        let mut editor = editor();

        let check = reconcile_redirect(
            &mut wiki,
            &mut editor,
            &RedirectVariant::new("Foo", RedirectKind::Plain),
            &target(),
            true,
        )
        .expect("reconcile");
        assert_eq!(check.disposition, RedirectDisposition::Fix);
        assert!(wiki.writes.is_empty());
    }

    #[test]
    fn try_only_classification_is_idempotent() {
        let mut wiki = FakeWiki::default();
        wiki.insert_page("Foo", "#REDIRECT[[Pred Publisher]]");
        let mut editor = editor();
        let variant = RedirectVariant::new("Foo", RedirectKind::Plain);

        let first = reconcile_redirect(&mut wiki, &mut editor, &variant, &target(), true)
            .expect("first");
        let second = reconcile_redirect(&mut wiki, &mut editor, &variant, &target(), true)
            .expect("second");

        assert_eq!(first, second);
        assert_eq!(first.disposition, RedirectDisposition::Fix);
        assert!(wiki.writes.is_empty());
        assert_eq!(wiki.text("Foo"), Some("#REDIRECT[[Pred Publisher]]"));
    }

    #[test]
    fn one_unfixable_variant_blocks_every_write() {
        let mut wiki = FakeWiki::default();
        wiki.insert_page("J Foo Bar", "#REDIRECT[[Somewhere Else]]");
        wiki.insert_page("Foo and Bar", "#REDIRECT[[Pred Publisher]]");
        let mut oracle =
            FakeOracle::default().with("Foo and Bar", LanguageScope::Eng, "J. Foo Bar");
        let mut editor = editor();

        let report = process_title(&mut wiki, &mut oracle, &mut editor, "Foo and Bar", &target())
            .expect("process");

        let TitleOutcome::Abandoned { conflicts } = report.outcome else {
            panic!("expected abandoned outcome");
        };
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].title, "J Foo Bar");
        assert_eq!(conflicts[0].kind, RedirectKind::Iso4);
        assert!(conflicts[0].diff().contains("-#REDIRECT[[Somewhere Else]]"));
        assert!(wiki.writes.is_empty());
        assert!(!wiki.pages.contains_key("Foo & Bar"));
    }

    #[test]
    fn existing_article_moves_redirects_to_journal_suffix() {
        let mut wiki = FakeWiki::default();
        wiki.insert_categorized("Nano Letters Review", "An article.", &["Category:Nanotechnology"]);
        let mut oracle = FakeOracle::default();
        let mut editor = editor();

        process_title(
            &mut wiki,
            &mut oracle,
            &mut editor,
            "Nano Letters Review",
            &target(),
        )
        .expect("process");

        assert_eq!(wiki.text("Nano Letters Review"), Some("An article."));
        assert!(wiki.pages.contains_key("Nano Letters Review (journal)"));
        assert!(wiki.pages.contains_key("Talk:Nano Letters Review (journal)"));
    }

    #[test]
    fn existing_journal_article_is_skipped() {
        let mut wiki = FakeWiki::default();
        wiki.insert_page("Foo Journal", "An article about a real journal.");
        wiki.insert_categorized("Bar Review", "Another article.", &["Category:Biology Journals"]);
        let mut oracle = FakeOracle::default();
        let mut editor = editor();

        let by_title = process_title(&mut wiki, &mut oracle, &mut editor, "Foo Journal", &target())
            .expect("process");
        let by_category =
            process_title(&mut wiki, &mut oracle, &mut editor, "Bar Review", &target())
                .expect("process");

        assert_eq!(
            by_title.outcome,
            TitleOutcome::Skipped {
                skip: SkipReason::TitleAlreadyJournal
            }
        );
        assert_eq!(
            by_category.outcome,
            TitleOutcome::Skipped {
                skip: SkipReason::CategoryAlreadyJournal
            }
        );
        assert!(oracle.recorded.is_empty());
        assert!(wiki.writes.is_empty());
    }

    #[test]
    fn pending_abbreviation_skips_title() {
        let mut wiki = FakeWiki::default();
        let mut oracle = FakeOracle::default().pending("Acta Foo");
        let mut editor = editor();

        let report = process_title(&mut wiki, &mut oracle, &mut editor, "Acta Foo", &target())
            .expect("process");

        assert!(matches!(
            report.outcome,
            TitleOutcome::Skipped {
                skip: SkipReason::AbbreviationNotComputed { .. }
            }
        ));
        assert_eq!(oracle.recorded, vec!["Acta Foo".to_string()]);
        assert_eq!(
            oracle.lookups,
            vec![("Acta Foo".to_string(), LanguageScope::All)]
        );
        assert!(wiki.writes.is_empty());
    }
}
