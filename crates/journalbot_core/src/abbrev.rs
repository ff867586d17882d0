use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

const ABBREV_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS recorded_titles (
    title TEXT PRIMARY KEY,
    recorded_at_unix INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS abbreviations (
    title TEXT NOT NULL,
    scope TEXT NOT NULL,
    abbreviation TEXT NOT NULL,
    PRIMARY KEY (title, scope)
);
"#;

const UPSERT_ABBREVIATION_SQL: &str = "INSERT INTO abbreviations (title, scope, abbreviation) \
     VALUES (?1, ?2, ?3) \
     ON CONFLICT(title, scope) DO UPDATE SET abbreviation = excluded.abbreviation";

/// Which LTWA word list the ISO-4 abbreviation was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageScope {
    Eng,
    All,
}

impl LanguageScope {
    /// Latin "Acta ..." titles need the multilingual list.
    pub fn for_title(title: &str) -> Self {
        if title.to_lowercase().contains("acta") {
            Self::All
        } else {
            Self::Eng
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eng => "eng",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "eng" => Some(Self::Eng),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for LanguageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbbrevLookup {
    Ready(String),
    /// The abbreviation must be computed out-of-band before the title can be processed.
    NotComputedYet { message: String },
}

pub trait AbbreviationOracle {
    /// Remember a raw title so its abbreviation can be computed later.
    fn record_title(&mut self, title: &str) -> Result<()>;
    fn abbreviation(&mut self, title: &str, scope: LanguageScope) -> Result<AbbrevLookup>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PendingTitle {
    pub title: String,
    pub scope: LanguageScope,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub ignored_lines: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub recorded_titles: usize,
    pub abbreviations: usize,
    pub pending: usize,
}

/// SQLite-backed abbreviation store. Writes are committed immediately.
pub struct AbbrevCache {
    connection: Connection,
}

impl AbbrevCache {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        connection
            .busy_timeout(Duration::from_secs(5))
            .context("failed to set sqlite busy timeout")?;
        Self::initialize(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory sqlite database")?;
        Self::initialize(connection)
    }

    fn initialize(connection: Connection) -> Result<Self> {
        connection
            .execute_batch(ABBREV_SCHEMA_SQL)
            .context("failed to initialize abbreviation schema")?;
        Ok(Self { connection })
    }

    #[cfg(test)]
    fn store(&mut self, title: &str, scope: LanguageScope, abbreviation: &str) -> Result<()> {
        self.connection
            .execute(
                UPSERT_ABBREVIATION_SQL,
                params![title, scope.as_str(), abbreviation],
            )
            .with_context(|| format!("failed to store abbreviation for {title}"))?;
        Ok(())
    }

    /// Recorded titles still missing an abbreviation for their lookup scope.
    pub fn pending_titles(&self) -> Result<Vec<PendingTitle>> {
        let mut statement = self
            .connection
            .prepare(
                "SELECT r.title, a.scope FROM recorded_titles r
                 LEFT JOIN abbreviations a ON a.title = r.title
                 ORDER BY r.title",
            )
            .context("failed to prepare pending title query")?;
        let rows = statement
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .context("failed to query pending titles")?;

        let mut pending: Vec<PendingTitle> = Vec::new();
        let mut last_title: Option<String> = None;
        let mut satisfied = false;
        for row in rows {
            let (title, stored_scope) = row.context("failed to decode pending title row")?;
            if last_title.as_deref() != Some(title.as_str()) {
                if let Some(previous) = last_title.take()
                    && !satisfied
                {
                    pending.push(PendingTitle {
                        scope: LanguageScope::for_title(&previous),
                        title: previous,
                    });
                }
                last_title = Some(title.clone());
                satisfied = false;
            }
            let wanted = LanguageScope::for_title(&title);
            if stored_scope.as_deref().and_then(LanguageScope::parse) == Some(wanted) {
                satisfied = true;
            }
        }
        if let Some(previous) = last_title
            && !satisfied
        {
            pending.push(PendingTitle {
                scope: LanguageScope::for_title(&previous),
                title: previous,
            });
        }
        Ok(pending)
    }

    /// Load `title<TAB>scope<TAB>abbreviation` lines produced by the offline ISO-4 tool.
    pub fn import_tsv(&mut self, path: &Path) -> Result<ImportReport> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.import_str(&content)
            .with_context(|| format!("failed to import {}", path.display()))
    }

    pub fn import_str(&mut self, content: &str) -> Result<ImportReport> {
        let mut rows = Vec::new();
        let mut ignored_lines = 0usize;
        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                ignored_lines += 1;
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 3 {
                bail!(
                    "line {line_no}: expected 3 tab-separated fields, found {}",
                    fields.len()
                );
            }
            let title = fields[0].trim();
            let abbreviation = fields[2].trim();
            let scope = LanguageScope::parse(fields[1])
                .ok_or_else(|| anyhow::anyhow!("line {line_no}: unknown scope {:?}", fields[1]))?;
            if title.is_empty() || abbreviation.is_empty() {
                bail!("line {line_no}: title and abbreviation must be non-empty");
            }
            rows.push((title.to_string(), scope, abbreviation.to_string()));
        }

        let transaction = self
            .connection
            .transaction()
            .context("failed to start import transaction")?;
        for (title, scope, abbreviation) in &rows {
            transaction
                .execute(
                    UPSERT_ABBREVIATION_SQL,
                    params![title, scope.as_str(), abbreviation],
                )
                .with_context(|| format!("failed to import abbreviation for {title}"))?;
        }
        transaction
            .commit()
            .context("failed to commit import transaction")?;

        Ok(ImportReport {
            imported: rows.len(),
            ignored_lines,
        })
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let recorded_titles = count_rows(&self.connection, "recorded_titles")?;
        let abbreviations = count_rows(&self.connection, "abbreviations")?;
        let pending = self.pending_titles()?.len();
        Ok(CacheStats {
            recorded_titles,
            abbreviations,
            pending,
        })
    }
}

impl AbbreviationOracle for AbbrevCache {
    fn record_title(&mut self, title: &str) -> Result<()> {
        self.connection
            .execute(
                "INSERT OR IGNORE INTO recorded_titles (title, recorded_at_unix) VALUES (?1, ?2)",
                params![title, unix_timestamp()?],
            )
            .with_context(|| format!("failed to record title {title}"))?;
        Ok(())
    }

    fn abbreviation(&mut self, title: &str, scope: LanguageScope) -> Result<AbbrevLookup> {
        let stored: Option<String> = self
            .connection
            .query_row(
                "SELECT abbreviation FROM abbreviations WHERE title = ?1 AND scope = ?2",
                params![title, scope.as_str()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to look up abbreviation for {title}"))?;
        Ok(match stored {
            Some(abbreviation) => AbbrevLookup::Ready(abbreviation),
            None => AbbrevLookup::NotComputedYet {
                message: format!(
                    "Abbreviation of [[{title}]] (scope={scope}) is not computed yet; \
                     export it with `journalbot abbrev pending`, compute it and run \
                     `journalbot abbrev import` before retrying."
                ),
            },
        })
    }
}

fn count_rows(connection: &Connection, table_name: &str) -> Result<usize> {
    let count: i64 = connection
        .query_row(&format!("SELECT COUNT(*) FROM {table_name}"), [], |row| {
            row.get(0)
        })
        .with_context(|| format!("failed to count rows in {table_name}"))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn unix_timestamp() -> Result<i64> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before UNIX_EPOCH")?
        .as_secs();
    Ok(i64::try_from(seconds).unwrap_or(i64::MAX))
}
