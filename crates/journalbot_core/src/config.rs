use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = "journalbot/0.1";
pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_EDIT_LIMIT: usize = 15;
pub const DEFAULT_HATNOTE_PUBLISHER: &str = "OMICS Publishing Group";
pub const BOT_TRIAL_TAG: &str = "bot trial";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct BotConfig {
    #[serde(default)]
    pub wiki: WikiSection,
    #[serde(default)]
    pub bot: BotSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub hatnote: HatnoteSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiSection {
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BotSection {
    /// Only report what would be edited.
    pub simulate: bool,
    /// Tag every edit as a bot trial.
    pub bot_trial: bool,
    pub summary_prefix: String,
    pub summary_suffix: String,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            simulate: false,
            bot_trial: true,
            summary_prefix: String::new(),
            summary_suffix: String::new(),
        }
    }
}

/// Maximum number of edits per run, by edit kind.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsSection {
    pub create: usize,
    pub talk: usize,
    pub fix: usize,
    pub hatnote: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            create: DEFAULT_EDIT_LIMIT,
            talk: DEFAULT_EDIT_LIMIT,
            fix: DEFAULT_EDIT_LIMIT,
            hatnote: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RunSection {
    pub input: Option<String>,
    pub target: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub hatnotes: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct HatnoteSection {
    pub publisher: Option<String>,
}

impl BotConfig {
    /// Resolve the wiki API URL: env WIKI_API_URL > config > DEFAULT_API_URL.
    pub fn api_url(&self) -> String {
        env_override("WIKI_API_URL")
            .or_else(|| self.wiki.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Resolve user agent: env WIKI_USER_AGENT > config > DEFAULT_USER_AGENT.
    pub fn user_agent(&self) -> String {
        env_override("WIKI_USER_AGENT")
            .or_else(|| self.wiki.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    pub fn hatnote_publisher(&self) -> &str {
        self.hatnote
            .publisher
            .as_deref()
            .unwrap_or(DEFAULT_HATNOTE_PUBLISHER)
    }

    pub fn change_tag(&self) -> Option<String> {
        self.bot.bot_trial.then(|| BOT_TRIAL_TAG.to_string())
    }
}

/// Load and parse a BotConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<BotConfig> {
    if !config_path.exists() {
        return Ok(BotConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: BotConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

pub fn render_default_config() -> String {
    format!(
        r#"[wiki]
api_url = "{DEFAULT_API_URL}"
user_agent = "{DEFAULT_USER_AGENT}"

[bot]
simulate = true
bot_trial = true
summary_prefix = ""
summary_suffix = ""

[limits]
create = {DEFAULT_EDIT_LIMIT}
talk = {DEFAULT_EDIT_LIMIT}
fix = {DEFAULT_EDIT_LIMIT}
hatnote = 0

[run]
# input = "titles.txt"
# target = "Example Publishing Group"
# category = "Example Publishing Group academic journals"
hatnotes = false

[hatnote]
publisher = "{DEFAULT_HATNOTE_PUBLISHER}"
"#
    )
}

fn env_override(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
