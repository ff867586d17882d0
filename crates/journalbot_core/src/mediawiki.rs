use std::collections::BTreeMap;
use std::env;
use std::thread::sleep;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::BotConfig;
use crate::gateway::{PageGateway, SaveMode, SaveOptions};

#[derive(Debug, Clone)]
pub struct MediaWikiClientConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub rate_limit_read_ms: u64,
    pub rate_limit_write_ms: u64,
    pub max_retries: usize,
    pub max_write_retries: usize,
    pub retry_delay_ms: u64,
}

impl MediaWikiClientConfig {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            api_url: config.api_url(),
            user_agent: config.user_agent(),
            timeout_ms: env_value_u64("WIKI_HTTP_TIMEOUT_MS", 30_000),
            rate_limit_read_ms: env_value_u64("WIKI_RATE_LIMIT_READ", 300),
            rate_limit_write_ms: env_value_u64("WIKI_RATE_LIMIT_WRITE", 1_000),
            max_retries: env_value_usize("WIKI_HTTP_RETRIES", 2),
            max_write_retries: env_value_usize("WIKI_HTTP_WRITE_RETRIES", 1),
            retry_delay_ms: env_value_u64("WIKI_HTTP_RETRY_DELAY_MS", 500),
        }
    }
}

/// What one query tells us about a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub exists: bool,
    pub redirect: bool,
    pub text: String,
    pub categories: Vec<String>,
}

pub struct MediaWikiClient {
    client: Client,
    config: MediaWikiClientConfig,
    last_request_at: Option<Instant>,
    request_count: usize,
    csrf_token: Option<String>,
    snapshots: BTreeMap<String, PageSnapshot>,
}

impl MediaWikiClient {
    pub fn new(config: MediaWikiClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .cookie_store(true)
            .build()
            .context("failed to build MediaWiki HTTP client")?;

        Ok(Self {
            client,
            config,
            last_request_at: None,
            request_count: 0,
            csrf_token: None,
            snapshots: BTreeMap::new(),
        })
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let token_response = self.request_json_get(&[
            ("action", "query".to_string()),
            ("meta", "tokens".to_string()),
            ("type", "login".to_string()),
        ])?;
        let token_payload: TokenQueryResponse = serde_json::from_value(token_response)
            .context("failed to decode login token response")?;
        let login_token = token_payload
            .query
            .tokens
            .and_then(|tokens| tokens.logintoken)
            .ok_or_else(|| anyhow::anyhow!("failed to get MediaWiki login token"))?;

        let login_response = self.request_json_post(
            &[
                ("action", "login".to_string()),
                ("lgname", username.to_string()),
                ("lgpassword", password.to_string()),
                ("lgtoken", login_token),
            ],
            true,
        )?;
        let login_payload: LoginResponse =
            serde_json::from_value(login_response).context("failed to decode login response")?;
        match login_payload.login.result.as_deref() {
            Some("Success") => {
                self.csrf_token = None;
                Ok(())
            }
            other => bail!(
                "MediaWiki login failed: {}",
                login_payload
                    .login
                    .reason
                    .or_else(|| other.map(ToString::to_string))
                    .unwrap_or_else(|| "unknown error".to_string())
            ),
        }
    }

    /// Fetch (or reuse) existence, redirect flag, text and categories of a page.
    pub fn snapshot(&mut self, title: &str) -> Result<PageSnapshot> {
        if let Some(snapshot) = self.snapshots.get(title) {
            return Ok(snapshot.clone());
        }
        let response = self.request_json_get(&[
            ("action", "query".to_string()),
            ("titles", title.to_string()),
            ("prop", "info|revisions|categories".to_string()),
            ("rvprop", "content".to_string()),
            ("rvslots", "main".to_string()),
            ("cllimit", "max".to_string()),
        ])?;
        let parsed: QueryResponse = serde_json::from_value(response)
            .with_context(|| format!("failed to decode page query for {title}"))?;
        let snapshot = parsed
            .query
            .pages
            .into_iter()
            .next()
            .map(snapshot_from_item)
            .unwrap_or_default();
        self.snapshots.insert(title.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    fn request_json_get(&mut self, params: &[(&str, String)]) -> Result<Value> {
        let base_url = Url::parse(&self.config.api_url)
            .with_context(|| format!("invalid WIKI_API_URL: {}", self.config.api_url))?;
        let pairs = request_pairs(params);
        self.send_with_retries(false, |client| client.get(base_url.clone()).query(&pairs))
    }

    fn request_json_post(&mut self, params: &[(&str, String)], is_write: bool) -> Result<Value> {
        let api_url = self.config.api_url.clone();
        let pairs = request_pairs(params);
        self.send_with_retries(is_write, |client| client.post(api_url.as_str()).form(&pairs))
    }

    /// Send the request built by `build`, retrying transient failures. Writes
    /// get their own retry count and a longer backoff.
    fn send_with_retries<F>(&mut self, is_write: bool, build: F) -> Result<Value>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let max_retries = if is_write {
            self.config.max_write_retries
        } else {
            self.config.max_retries
        };
        let client = self.client.clone();

        for attempt in 0..=max_retries {
            self.apply_rate_limit(is_write);
            let response = build(&client)
                .header("User-Agent", self.config.user_agent.as_str())
                .send();
            let retry = match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let payload: Value = response
                            .json()
                            .context("failed to decode MediaWiki API JSON response")?;
                        return check_api_error(payload);
                    }
                    if attempt == max_retries || !is_retryable_status(status) {
                        bail!("MediaWiki API request failed with HTTP {status}");
                    }
                    status.to_string()
                }
                Err(error) => {
                    if attempt == max_retries || !is_retryable_error(&error) {
                        return Err(error).context("failed to call MediaWiki API");
                    }
                    error.to_string()
                }
            };
            self.wait_before_retry(attempt, is_write, &retry);
        }

        bail!("MediaWiki API request exhausted retry budget")
    }

    fn apply_rate_limit(&mut self, is_write: bool) {
        let delay = if is_write {
            Duration::from_millis(self.config.rate_limit_write_ms)
        } else {
            Duration::from_millis(self.config.rate_limit_read_ms)
        };
        if let Some(last) = self.last_request_at {
            let elapsed = last.elapsed();
            if elapsed < delay {
                sleep(delay - elapsed);
            }
        }
        self.last_request_at = Some(Instant::now());
        self.request_count += 1;
    }

    fn wait_before_retry(&self, attempt: usize, is_write: bool, cause: &str) {
        let exponent = u32::try_from(attempt).unwrap_or(16);
        let base = self
            .config
            .retry_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent));
        let jitter = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| u64::from(duration.subsec_millis() % 100))
            .unwrap_or(0);
        let multiplier = if is_write { 2u64 } else { 1u64 };
        let delay = base.saturating_mul(multiplier).saturating_add(jitter);
        debug!(
            "retrying MediaWiki request in {delay} ms after {cause} (attempt {})",
            attempt + 1
        );
        sleep(Duration::from_millis(delay));
    }

    fn ensure_csrf_token(&mut self) -> Result<String> {
        if let Some(token) = &self.csrf_token {
            return Ok(token.clone());
        }
        let response = self.request_json_get(&[
            ("action", "query".to_string()),
            ("meta", "tokens".to_string()),
        ])?;
        let parsed: TokenQueryResponse =
            serde_json::from_value(response).context("failed to decode csrf token response")?;
        let token = parsed
            .query
            .tokens
            .and_then(|tokens| tokens.csrftoken)
            .ok_or_else(|| anyhow::anyhow!("failed to get MediaWiki csrf token"))?;
        self.csrf_token = Some(token.clone());
        Ok(token)
    }
}

impl PageGateway for MediaWikiClient {
    fn exists(&mut self, title: &str) -> Result<bool> {
        Ok(self.snapshot(title)?.exists)
    }

    fn is_redirect(&mut self, title: &str) -> Result<bool> {
        Ok(self.snapshot(title)?.redirect)
    }

    fn categories(&mut self, title: &str) -> Result<Vec<String>> {
        Ok(self.snapshot(title)?.categories)
    }

    fn read_text(&mut self, title: &str) -> Result<String> {
        Ok(self.snapshot(title)?.text)
    }

    fn write_page(
        &mut self,
        title: &str,
        content: &str,
        summary: &str,
        options: &SaveOptions,
    ) -> Result<()> {
        let token = self.ensure_csrf_token()?;
        self.snapshots.remove(title);
        let params = edit_params(title, content, summary, options, token);
        let response = self.request_json_post(&params, true)?;
        let edit_payload: EditResponse =
            serde_json::from_value(response).context("failed to decode edit response")?;
        let edit = edit_payload
            .edit
            .ok_or_else(|| anyhow::anyhow!("missing edit payload in API response"))?;
        if edit.result.as_deref() != Some("Success") {
            bail!(
                "MediaWiki edit failed for {}: {}",
                title,
                edit.result.unwrap_or_else(|| "unknown".to_string())
            );
        }
        Ok(())
    }

    fn forget_cached_pages(&mut self) {
        self.snapshots.clear();
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

fn edit_params(
    title: &str,
    content: &str,
    summary: &str,
    options: &SaveOptions,
    token: String,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("action", "edit".to_string()),
        ("title", title.to_string()),
        ("text", content.to_string()),
        ("summary", summary.to_string()),
        ("watchlist", "nochange".to_string()),
    ];
    match options.mode {
        SaveMode::CreateOnly => params.push(("createonly", "1".to_string())),
        SaveMode::OverwriteOnly => params.push(("nocreate", "1".to_string())),
    }
    if options.bot {
        params.push(("bot", "1".to_string()));
    }
    if options.minor {
        params.push(("minor", "1".to_string()));
    } else {
        params.push(("notminor", "1".to_string()));
    }
    if let Some(tags) = &options.tags {
        params.push(("tags", tags.clone()));
    }
    params.push(("token", token));
    params
}

fn request_pairs(params: &[(&str, String)]) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len() + 2);
    pairs.push(("format".to_string(), "json".to_string()));
    pairs.push(("formatversion".to_string(), "2".to_string()));
    for (key, value) in params {
        if !value.is_empty() {
            pairs.push(((*key).to_string(), value.clone()));
        }
    }
    pairs
}

fn check_api_error(payload: Value) -> Result<Value> {
    if let Some(error) = payload.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        let info = error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("unknown info");
        bail!("MediaWiki API error [{code}]: {info}");
    }
    Ok(payload)
}

fn snapshot_from_item(item: PageQueryItem) -> PageSnapshot {
    if item.missing.unwrap_or(false) || item.invalid.unwrap_or(false) {
        return PageSnapshot::default();
    }
    let text = item
        .revisions
        .into_iter()
        .next()
        .and_then(|revision| revision.slots)
        .and_then(|slots| slots.main)
        .map(|slot| slot.content)
        .unwrap_or_default();
    PageSnapshot {
        exists: true,
        redirect: item.redirect.unwrap_or(false),
        text,
        categories: item
            .categories
            .into_iter()
            .map(|category| category.title)
            .collect(),
    }
}

fn env_value_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_value_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

#[derive(Debug, Deserialize, Default)]
struct QueryResponse {
    #[serde(default)]
    query: QueryPayload,
}

#[derive(Debug, Deserialize, Default)]
struct QueryPayload {
    #[serde(default)]
    pages: Vec<PageQueryItem>,
}

#[derive(Debug, Deserialize)]
struct PageQueryItem {
    missing: Option<bool>,
    invalid: Option<bool>,
    redirect: Option<bool>,
    #[serde(default)]
    revisions: Vec<RevisionQueryItem>,
    #[serde(default)]
    categories: Vec<CategoryQueryItem>,
}

#[derive(Debug, Deserialize)]
struct RevisionQueryItem {
    slots: Option<RevisionSlotContainer>,
}

#[derive(Debug, Deserialize)]
struct RevisionSlotContainer {
    main: Option<RevisionMainSlot>,
}

#[derive(Debug, Deserialize)]
struct RevisionMainSlot {
    content: String,
}

#[derive(Debug, Deserialize)]
struct CategoryQueryItem {
    title: String,
}

#[derive(Debug, Deserialize, Default)]
struct TokenQueryResponse {
    #[serde(default)]
    query: TokenQueryPayload,
}

#[derive(Debug, Deserialize, Default)]
struct TokenQueryPayload {
    tokens: Option<TokenPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct TokenPayload {
    logintoken: Option<String>,
    csrftoken: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LoginResponse {
    #[serde(default)]
    login: LoginPayload,
}

#[derive(Debug, Deserialize, Default)]
struct LoginPayload {
    result: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct EditResponse {
    edit: Option<EditPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct EditPayload {
    result: Option<String>,
}
