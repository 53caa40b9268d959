//! Operator configuration.
//!
//! Everything an operator may want to tune without a rebuild lives here: poll
//! pacing, fetch behaviour, the classifier's indicator lists and thresholds, and
//! notifier wiring. Loaded from TOML; every section falls back to defaults.

use crate::error::*;
use crate::tools::fetch::FetchProfile;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bumped whenever the default indicator lists change meaningfully.
pub const INDICATORS_VERSION: u32 = 1;

/// Overrides `notify.token` when set.
pub const LINE_TOKEN_ENV: &str = "ROOMWATCH_LINE_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub fetch: FetchConfig,
    pub classifier: ClassifierConfig,
    pub target: Option<TargetConfig>,
    pub notify: NotifyConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub poll_interval_secs: u64,
    /// Pause between two requests of the same cycle.
    pub request_delay_secs: u64,
    pub max_background_checks: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 1800,
            request_delay_secs: 10,
            max_background_checks: 4,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub resolve_timeout_secs: u64,
    pub resolve_short_urls: bool,
    pub pre_request_delay_ms: u64,
    pub jitter_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub profile: FetchProfile,
    pub accept_language: String,
    /// Fixed Referer; the target's origin is used when unset.
    pub referer: Option<String>,
    pub search: SearchConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            resolve_timeout_secs: 10,
            resolve_short_urls: true,
            pre_request_delay_ms: 3_000,
            jitter_ms: 1_000,
            max_retries: 2,
            backoff_base_ms: 2_000,
            backoff_max_ms: 30_000,
            profile: FetchProfile::default(),
            accept_language: "ja,en-US;q=0.9,en;q=0.8,zh-TW;q=0.7".into(),
            referer: None,
            search: SearchConfig::default(),
        }
    }
}

/// How dates and guests are spelled in the target's query string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub checkin_param: String,
    pub checkout_param: String,
    pub occupancy_param: String,
    /// chrono format string, e.g. `%Y-%m-%d` or `%Y%m%d`.
    pub date_format: String,
    pub extra: BTreeMap<String, String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            checkin_param: "checkin".into(),
            checkout_param: "checkout".into(),
            occupancy_param: "adults".into(),
            date_format: crate::types::DATE_FORMAT.into(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub version: u32,
    pub min_content_len: usize,
    pub substantial_content_len: usize,
    pub negative_indicators: Vec<String>,
    pub positive_indicators: Vec<String>,
    pub booking_selectors: Vec<String>,
    pub booking_words: Vec<String>,
    pub table_selectors: Vec<String>,
    pub currency_markers: Vec<String>,
    pub title_keywords: Vec<String>,
    pub error_keywords: Vec<String>,
    pub challenge_markers: Vec<String>,
    pub fallback_positive: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            version: INDICATORS_VERSION,
            min_content_len: 100,
            substantial_content_len: 1_000,
            negative_indicators: strings(&[
                "sold out",
                "no rooms available",
                "no availability",
                "not available",
                "unavailable",
                "fully booked",
                "no vacancy",
                "no plans available",
                "満室",
                "空室なし",
                "予約できません",
                "受付終了",
                "販売終了",
                "該当するプランがありません",
                "ご指定の条件に該当する",
                "已售完",
                "已售罄",
                "客滿",
                "無空房",
                "没有空房",
            ]),
            positive_indicators: strings(&[
                "book now",
                "reserve now",
                "select room",
                "select your room",
                "rooms available",
                "available",
                "予約する",
                "空室あり",
                "残りわずか",
                "立即預訂",
                "立即预订",
                "有空房",
            ]),
            booking_selectors: strings(&[
                "a.c-button-reservation",
                ".c-button-reservation",
                ".btn-reserve",
                ".book-now",
                ".reserve-button",
                "button[name='reserve']",
                "a[href*='/reserve']",
                "a[href*='/booking/']",
            ]),
            booking_words: strings(&["book", "reserve", "予約", "預訂", "预订", "訂房"]),
            table_selectors: strings(&[
                "table",
                "[class*='room']",
                "[class*='availability']",
                "[class*='plan']",
            ]),
            currency_markers: strings(&[
                "¥", "$", "€", "£", "円", "jpy", "usd", "eur", "twd", "nt$", "元",
            ]),
            title_keywords: strings(&[
                "hotel",
                "room",
                "booking",
                "reservation",
                "inn",
                "resort",
                "ホテル",
                "旅館",
                "予約",
                "宿",
                "プラン",
                "飯店",
                "酒店",
                "訂房",
            ]),
            error_keywords: strings(&[
                "error",
                "404",
                "500",
                "not found",
                "access denied",
                "forbidden",
                "unavailable",
                "maintenance",
                "captcha",
                "エラー",
                "メンテナンス",
                "錯誤",
            ]),
            challenge_markers: strings(&[
                "verify you are a human",
                "please complete the captcha",
                "cf-browser-verification",
                "cf-captcha-container",
                "px-captcha",
                "please enable javascript and cookies",
            ]),
            fallback_positive: true,
        }
    }
}

/// Default hotel page for chat commands that omit a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub room_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Log,
    Webhook,
    Line,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub kind: NotifierKind,
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::Log,
            url: None,
            token: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file holding monitoring requests.
    pub path: Option<PathBuf>,
    pub activity_log: Option<PathBuf>,
}

impl Config {
    /// Load from `path`, or from the platform config dir when `None`.
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        cfg.override_token(std::env::var(LINE_TOKEN_ENV).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Secrets stay out of the config file when passed through the environment.
    pub fn override_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.notify.token = Some(token);
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            RoomwatchError::config_error(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.poll_interval_secs == 0 {
            return Err(RoomwatchError::config_error(
                "scheduler.poll_interval_secs must be positive",
            ));
        }
        if self.scheduler.max_background_checks == 0 {
            return Err(RoomwatchError::config_error(
                "scheduler.max_background_checks must be positive",
            ));
        }
        let c = &self.classifier;
        if c.min_content_len > c.substantial_content_len {
            return Err(RoomwatchError::config_error(
                "classifier.min_content_len exceeds substantial_content_len",
            ));
        }
        for sel in c.booking_selectors.iter().chain(&c.table_selectors) {
            if scraper::Selector::parse(sel).is_err() {
                return Err(RoomwatchError::config_error(format!(
                    "invalid css selector: {sel}"
                )));
            }
        }
        if !crate::tools::fetch::is_valid_date_format(&self.fetch.search.date_format) {
            return Err(RoomwatchError::config_error(format!(
                "invalid fetch.search.date_format: {:?}",
                self.fetch.search.date_format
            )));
        }
        if let Some(t) = &self.target {
            crate::types::Target::new(&t.url)?;
        }
        match self.notify.kind {
            NotifierKind::Webhook if self.notify.url.is_none() => Err(
                RoomwatchError::config_error("notify.url is required for the webhook notifier"),
            ),
            NotifierKind::Line if self.notify.token.is_none() => Err(
                RoomwatchError::config_error("notify.token is required for the line notifier"),
            ),
            _ => Ok(()),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "roomwatch", "roomwatch")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|p| p.config_dir().join("config.toml"))
}

pub fn default_store_path() -> Result<PathBuf> {
    let proj = project_dirs().ok_or_else(|| {
        RoomwatchError::storage_error("initialization", "could not resolve data dir")
    })?;
    Ok(proj.data_local_dir().join("requests.json"))
}
