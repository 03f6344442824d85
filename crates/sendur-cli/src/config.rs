// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use sendur_api::Timeouts;
use sendur_app::{
    DEFAULT_PAGE_SIZE, Density, LeadField, PAGE_SIZE_OPTIONS, SortDirection, SortState,
};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: i64 = 1;
pub const CONFIG_PATH_ENV: &str = "SENDUR_CONFIG_PATH";
pub const API_URL_ENV: &str = "SENDUR_API_URL";
const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_REQUEST_TIMEOUT: &str = "3000ms";
const DEFAULT_ABORT_TIMEOUT: &str = "6000ms";
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub table: Table,
    #[serde(default)]
    pub cache: Cache,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            table: Table::default(),
            cache: Cache::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub request_timeout: Option<String>,
    pub abort_timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Table {
    pub page_size: Option<usize>,
    pub dense: Option<bool>,
    pub sort_field: Option<String>,
    pub sort_direction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cache {
    pub backend: Option<String>,
    pub session_ttl_hours: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Lives as long as the process.
    Memory,
    /// Shared by every launch within one session id.
    File,
}

impl CacheBackend {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "memory" => Some(Self::Memory),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        let app_dir = config_root.join(sendur_store::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir)
    }

    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [api], [table], [cache], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url
            && base_url.trim().is_empty()
        {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        let request = self.request_timeout()?;
        let abort = self.abort_timeout()?;
        if request.is_zero() || abort.is_zero() {
            bail!(
                "api.request_timeout and api.abort_timeout in {} must be positive",
                path.display()
            );
        }
        if abort < request {
            bail!(
                "api.abort_timeout ({}ms) in {} must not be shorter than api.request_timeout ({}ms)",
                abort.as_millis(),
                path.display(),
                request.as_millis()
            );
        }

        if let Some(page_size) = self.table.page_size
            && !PAGE_SIZE_OPTIONS.contains(&page_size)
        {
            bail!(
                "table.page_size in {} must be one of {:?}, got {}",
                path.display(),
                PAGE_SIZE_OPTIONS,
                page_size
            );
        }

        if let Some(field) = &self.table.sort_field
            && LeadField::parse(field).is_none()
        {
            bail!(
                "table.sort_field {field:?} in {} is not a lead field; use one of businessName, phone, email, city, website, emailDraft, haveContacted",
                path.display()
            );
        }

        if let Some(direction) = &self.table.sort_direction
            && SortDirection::parse(direction).is_none()
        {
            bail!(
                "table.sort_direction {direction:?} in {} must be \"asc\" or \"desc\"",
                path.display()
            );
        }

        if let Some(backend) = &self.cache.backend
            && CacheBackend::parse(backend).is_none()
        {
            bail!(
                "cache.backend {backend:?} in {} must be \"memory\" or \"file\"",
                path.display()
            );
        }

        if let Some(ttl_hours) = self.cache.session_ttl_hours
            && ttl_hours < 0
        {
            bail!(
                "cache.session_ttl_hours in {} must be non-negative, got {}",
                path.display(),
                ttl_hours
            );
        }

        if let Some(filter) = &self.log.filter {
            EnvFilter::try_new(filter).map_err(|error| {
                anyhow!(
                    "log.filter {filter:?} in {} is not a valid filter: {error}",
                    path.display()
                )
            })?;
        }

        Ok(())
    }

    /// `[api].base_url`, then `SENDUR_API_URL`, then the local default.
    pub fn base_url(&self) -> String {
        if let Some(base_url) = &self.api.base_url {
            return base_url.trim().to_owned();
        }
        match env::var(API_URL_ENV) {
            Ok(value) if !value.trim().is_empty() => value.trim().to_owned(),
            _ => DEFAULT_BASE_URL.to_owned(),
        }
    }

    pub fn request_timeout(&self) -> Result<Duration> {
        parse_duration(
            self.api
                .request_timeout
                .as_deref()
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        )
    }

    pub fn abort_timeout(&self) -> Result<Duration> {
        parse_duration(
            self.api
                .abort_timeout
                .as_deref()
                .unwrap_or(DEFAULT_ABORT_TIMEOUT),
        )
    }

    pub fn timeouts(&self) -> Result<Timeouts> {
        Ok(Timeouts {
            request: self.request_timeout()?,
            abort: self.abort_timeout()?,
        })
    }

    pub fn page_size(&self) -> usize {
        self.table.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn density(&self) -> Density {
        if self.table.dense.unwrap_or(false) {
            Density::Dense
        } else {
            Density::Normal
        }
    }

    pub fn sort(&self) -> SortState {
        let default = SortState::default();
        let field = self
            .table
            .sort_field
            .as_deref()
            .and_then(LeadField::parse)
            .unwrap_or(default.field);
        let direction = self
            .table
            .sort_direction
            .as_deref()
            .and_then(SortDirection::parse)
            .unwrap_or(default.direction);
        SortState::new(field, direction)
    }

    pub fn cache_backend(&self) -> CacheBackend {
        self.cache
            .backend
            .as_deref()
            .and_then(CacheBackend::parse)
            .unwrap_or(CacheBackend::Memory)
    }

    pub fn session_ttl(&self) -> Duration {
        let hours = self
            .cache
            .session_ttl_hours
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS)
            .max(0);
        Duration::from_secs(hours.unsigned_abs() * 3600)
    }

    pub fn log_filter(&self) -> &str {
        self.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# sendur config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# {API_URL_ENV} is used when base_url is not set here.\nbase_url = \"{DEFAULT_BASE_URL}\"\nrequest_timeout = \"{DEFAULT_REQUEST_TIMEOUT}\"\nabort_timeout = \"{DEFAULT_ABORT_TIMEOUT}\"\n\n[table]\npage_size = {DEFAULT_PAGE_SIZE}\ndense = false\nsort_field = \"city\"\nsort_direction = \"asc\"\n\n[cache]\n# \"memory\" forgets leads on exit; \"file\" shares them across launches from one shell.\nbackend = \"memory\"\nsession_ttl_hours = {DEFAULT_SESSION_TTL_HOURS}\n\n[log]\n# RUST_LOG takes precedence.\nfilter = \"{DEFAULT_LOG_FILTER}\"\n",
            path.display(),
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 3000ms or 6s)")
}

#[cfg(test)]
mod tests {
    use super::{API_URL_ENV, CONFIG_PATH_ENV, CacheBackend, Config, parse_duration};
    use anyhow::Result;
    use sendur_app::{Density, LeadField, SortDirection, SortState};
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(API_URL_ENV);
        }
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.request_timeout()?, Duration::from_millis(3000));
        assert_eq!(config.abort_timeout()?, Duration::from_millis(6000));
        assert_eq!(config.page_size(), 25);
        assert_eq!(config.density(), Density::Normal);
        assert_eq!(config.sort(), SortState::default());
        assert_eq!(config.cache_backend(), CacheBackend::Memory);
        assert_eq!(config.session_ttl(), Duration::from_secs(12 * 3600));
        assert_eq!(config.log_filter(), "info");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url = \"http://leads\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api], [table], [cache], and [log]"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"https://admin.example/portal\"\nrequest_timeout = \"2s\"\nabort_timeout = \"1m\"\n[table]\npage_size = 10\ndense = true\nsort_field = \"businessName\"\nsort_direction = \"desc\"\n[cache]\nbackend = \"file\"\nsession_ttl_hours = 0\n[log]\nfilter = \"sendur=debug,info\"\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), "https://admin.example/portal");
        assert_eq!(config.request_timeout()?, Duration::from_secs(2));
        assert_eq!(config.abort_timeout()?, Duration::from_secs(60));
        assert_eq!(config.page_size(), 10);
        assert_eq!(config.density(), Density::Dense);
        assert_eq!(
            config.sort(),
            SortState::new(LeadField::BusinessName, SortDirection::Desc)
        );
        assert_eq!(config.cache_backend(), CacheBackend::File);
        assert_eq!(config.session_ttl(), Duration::ZERO);
        assert_eq!(config.log_filter(), "sendur=debug,info");
        Ok(())
    }

    #[test]
    fn base_url_prefers_config_over_env() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"http://from-config\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(API_URL_ENV, "http://from-env");
        }
        let config = Config::load(&path)?;
        let resolved = config.base_url();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(API_URL_ENV);
        }
        assert_eq!(resolved, "http://from-config");
        Ok(())
    }

    #[test]
    fn base_url_uses_env_when_config_is_silent() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(API_URL_ENV, "http://from-env:9090");
        }
        let config = Config::load(&path)?;
        let resolved = config.base_url();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(API_URL_ENV);
        }
        assert_eq!(resolved, "http://from-env:9090");
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("sendur/config.toml"), "got {}", path.display());
        Ok(())
    }

    #[test]
    fn timeouts_must_be_positive_and_ordered() -> Result<()> {
        let (_temp, zero) = write_config("version = 1\n[api]\nrequest_timeout = \"0ms\"\n")?;
        let error = Config::load(&zero).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));

        let (_temp, inverted) = write_config(
            "version = 1\n[api]\nrequest_timeout = \"5s\"\nabort_timeout = \"1s\"\n",
        )?;
        let error = Config::load(&inverted).expect_err("inverted timeouts should fail");
        assert!(error.to_string().contains("must not be shorter"));
        Ok(())
    }

    #[test]
    fn table_values_are_validated() -> Result<()> {
        let (_temp, size) = write_config("version = 1\n[table]\npage_size = 7\n")?;
        let error = Config::load(&size).expect_err("page size 7 should fail");
        assert!(error.to_string().contains("must be one of [5, 10, 25]"));

        let (_temp, field) = write_config("version = 1\n[table]\nsort_field = \"zip\"\n")?;
        let error = Config::load(&field).expect_err("unknown field should fail");
        assert!(error.to_string().contains("is not a lead field"));

        let (_temp, direction) =
            write_config("version = 1\n[table]\nsort_direction = \"sideways\"\n")?;
        let error = Config::load(&direction).expect_err("unknown direction should fail");
        assert!(error.to_string().contains("\"asc\" or \"desc\""));
        Ok(())
    }

    #[test]
    fn cache_values_are_validated() -> Result<()> {
        let (_temp, backend) = write_config("version = 1\n[cache]\nbackend = \"redis\"\n")?;
        let error = Config::load(&backend).expect_err("unknown backend should fail");
        assert!(error.to_string().contains("\"memory\" or \"file\""));

        let (_temp, ttl) = write_config("version = 1\n[cache]\nsession_ttl_hours = -1\n")?;
        let error = Config::load(&ttl).expect_err("negative ttl should fail");
        assert!(error.to_string().contains("must be non-negative"));
        Ok(())
    }

    #[test]
    fn empty_base_url_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"  \"\n")?;
        let error = Config::load(&path).expect_err("empty base url should fail");
        assert!(error.to_string().contains("must not be empty"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("3000ms")?, Duration::from_millis(3000));
        assert_eq!(parse_duration("6s")?, Duration::from_secs(6));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5h").is_err());
        Ok(())
    }

    #[test]
    fn example_config_loads_back_as_defaults() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        for section in ["[api]", "[table]", "[cache]", "[log]"] {
            assert!(example.contains(section), "missing {section}");
        }

        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.page_size(), 25);
        assert_eq!(config.sort(), SortState::default());
        assert_eq!(config.cache_backend(), CacheBackend::Memory);
        Ok(())
    }
}
