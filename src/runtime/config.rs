use crate::aggregate::clock::ReportTimezone;
use crate::aggregate::purity::DEFAULT_PURE_THRESHOLD;
use crate::sink::target::{InsertTarget, DEFAULT_TIMEOUT, DEFAULT_USER};
use anyhow::{anyhow, bail, Context, Result};
use chrono::FixedOffset;
use chrono_tz::Tz;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_URL: &str = "CLICKHOUSE_URL";
pub const ENV_USER: &str = "CLICKHOUSE_USER";
pub const ENV_PASSWORD: &str = "CLICKHOUSE_PASSWORD";
pub const ENV_DATABASE: &str = "CLICKHOUSE_DATABASE";
pub const ENV_LOGS_TABLE: &str = "CLICKHOUSE_LOGS_TABLE";
pub const ENV_TASKS_TABLE: &str = "CLICKHOUSE_TASKS_TABLE";
pub const ENV_TIMEOUT: &str = "CLICKHOUSE_TIMEOUT";
pub const ENV_PURE_THRESHOLD: &str = "CLICKHOUSE_PURE_THRESHOLD";
pub const ENV_TZ: &str = "CLICKHOUSE_TZ";
pub const ENV_OPERATOR: &str = "ANSIBLE_OPERATOR";

/// Reporter configuration.
///
/// All instances must be constructed via [`TelemetryConfig::builder`] or
/// [`TelemetryConfig::new`] so invariants are validated before any consumer
/// observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    endpoint: String,
    user: String,
    password: Option<String>,
    database: String,
    logs_table: String,
    tasks_table: Option<String>,
    timeout: Duration,
    pure_threshold: u8,
    timezone: Option<ReportTimezone>,
    operator: Option<String>,
}

pub struct TelemetryConfigParams {
    pub endpoint: String,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub logs_table: String,
    pub tasks_table: Option<String>,
    pub timeout: Duration,
    pub pure_threshold: u8,
    pub timezone: Option<ReportTimezone>,
    pub operator: Option<String>,
}

impl TelemetryConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// Strings are trimmed; an empty password, tasks table or operator counts
    /// as unset.
    pub fn new(params: TelemetryConfigParams) -> Result<Self> {
        let TelemetryConfigParams {
            endpoint,
            user,
            password,
            database,
            logs_table,
            tasks_table,
            timeout,
            pure_threshold,
            timezone,
            operator,
        } = params;

        let config = Self {
            endpoint: trimmed_string(endpoint),
            user: trimmed_string(user),
            password: non_empty(password),
            database: trimmed_string(database),
            logs_table: trimmed_string(logs_table),
            tasks_table: non_empty(tasks_table),
            timeout,
            pure_threshold,
            timezone,
            operator: non_empty(operator),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration from the `CLICKHOUSE_*` and `ANSIBLE_OPERATOR`
    /// environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TelemetryConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut builder = Self::builder();
        if let Some(endpoint) = read(ENV_URL) {
            builder = builder.endpoint(endpoint);
        }
        if let Some(user) = read(ENV_USER) {
            builder = builder.user(user);
        }
        if let Some(password) = read(ENV_PASSWORD) {
            builder = builder.password(password);
        }
        if let Some(database) = read(ENV_DATABASE) {
            builder = builder.database(database);
        }
        if let Some(table) = read(ENV_LOGS_TABLE) {
            builder = builder.logs_table(table);
        }
        if let Some(table) = read(ENV_TASKS_TABLE) {
            builder = builder.tasks_table(table);
        }
        if let Some(secs) = parse_value::<u64>(ENV_TIMEOUT, read(ENV_TIMEOUT))? {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(threshold) = parse_value::<u8>(ENV_PURE_THRESHOLD, read(ENV_PURE_THRESHOLD))? {
            builder = builder.pure_threshold(threshold);
        }
        if let Some(zone) = read(ENV_TZ) {
            let zone = parse_timezone(&zone).with_context(|| format!("invalid {ENV_TZ}"))?;
            builder = builder.timezone(zone);
        }
        if let Some(operator) = read(ENV_OPERATOR) {
            builder = builder.operator(operator);
        }

        builder.build()
    }

    /// Base URL of the store's HTTP interface.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn logs_table(&self) -> &str {
        &self.logs_table
    }

    /// Table for per-task durations; task reporting is skipped when unset.
    pub fn tasks_table(&self) -> Option<&str> {
        self.tasks_table.as_deref()
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Percentage of unchanged tasks at or above which a run is not pure.
    pub fn pure_threshold(&self) -> u8 {
        self.pure_threshold
    }

    /// Zone for report timestamps; local time when unset.
    pub fn timezone(&self) -> Option<ReportTimezone> {
        self.timezone
    }

    /// Operator name overriding whatever the host or OS reports.
    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn logs_target(&self) -> InsertTarget {
        self.target(&self.logs_table)
    }

    pub fn tasks_target(&self) -> Option<InsertTarget> {
        self.tasks_table.as_deref().map(|table| self.target(table))
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.endpoint)?;
        ensure_not_empty(&self.user, "user")?;
        ensure_identifier(&self.database, "database")?;
        ensure_identifier(&self.logs_table, "logs_table")?;
        if let Some(table) = &self.tasks_table {
            ensure_identifier(table, "tasks_table")?;
        }

        if self.timeout.is_zero() {
            bail!("timeout must be greater than 0");
        }

        if self.pure_threshold > 100 {
            bail!(
                "pure_threshold must be a percentage between 0 and 100, got {}",
                self.pure_threshold
            );
        }

        Ok(())
    }

    fn target(&self, table: &str) -> InsertTarget {
        InsertTarget::new(self.endpoint.clone(), self.database.clone(), table)
            .with_credentials(self.user.clone(), self.password.clone())
            .with_timeout(self.timeout)
    }
}

#[derive(Debug, Default, Clone)]
pub struct TelemetryConfigBuilder {
    endpoint: Option<String>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
    logs_table: Option<String>,
    tasks_table: Option<String>,
    timeout: Option<Duration>,
    pure_threshold: Option<u8>,
    timezone: Option<ReportTimezone>,
    operator: Option<String>,
}

impl TelemetryConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn logs_table(mut self, table: impl Into<String>) -> Self {
        self.logs_table = Some(table.into());
        self
    }

    pub fn tasks_table(mut self, table: impl Into<String>) -> Self {
        self.tasks_table = Some(table.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn pure_threshold(mut self, percent: u8) -> Self {
        self.pure_threshold = Some(percent);
        self
    }

    /// Accepts a [`chrono_tz::Tz`] or a [`FixedOffset`].
    pub fn timezone(mut self, zone: impl Into<ReportTimezone>) -> Self {
        self.timezone = Some(zone.into());
        self
    }

    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn build(self) -> Result<TelemetryConfig> {
        let params = TelemetryConfigParams {
            endpoint: self.endpoint.context("endpoint is required")?,
            user: self.user.unwrap_or_else(|| DEFAULT_USER.to_owned()),
            password: self.password,
            database: self.database.context("database is required")?,
            logs_table: self.logs_table.context("logs_table is required")?,
            tasks_table: self.tasks_table,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            pure_threshold: self.pure_threshold.unwrap_or(DEFAULT_PURE_THRESHOLD),
            timezone: self.timezone,
            operator: self.operator,
        };

        TelemetryConfig::new(params)
    }
}

/// Parses an IANA zone name such as `Europe/Moscow`, or a UTC offset such as
/// `+03:00`, `-0530` or `Z`.
pub fn parse_timezone(value: &str) -> Result<ReportTimezone> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        let utc = FixedOffset::east_opt(0).context("zero offset out of range")?;
        return Ok(ReportTimezone::Fixed(utc));
    }
    if value.starts_with(|ch: char| ch == '+' || ch == '-') {
        return FixedOffset::from_str(value)
            .map(ReportTimezone::Fixed)
            .map_err(|err| anyhow!("expected a UTC offset like +03:00, got {value:?}: {err}"));
    }
    value.parse::<Tz>().map(ReportTimezone::Named).map_err(|err| {
        anyhow!("expected a zone name like Europe/Moscow or an offset like +03:00, got {value:?}: {err}")
    })
}

fn parse_value<T>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow!("invalid value for {key}: {err}")),
        None => Ok(None),
    }
}

fn trimmed_string(value: String) -> String {
    value.trim().to_owned()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(trimmed_string)
        .filter(|value| !value.is_empty())
}

fn ensure_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}

// Database and table names are spliced into the INSERT statement verbatim.
fn ensure_identifier(value: &str, field: &str) -> Result<()> {
    ensure_not_empty(value, field)?;
    if !value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        bail!("{field} may only contain ASCII letters, digits and underscores, got {value:?}");
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("endpoint must start with http:// or https://");
    }
    Ok(())
}
