//! Where a batch of rows goes: endpoint, credentials, database and table,
//! plus the URL and `INSERT` statement derived from them.

use crate::sink::client::SinkError;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_USER: &str = "default";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Destination of one insert. Credentials travel as URL query parameters and
/// are redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct InsertTarget {
    endpoint: String,
    database: String,
    table: String,
    user: String,
    password: Option<String>,
    timeout: Duration,
}

impl InsertTarget {
    /// Target using the `default` user, no password and the default timeout.
    pub fn new(
        endpoint: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            database: database.into(),
            table: table.into(),
            user: DEFAULT_USER.to_owned(),
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the store user. An empty password is treated as none.
    pub fn with_credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.user = user.into();
        self.password = password.filter(|password| !password.is_empty());
        self
    }

    /// Bounds the whole request, connection included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL of the store's HTTP interface.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Database holding [`InsertTarget::table`].
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Table receiving the rows.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Store user sent as the `user` query parameter.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `database.table`, as used in the insert statement.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    /// `{endpoint}/?user=..[&password=..]` with query values percent-encoded.
    pub fn url(&self) -> Result<Url, SinkError> {
        let base = format!("{}/", self.endpoint.trim_end_matches('/'));
        let mut url = Url::parse(&base).map_err(|err| SinkError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: err.to_string(),
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("user", &self.user);
            if let Some(password) = &self.password {
                query.append_pair("password", password);
            }
        }
        Ok(url)
    }

    pub fn insert_statement(&self, rows: &str) -> String {
        format!(
            "INSERT INTO {} FORMAT JSONEachRow {rows}",
            self.qualified_table()
        )
    }
}

impl fmt::Debug for InsertTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertTarget")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("table", &self.table)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
