/// Metadata describing one automation run, captured at run start.
///
/// Every field is optional from the host's point of view; missing values are
/// reported as `unknown` (or `all` for the host limit) rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    /// Path of the playbook file as given to the host.
    pub playbook: Option<String>,
    /// `true` when the host runs in dry-run (check) mode.
    pub check_mode: bool,
    pub tags: Vec<String>,
    pub skip_tags: Vec<String>,
    /// Host-limit expression; `None` means every inventory host.
    pub limit: Option<String>,
    /// Inventory source paths.
    pub inventory: Vec<String>,
    pub extra_vars: Vec<String>,
    pub connection: Option<String>,
    pub forks: u32,
    pub operator: Option<String>,
    pub hostname: Option<String>,
    pub branch: Option<String>,
}

impl RunContext {
    pub fn limit_expression(&self) -> &str {
        match self.limit.as_deref() {
            Some(limit) if !limit.trim().is_empty() => limit,
            _ => "all",
        }
    }
}
