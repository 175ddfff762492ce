use crate::aggregate::records::EventType;
use crate::context::UNKNOWN;

const DEFAULT_TASK_NAME: &str = "gather facts";
const PLAYBOOK_EXTENSIONS: [&str; 2] = [".yaml", ".yml"];

/// Name and role of a task as reported in the tasks table.
///
/// Both parts are lower-cased so the same task reported with different
/// capitalisation collapses into one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskIdentity {
    name: String,
    role: String,
}

impl TaskIdentity {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            role: role.into().to_lowercase(),
        }
    }

    /// Builds an identity from optional host metadata.
    ///
    /// Implicit fact gathering has no task name, so a missing name maps to
    /// `gather facts`; tasks outside a role map to `unknown`.
    pub fn from_metadata(name: Option<&str>, role: Option<&str>) -> Self {
        Self::new(
            name.unwrap_or(DEFAULT_TASK_NAME),
            role.unwrap_or(UNKNOWN),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn into_parts(self) -> (String, String) {
        (self.name, self.role)
    }
}

/// Reduces a playbook path to its bare name: `plays/site.yml` becomes `site`.
pub fn playbook_name(path: Option<&str>) -> String {
    let Some(path) = path else {
        return UNKNOWN.to_owned();
    };

    let file_name = path.rsplit('/').next().unwrap_or(path);
    PLAYBOOK_EXTENSIONS
        .iter()
        .fold(file_name.to_owned(), |name, ext| name.replace(ext, ""))
}

/// Labels the inventories by the directory that holds each inventory file,
/// e.g. `inventories/prod/hosts` becomes `prod`.
///
/// Any path without a parent directory makes the whole label `unknown`.
pub fn inventory_descriptor<S: AsRef<str>>(paths: &[S]) -> String {
    let mut labels = Vec::with_capacity(paths.len());
    for path in paths {
        let segments: Vec<&str> = path.as_ref().split('/').collect();
        if segments.len() < 2 {
            return UNKNOWN.to_owned();
        }
        labels.push(segments[segments.len() - 2]);
    }
    labels.join(", ")
}

pub fn event_type(check_mode: bool) -> EventType {
    if check_mode {
        EventType::Check
    } else {
        EventType::Play
    }
}
