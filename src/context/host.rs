use crate::context::UNKNOWN;
use std::env;
use std::fs;
use std::path::Path;

const OPERATOR_ENV_VARS: [&str; 4] = ["LOGNAME", "USER", "LNAME", "USERNAME"];

/// Returns the checked-out branch of the git repository rooted at `repo_dir`.
///
/// Detached heads, missing repositories and unreadable `HEAD` files all
/// report `unknown`.
pub fn branch_name(repo_dir: &Path) -> String {
    let head = match fs::read_to_string(repo_dir.join(".git").join("HEAD")) {
        Ok(head) => head,
        Err(err) => {
            tracing::debug!(
                target: "run_telemetry::context",
                path = %repo_dir.display(),
                error = %err,
                "cannot read git HEAD"
            );
            return UNKNOWN.to_owned();
        }
    };

    head.lines()
        .filter(|line| line.starts_with("ref:"))
        .filter_map(|line| line.split_once("refs/heads/"))
        .map(|(_, branch)| branch.trim())
        .find(|branch| !branch.is_empty())
        .unwrap_or(UNKNOWN)
        .to_owned()
}

/// Hostname of the machine running the automation.
pub fn system_hostname() -> String {
    #[cfg(unix)]
    {
        if let Some(name) = nix::unistd::gethostname()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
        {
            return name;
        }
    }

    env::var("COMPUTERNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_owned())
}

/// Login name of the user who launched the run.
///
/// Checks the usual login environment variables first, then the password
/// database on unix.
pub fn current_operator() -> String {
    operator_from(|key| env::var(key).ok())
}

pub(crate) fn operator_from<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = OPERATOR_ENV_VARS
        .iter()
        .filter_map(|key| lookup(*key))
        .find(|name| !name.trim().is_empty())
    {
        return name.trim().to_owned();
    }

    #[cfg(unix)]
    {
        if let Ok(Some(user)) = nix::unistd::User::from_uid(nix::unistd::getuid()) {
            return user.name;
        }
    }

    UNKNOWN.to_owned()
}
