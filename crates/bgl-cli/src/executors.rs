//! Concrete statement executors for the `bgl` binary
//!
//! The engine is generic over [`BulkExecutor`]; the binary ships two:
//! a dry-run executor that only logs, and a `cypher-shell` subprocess
//! executor for property-graph stores that ship that client. Both keep the
//! engine free of any wire protocol.

use bgl_engine::{BulkExecutor, ExecuteError, LoadJob};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Logs each job instead of executing it.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    executed: AtomicU64,
}

impl DryRunExecutor {
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }
}

impl BulkExecutor for DryRunExecutor {
    fn execute(&self, job: &LoadJob) -> Result<(), ExecuteError> {
        self.executed.fetch_add(1, Ordering::Relaxed);
        info!(
            job = %job.describe(),
            file = %job.file.display(),
            "dry-run: would execute bulk statement"
        );
        Ok(())
    }
}

/// Executes each job through the `cypher-shell` client, one invocation per
/// transaction.
///
/// The staged file must be visible to the database server (conventionally
/// the staging dir is the server's import dir); the script passes the bare
/// file name as `$file`.
#[derive(Debug, Clone)]
pub struct CypherShellExecutor {
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl CypherShellExecutor {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: None,
            password: None,
            database: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    fn render_script(job: &LoadJob) -> String {
        let file_name = job
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| job.file.display().to_string());
        let (skip, limit) = match job.window {
            Some(window) => (window.skip, window.limit),
            // whole file: the statement's LIMIT still needs a value
            None => (0, u64::MAX >> 1),
        };

        let mut script = String::new();
        script.push_str(&format!(":param file => 'file:///{file_name}';\n"));
        script.push_str(&format!(":param skip => {skip};\n"));
        script.push_str(&format!(":param limit => {limit};\n"));
        script.push_str(&job.statement);
        script.push_str(";\n");
        script
    }

    /// Transient per the store's own error taxonomy: deadlocks, lock
    /// timeouts, and connection drops are retried; everything else is
    /// treated as a statement bug.
    fn classify(stderr: &str) -> ExecuteError {
        let transient = stderr.contains("TransientError")
            || stderr.contains("DeadlockDetected")
            || stderr.contains("Connection refused")
            || stderr.contains("connection reset");
        if transient {
            ExecuteError::Transient(first_line(stderr))
        } else {
            ExecuteError::Permanent(first_line(stderr))
        }
    }
}

impl BulkExecutor for CypherShellExecutor {
    fn execute(&self, job: &LoadJob) -> Result<(), ExecuteError> {
        let script = Self::render_script(job);
        debug!(job = %job.describe(), "running cypher-shell");

        let mut command = Command::new("cypher-shell");
        command
            .arg("-a")
            .arg(&self.address)
            .arg("--format")
            .arg("plain")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(username) = &self.username {
            command.arg("-u").arg(username);
        }
        if let Some(password) = &self.password {
            command.arg("-p").arg(password);
        }
        if let Some(database) = &self.database {
            command.arg("-d").arg(database);
        }

        let mut child = command
            .spawn()
            .map_err(|err| ExecuteError::Permanent(format!("failed to run cypher-shell: {err}")))?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(script.as_bytes())
                .map_err(|err| ExecuteError::Transient(format!("broken pipe: {err}")))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|err| ExecuteError::Transient(err.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Self::classify(&String::from_utf8_lossy(&output.stderr)))
        }
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("execution failed").to_string()
}
