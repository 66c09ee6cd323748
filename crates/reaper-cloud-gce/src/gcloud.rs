//! gcloud CLI wrapper
//!
//! Wraps the gcloud CLI commands needed to list and delete Compute Engine
//! instances.

use crate::error::{GceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// gcloud CLI wrapper
#[derive(Debug, Clone)]
pub struct Gcloud {
    program: String,
}

impl Gcloud {
    pub fn new() -> Self {
        Self {
            program: "gcloud".to_string(),
        }
    }

    /// Use a specific gcloud executable instead of the one on PATH
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check that gcloud is installed and has an active account
    pub async fn check_auth(&self) -> Result<ActiveAccount> {
        let which = Command::new("which")
            .arg(&self.program)
            .kill_on_drop(true)
            .output()
            .await?;

        if !which.status.success() {
            return Err(GceError::GcloudNotFound);
        }

        let output = self
            .run_command(&[
                "auth",
                "list",
                "--filter=status:ACTIVE",
                "--format",
                "json",
            ])
            .await?;

        parse_active_account(&output)
    }

    /// Run a gcloud command and return stdout
    ///
    /// The child is killed if the returned future is dropped.
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!("Running: {} {}", self.program, args.join(" "));

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GceError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// List the instances of one zone
    pub async fn list_instances(&self, project: &str, zone: &str) -> Result<Vec<InstanceInfo>> {
        let output = self
            .run_command(&[
                "compute",
                "instances",
                "list",
                "--project",
                project,
                "--zones",
                zone,
                "--format",
                "json",
            ])
            .await?;

        parse_instances(&output)
    }

    /// Request deletion of an instance without waiting for the operation
    pub async fn delete_instance(&self, project: &str, zone: &str, name: &str) -> Result<()> {
        let result = self
            .run_command(&[
                "compute",
                "instances",
                "delete",
                name,
                "--project",
                project,
                "--zone",
                zone,
                "--quiet",
                "--async",
            ])
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(GceError::CommandFailed(stderr)) if stderr.contains("was not found") => {
                Err(GceError::InstanceNotFound(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for Gcloud {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `gcloud auth list --format json` output
fn parse_active_account(output: &str) -> Result<ActiveAccount> {
    let accounts: Vec<ActiveAccount> = if output.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(output)?
    };

    accounts
        .into_iter()
        .find(|a| a.status.eq_ignore_ascii_case("active"))
        .ok_or_else(|| GceError::AuthenticationFailed("no active credentialed account".to_string()))
}

/// Parse `gcloud compute instances list --format json` output
pub fn parse_instances(output: &str) -> Result<Vec<InstanceInfo>> {
    if output.trim().is_empty() || output.trim() == "[]" {
        return Ok(Vec::new());
    }

    let instances: Vec<InstanceInfo> = serde_json::from_str(output)?;
    Ok(instances)
}

/// Credentialed account reported by gcloud
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveAccount {
    pub account: String,
    pub status: String,
}

/// Instance information from gcloud
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo {
    pub name: String,

    /// Full zone URL, e.g. `https://www.googleapis.com/compute/v1/projects/p/zones/us-east1-b`
    pub zone: Option<String>,

    /// RFC 3339 creation time
    pub creation_timestamp: Option<String>,

    pub status: Option<String>,
}

impl InstanceInfo {
    /// Creation time, if present and well-formed
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.creation_timestamp.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Last path segment of the zone URL
    pub fn zone_name(&self) -> Option<&str> {
        self.zone.as_deref().and_then(|z| z.rsplit('/').next())
    }
}
