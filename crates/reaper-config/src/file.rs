//! The YAML configuration document

use crate::error::{ConfigError, Result};
use reaper_core::{CronSchedule, ReaperConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Every reaper the process should run, one per project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaperFile {
    #[serde(default)]
    pub reapers: Vec<ReaperConfig>,
}

impl ReaperFile {
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Check the whole document, reporting every problem at once
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        let mut uuids = HashSet::new();

        if self.reapers.is_empty() {
            problems.push("no reapers configured".to_string());
        }

        for (index, reaper) in self.reapers.iter().enumerate() {
            let label = format!("reaper #{} ({})", index + 1, reaper.label());

            match reaper.project_id.as_deref() {
                None | Some("") => problems.push(format!("{}: project_id is required", label)),
                Some(_) => {}
            }

            if let Some(uuid) = reaper.uuid.as_deref() {
                if uuid.is_empty() {
                    problems.push(format!("{}: uuid must not be empty", label));
                } else if !uuids.insert(uuid) {
                    problems.push(format!("{}: duplicate uuid {:?}", label, uuid));
                }
            }

            match reaper.schedule.as_deref() {
                None => problems.push(format!("{}: schedule is required", label)),
                Some(expr) => {
                    if let Err(e) = CronSchedule::parse(expr) {
                        problems.push(format!("{}: schedule: {}", label, e));
                    }
                }
            }

            if reaper.resources.is_empty() {
                problems.push(format!("{}: no resources configured", label));
            }

            for (position, resource) in reaper.resources.iter().enumerate() {
                let subject = format!("{} resource #{}", label, position + 1);
                if resource.zones.is_empty() {
                    problems.push(format!("{}: at least one zone is required", subject));
                }
                if let Err(e) = CronSchedule::parse(&resource.ttl) {
                    problems.push(format!("{}: ttl: {}", subject, e));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

/// Read and parse a configuration file without validating it
pub fn load_config(path: &Path) -> Result<ReaperFile> {
    let content = std::fs::read_to_string(path)?;
    let file = ReaperFile::from_yaml(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Loaded {} reapers from {}", file.reapers.len(), path.display());
    Ok(file)
}
