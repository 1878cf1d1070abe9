// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Job definitions.
//!
//! A [`JobDefinition`] is immutable once built. Every field is derived
//! from the raw key/value data, and the checksum over that data is the
//! identity used to tell two definitions with the same id apart.

use crate::expression::{ExpressionError, RequirementProgram};
use crate::id::{qualify, JobId};
use crate::rfc822::{Record, RecordOrigin};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use thiserror::Error;

/// How a job is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginKind {
    Shell,
    Resource,
    Local,
    Manual,
    UserInteract,
    UserInteractVerify,
    UserVerify,
    Attachment,
}

crate::simple_display! {
    PluginKind {
        Shell => "shell",
        Resource => "resource",
        Local => "local",
        Manual => "manual",
        UserInteract => "user-interact",
        UserInteractVerify => "user-interact-verify",
        UserVerify => "user-verify",
        Attachment => "attachment",
    }
}

impl FromStr for PluginKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "shell" => Self::Shell,
            "resource" => Self::Resource,
            "local" => Self::Local,
            "manual" => Self::Manual,
            "user-interact" => Self::UserInteract,
            "user-interact-verify" => Self::UserInteractVerify,
            "user-verify" => Self::UserVerify,
            "attachment" => Self::Attachment,
            other => return Err(other.to_string()),
        })
    }
}

impl PluginKind {
    /// Jobs that run without a human in the loop.
    pub fn is_automated(self) -> bool {
        matches!(self, Self::Shell | Self::Resource | Self::Attachment)
    }
}

/// Where a definition came from. Not part of the checksum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum JobOrigin {
    #[default]
    Unknown,
    /// Loaded from a unit file
    File(RecordOrigin),
    /// Produced by the output of a local job
    Generated { via: JobId, line_start: usize, line_end: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobDefinitionError {
    #[error("job definition has no {0} field")]
    MissingField(&'static str),

    #[error("job {id}: unknown plugin {plugin:?}")]
    UnknownPlugin { id: JobId, plugin: String },

    #[error("job {id}: invalid estimated_duration {value:?}")]
    InvalidDuration { id: JobId, value: String },

    #[error("job {id}: {source}")]
    Requirement {
        id: JobId,
        #[source]
        source: ExpressionError,
    },
}

/// Immutable definition of one job.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    id: JobId,
    partial_id: String,
    namespace: Option<String>,
    plugin: PluginKind,
    depends: BTreeSet<JobId>,
    after: BTreeSet<JobId>,
    requirement: Option<RequirementProgram>,
    estimated_duration: Option<f64>,
    raw: BTreeMap<String, String>,
    checksum: String,
    origin: JobOrigin,
}

impl PartialEq for JobDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.checksum == other.checksum
    }
}

impl Eq for JobDefinition {}

impl JobDefinition {
    pub fn builder(partial_id: impl Into<String>, plugin: PluginKind) -> JobDefinitionBuilder {
        JobDefinitionBuilder {
            partial_id: partial_id.into(),
            plugin,
            namespace: None,
            summary: None,
            command: None,
            depends: None,
            after: None,
            requires: None,
            estimated_duration: None,
            fields: BTreeMap::new(),
            origin: JobOrigin::Unknown,
        }
    }

    /// Build a definition from a parsed record. Keys with a leading
    /// underscore (translatable fields) are stored without it.
    pub fn from_record(
        record: &Record,
        namespace: Option<&str>,
        origin: JobOrigin,
    ) -> Result<Self, JobDefinitionError> {
        let raw = record
            .data
            .iter()
            .map(|(k, v)| (k.strip_prefix('_').unwrap_or(k).to_string(), v.clone()))
            .collect();
        Self::from_raw(raw, namespace, origin)
    }

    fn from_raw(
        raw: BTreeMap<String, String>,
        namespace: Option<&str>,
        origin: JobOrigin,
    ) -> Result<Self, JobDefinitionError> {
        let partial_id = raw
            .get("id")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(JobDefinitionError::MissingField("id"))?;
        let namespace = namespace.filter(|ns| !ns.is_empty());
        let id = qualify(namespace, &partial_id);

        let plugin = raw
            .get("plugin")
            .ok_or(JobDefinitionError::MissingField("plugin"))?
            .parse::<PluginKind>()
            .map_err(|plugin| JobDefinitionError::UnknownPlugin { id: id.clone(), plugin })?;

        let id_list = |key: &str| -> BTreeSet<JobId> {
            raw.get(key).map(|text| parse_id_list(text, namespace)).unwrap_or_default()
        };
        let depends = id_list("depends");
        let after = id_list("after");

        let requirement = match raw.get("requires") {
            Some(text) if !text.trim().is_empty() => Some(
                RequirementProgram::parse(text, namespace)
                    .map_err(|source| JobDefinitionError::Requirement { id: id.clone(), source })?,
            ),
            _ => None,
        };

        let estimated_duration = match raw.get("estimated_duration") {
            Some(value) if !value.trim().is_empty() => Some(parse_duration(value).ok_or_else(|| {
                JobDefinitionError::InvalidDuration { id: id.clone(), value: value.clone() }
            })?),
            _ => None,
        };

        let checksum = checksum(&raw);
        Ok(Self {
            id,
            partial_id,
            namespace: namespace.map(str::to_string),
            plugin,
            depends,
            after,
            requirement,
            estimated_duration,
            raw,
            checksum,
            origin,
        })
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn partial_id(&self) -> &str {
        &self.partial_id
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn plugin(&self) -> PluginKind {
        self.plugin
    }

    /// Any raw field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }

    pub fn raw(&self) -> &BTreeMap<String, String> {
        &self.raw
    }

    /// Summary, falling back to the partial id.
    pub fn summary(&self) -> &str {
        self.get("summary").unwrap_or(self.partial_id.as_str())
    }

    pub fn command(&self) -> Option<&str> {
        self.get("command")
    }

    /// Jobs that must PASS before this one can start.
    pub fn direct_dependencies(&self) -> &BTreeSet<JobId> {
        &self.depends
    }

    /// Jobs that must merely run earlier, if scheduled.
    pub fn after_dependencies(&self) -> &BTreeSet<JobId> {
        &self.after
    }

    pub fn resource_program(&self) -> Option<&RequirementProgram> {
        self.requirement.as_ref()
    }

    /// Resource jobs referenced by the requirement program.
    pub fn resource_dependencies(&self) -> BTreeSet<JobId> {
        self.requirement.as_ref().map(RequirementProgram::resource_ids).unwrap_or_default()
    }

    /// Estimate in seconds.
    pub fn estimated_duration(&self) -> Option<f64> {
        self.estimated_duration
    }

    pub fn automated(&self) -> bool {
        self.plugin.is_automated()
    }

    /// Hex SHA-256 over the raw fields sorted by key.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn origin(&self) -> &JobOrigin {
        &self.origin
    }

    /// Same id and same content, regardless of origin.
    pub fn is_identical(&self, other: &JobDefinition) -> bool {
        self == other
    }
}

pub struct JobDefinitionBuilder {
    partial_id: String,
    plugin: PluginKind,
    namespace: Option<String>,
    summary: Option<String>,
    command: Option<String>,
    depends: Option<String>,
    after: Option<String>,
    requires: Option<String>,
    estimated_duration: Option<String>,
    fields: BTreeMap<String, String>,
    origin: JobOrigin,
}

impl JobDefinitionBuilder {
    crate::setters! {
        set {
            origin: JobOrigin,
        }
        option {
            namespace: String,
            summary: String,
            command: String,
            depends: String,
            after: String,
            requires: String,
            estimated_duration: String,
        }
    }

    /// Set an arbitrary raw field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<JobDefinition, JobDefinitionError> {
        let mut raw = self.fields;
        raw.insert("id".to_string(), self.partial_id);
        raw.insert("plugin".to_string(), self.plugin.to_string());
        for (key, value) in [
            ("summary", self.summary),
            ("command", self.command),
            ("depends", self.depends),
            ("after", self.after),
            ("requires", self.requires),
            ("estimated_duration", self.estimated_duration),
        ] {
            if let Some(value) = value {
                raw.insert(key.to_string(), value);
            }
        }
        JobDefinition::from_raw(raw, self.namespace.as_deref(), self.origin)
    }
}

/// Split a dependency list on whitespace and commas, qualifying each id.
pub fn parse_id_list(text: &str, namespace: Option<&str>) -> BTreeSet<JobId> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| qualify(namespace, s))
        .collect()
}

/// Parse `90`, `1.5`, `1h 30m`, `2m:10s` style durations into seconds.
pub fn parse_duration(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(seconds) = text.parse::<f64>() {
        return (seconds >= 0.0).then_some(seconds);
    }
    let mut total = 0.0;
    let mut last_unit = 0;
    let mut seen = false;
    for part in text.split(|c: char| c.is_whitespace() || c == ':').filter(|s| !s.is_empty()) {
        let unit = part.chars().last()?;
        let digits = &part[..part.len() - unit.len_utf8()];
        let (rank, scale) = match unit {
            'h' => (1, 3600.0),
            'm' => (2, 60.0),
            's' => (3, 1.0),
            _ => return None,
        };
        if rank <= last_unit || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        total += digits.parse::<f64>().ok()? * scale;
        last_unit = rank;
        seen = true;
    }
    seen.then_some(total)
}

fn checksum(raw: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in raw {
        hasher.update((key.len() as u64).to_le_bytes());
        hasher.update(key.as_bytes());
        hasher.update((value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
