// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Facts produced by resource jobs.

use crate::id::JobId;
use crate::rfc822::Record;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One record of resource job output: attribute → value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(IndexMap<String, String>);

impl Resource {
    /// A resource with no attributes. Stored when a resource job printed
    /// nothing so that expressions fail instead of staying pending.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.0.get(attribute).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Record> for Resource {
    fn from(record: Record) -> Self {
        Self(record.data)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Resource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Resource job id → resources from its latest result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceMap(IndexMap<JobId, Vec<Resource>>);

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, job_id: &str) -> Option<&[Resource]> {
        self.0.get(job_id).map(Vec::as_slice)
    }

    /// Replace the resources of `job_id`. Never merges with the previous list.
    pub fn set(&mut self, job_id: JobId, resources: Vec<Resource>) {
        self.0.insert(job_id, resources);
    }

    pub fn remove(&mut self, job_id: &str) -> Option<Vec<Resource>> {
        self.0.shift_remove(job_id)
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.0.contains_key(job_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &JobId> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
