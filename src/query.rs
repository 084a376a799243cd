//! Query shapes handed from the front end into the core.

use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    SingleNamespace(String),
    AllNamespaces,
    Cluster,
}

#[derive(Clone, Debug)]
pub struct Query {
    pub api_group: String,
    pub plural: String,
    pub scope: Scope,
    pub name: Option<String>,
}

impl Query {
    pub fn new(api_group: impl Into<String>, plural: impl Into<String>, scope: Scope) -> Self {
        Self {
            api_group: api_group.into(),
            plural: plural.into(),
            scope,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_cluster_scoped(&self) -> bool {
        matches!(self.scope, Scope::Cluster)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogVariant {
    Current,
    Previous,
}

impl LogVariant {
    pub fn file_name(self) -> &'static str {
        match self {
            LogVariant::Current => "current.log",
            LogVariant::Previous => "previous.log",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogHandle {
    pub archive_root: PathBuf,
    pub namespace: String,
    pub pod_name: String,
    pub container_name: Option<String>,
    pub variant: LogVariant,
}
