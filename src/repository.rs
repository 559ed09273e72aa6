//! In-memory resource tree and namespace-prefix registry.
//!
//! Paths are normalized (see [`crate::validation::normalize_resource_path`])
//! before they get here. The root is the empty path and always exists.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::validation::{validate_namespace_uri, validate_prefix};

/// Namespaces registered at startup.
const DEFAULT_NAMESPACES: [(&str, &str); 4] = [
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

/// A stored resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub path: String,
    pub created: DateTime<Utc>,
}

/// Outcome of registering a namespace prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    Replaced,
}

#[derive(Debug)]
pub struct Repository {
    resources: BTreeMap<String, Resource>,
    namespaces: BTreeMap<String, String>,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    pub fn new() -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(
            String::new(),
            Resource {
                path: String::new(),
                created: Utc::now(),
            },
        );

        let namespaces = DEFAULT_NAMESPACES
            .iter()
            .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
            .collect();

        Self {
            resources,
            namespaces,
        }
    }

    /// Parent path of `path`; `None` for the root.
    pub fn parent_of(path: &str) -> Option<&str> {
        if path.is_empty() {
            return None;
        }
        Some(path.rsplit_once('/').map_or("", |(parent, _)| parent))
    }

    pub fn get(&self, path: &str) -> AppResult<&Resource> {
        self.resources
            .get(path)
            .ok_or_else(|| AppError::NotFound(format!("/{path}")))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resources.contains_key(path)
    }

    /// Direct children of `path`, in path order.
    pub fn children(&self, path: &str) -> Vec<&Resource> {
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };

        self.resources
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| {
                key.get(prefix.len()..)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .map(|(_, resource)| resource)
            .collect()
    }

    /// Create a resource at `path`.
    ///
    /// # Errors
    ///
    /// - `ItemExists` if something is already stored at `path`
    /// - `NotFound` if the parent does not exist
    pub fn create(&mut self, path: &str) -> AppResult<&Resource> {
        if self.contains(path) {
            return Err(AppError::ItemExists(format!("/{path}")));
        }
        if let Some(parent) = Self::parent_of(path)
            && !self.contains(parent)
        {
            return Err(AppError::NotFound(format!(
                "parent /{parent} of /{path} does not exist"
            )));
        }

        debug!(path, "Creating resource");
        let resource = self
            .resources
            .entry(path.to_string())
            .or_insert_with(|| Resource {
                path: path.to_string(),
                created: Utc::now(),
            });
        Ok(resource)
    }

    /// Delete `path` and everything below it. Returns the number removed.
    ///
    /// # Errors
    ///
    /// - `BadRequest` for the root
    /// - `NotFound` if nothing is stored at `path`
    pub fn delete(&mut self, path: &str) -> AppResult<usize> {
        if path.is_empty() {
            return Err(AppError::BadRequest(
                "the repository root cannot be deleted".to_string(),
            ));
        }
        if !self.contains(path) {
            return Err(AppError::NotFound(format!("/{path}")));
        }

        let descendant_prefix = format!("{path}/");
        let before = self.resources.len();
        self.resources
            .retain(|key, _| key != path && !key.starts_with(&descendant_prefix));
        let removed = before - self.resources.len();

        info!(path, removed, "Deleted resource tree");
        Ok(removed)
    }

    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    /// Register or replace a namespace prefix.
    ///
    /// # Errors
    ///
    /// - `InvalidPrefix` if the prefix is not an NCName or is reserved
    /// - `InvalidUri` if the namespace is not an absolute URI
    pub fn register_namespace(&mut self, prefix: &str, namespace: &str) -> AppResult<Registration> {
        validate_prefix(prefix)?;
        let namespace = validate_namespace_uri(namespace)?;

        let previous = self
            .namespaces
            .insert(prefix.to_string(), namespace.to_string());
        info!(prefix, namespace = %namespace, replaced = previous.is_some(), "Registered namespace");

        Ok(match previous {
            Some(_) => Registration::Replaced,
            None => Registration::Created,
        })
    }

    /// Remove a namespace prefix.
    ///
    /// # Errors
    ///
    /// - `InvalidPrefix` if the prefix is malformed
    /// - `NotFound` if it is not registered
    pub fn remove_namespace(&mut self, prefix: &str) -> AppResult<()> {
        validate_prefix(prefix)?;
        match self.namespaces.remove(prefix) {
            Some(_) => {
                info!(prefix, "Removed namespace");
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "namespace prefix `{prefix}` is not registered"
            ))),
        }
    }
}
