//! Scope records (spaces, environments) and the paged listing envelope.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to another record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub sys: LinkSys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    pub id: String,
    #[serde(rename = "type", default = "default_link_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

fn default_link_type() -> String {
    "Link".to_string()
}

impl Link {
    pub fn new(link_type: &str, id: &str) -> Self {
        Self {
            sys: LinkSys {
                id: id.to_string(),
                kind: default_link_type(),
                link_type: Some(link_type.to_string()),
            },
        }
    }
}

/// A space: the top-level container the account can see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub sys: ScopeSys,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An environment inside a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub sys: EnvironmentSys,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeSys {
    pub id: String,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSys {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<Link>,
    /// Set when this environment is only an alias pointing at another one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliased_environment: Option<Link>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Space {
    pub fn new(id: &str) -> Self {
        Self {
            sys: ScopeSys {
                id: id.to_string(),
                extra: IndexMap::new(),
            },
            name: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }
}

impl Environment {
    pub fn new(space_id: &str, id: &str) -> Self {
        Self {
            sys: EnvironmentSys {
                id: id.to_string(),
                space: Some(Link::new("Space", space_id)),
                aliased_environment: None,
                extra: IndexMap::new(),
            },
            name: None,
        }
    }

    /// An alias of `target` named `id`.
    pub fn alias(space_id: &str, id: &str, target: &str) -> Self {
        let mut env = Self::new(space_id, id);
        env.sys.aliased_environment = Some(Link::new("Environment", target));
        env
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn is_alias(&self) -> bool {
        self.sys.aliased_environment.is_some()
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection<T> {
    /// Offset of the first item the server actually returned.
    #[serde(default)]
    pub skip: usize,
    /// Effective page size, which may differ from the requested one.
    #[serde(default)]
    pub limit: usize,
    pub items: Vec<T>,
    /// Informational only; never used to decide when a listing ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl<T> Collection<T> {
    pub fn new(skip: usize, limit: usize, items: Vec<T>) -> Self {
        Self {
            skip,
            limit,
            items,
            total: None,
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }
}
