//! Configuration scopes of the host platform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Level of a configuration scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Default,
    Websites,
    Stores,
}

impl ScopeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Default => "default",
            ScopeKind::Websites => "websites",
            ScopeKind::Stores => "stores",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(ScopeKind::Default),
            "websites" => Some(ScopeKind::Websites),
            "stores" => Some(ScopeKind::Stores),
            _ => None,
        }
    }
}

/// A configuration boundary: the default scope, a website, or a store view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub id: u32,
}

impl Scope {
    pub const DEFAULT: Scope = Scope {
        kind: ScopeKind::Default,
        id: 0,
    };

    pub fn store(id: u32) -> Self {
        Self {
            kind: ScopeKind::Stores,
            id,
        }
    }

    pub fn website(id: u32) -> Self {
        Self {
            kind: ScopeKind::Websites,
            id,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ScopeKind::Default => f.write_str("default scope"),
            ScopeKind::Websites => write!(f, "website {}", self.id),
            ScopeKind::Stores => write!(f, "store view {}", self.id),
        }
    }
}
