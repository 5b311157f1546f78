//! Tenants and the actors acting inside them

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

/// An authenticated user acting within one tenant. Resolved by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub tenant_id: u64,
    pub user_id: u64,
}

impl Actor {
    pub fn new(tenant_id: u64, user_id: u64) -> Self {
        Actor { tenant_id, user_id }
    }
}

/// Lowercase ASCII word characters kept, other punctuation dropped, runs of
/// whitespace and `-` collapsed to one `-`, leading/trailing `-` trimmed
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c.to_ascii_lowercase());
        } else if (c.is_whitespace() || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
