//! Inventory entries listed on the remote registry.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::DuplicatePolicy;

/// Election type a document is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Pres,
    Prim,
    Mun,
    Leg,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 4] = [Self::Pres, Self::Prim, Self::Mun, Self::Leg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pres => "Pres",
            Self::Prim => "Prim",
            Self::Mun => "Mun",
            Self::Leg => "Leg",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    /// Exact, case-sensitive match against the four tags.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::InvalidCategory {
                value: s.to_string(),
            })
    }
}

/// A document link found on a yearly listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    /// Document title, the join key across snapshots
    pub name: String,

    /// Link as published, usually relative to the registry origin
    pub href: String,

    /// Listing year the link was found under
    pub year: i32,

    /// Keyword classification of `name`
    pub category: Option<Category>,
}

/// The full inventory with unique names.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub entries: Vec<InventoryEntry>,

    /// Whether the source snapshot carried a category column
    pub has_category: bool,
}

impl Inventory {
    /// Build an inventory, enforcing name uniqueness under `policy`.
    pub fn ingest(
        entries: Vec<InventoryEntry>,
        has_category: bool,
        policy: DuplicatePolicy,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(entries.len());
        let mut dropped = 0usize;

        for entry in entries {
            if seen.contains(entry.name.as_str()) {
                match policy {
                    DuplicatePolicy::Reject => {
                        return Err(AppError::DuplicateName { name: entry.name });
                    }
                    DuplicatePolicy::First => {
                        log::debug!("Dropping duplicate inventory entry '{}'", entry.name);
                        dropped += 1;
                        continue;
                    }
                }
            }
            seen.insert(entry.name.clone());
            unique.push(entry);
        }

        if dropped > 0 {
            log::warn!(
                "Inventory had {} duplicate names; kept the first occurrence of each",
                dropped
            );
        }

        Ok(Self {
            entries: unique,
            has_category,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
