use std::cmp::Reverse;

use serde::Serialize;

use crate::{domain::GroupRecord, Result};

/// Groups in the order shown to the user. Indices typed at the prompt refer to
/// positions in this sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankedGroups {
    groups: Vec<GroupRecord>,
}

/// One row of the numbered listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListingEntry<'a> {
    pub index: usize,
    pub name: &'a str,
    pub count: usize,
}

/// Sort by message count (highest first), breaking ties by name.
pub fn rank(mut groups: Vec<GroupRecord>) -> RankedGroups {
    groups.sort_by(|a, b| {
        (Reverse(a.message_count()), a.name()).cmp(&(Reverse(b.message_count()), b.name()))
    });
    RankedGroups { groups }
}

impl RankedGroups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GroupRecord> {
        self.groups.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupRecord> {
        self.groups.iter()
    }

    pub fn into_inner(self) -> Vec<GroupRecord> {
        self.groups
    }

    pub fn entries(&self) -> Vec<ListingEntry<'_>> {
        self.groups
            .iter()
            .enumerate()
            .map(|(index, g)| ListingEntry {
                index,
                name: g.name(),
                count: g.message_count(),
            })
            .collect()
    }

    /// Human-readable listing, one `[i] name - n messages` line per group.
    pub fn render_lines(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .map(|e| format!("[{}] {} - {} messages", e.index, e.name, e.count))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries())?)
    }
}
