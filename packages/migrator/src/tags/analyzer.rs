use std::collections::BTreeMap;

use sea_orm::FromQueryResult;
use serde::Serialize;

use super::normalize::{normalize, raw_token_count, tokens};

/// One tag with the number of files linked to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct TagUsage {
    pub id: i32,
    pub tag_name: String,
    pub file_count: i64,
}

/// A multi-word tag and the tokens it splits into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitTarget {
    pub tag: TagUsage,
    pub tokens: Vec<String>,
}

/// Tags that normalize to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeGroup {
    pub normalized: String,
    pub keep: TagUsage,
    /// Ordered by usage desc, then id asc.
    pub remove: Vec<TagUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupPlan {
    pub splits: Vec<SplitTarget>,
    pub deletions: Vec<TagUsage>,
    pub merges: Vec<MergeGroup>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty() && self.deletions.is_empty() && self.merges.is_empty()
    }
}

/// Classify the whole inventory. The three lists may overlap; the executor
/// runs them in order and re-reads before merging.
pub fn analyze(inventory: &[TagUsage]) -> CleanupPlan {
    CleanupPlan {
        splits: find_splits(inventory),
        deletions: find_blank(inventory),
        merges: find_duplicates(inventory),
    }
}

pub fn find_splits(inventory: &[TagUsage]) -> Vec<SplitTarget> {
    inventory
        .iter()
        .filter(|tag| raw_token_count(&tag.tag_name) > 1)
        .map(|tag| SplitTarget {
            tag: tag.clone(),
            tokens: tokens(&tag.tag_name),
        })
        .collect()
}

pub fn find_blank(inventory: &[TagUsage]) -> Vec<TagUsage> {
    inventory
        .iter()
        .filter(|tag| tag.tag_name.trim().is_empty())
        .cloned()
        .collect()
}

pub fn find_duplicates(inventory: &[TagUsage]) -> Vec<MergeGroup> {
    let mut groups: BTreeMap<String, Vec<&TagUsage>> = BTreeMap::new();
    for tag in inventory {
        let key = normalize(&tag.tag_name);
        if key.is_empty() {
            continue;
        }
        groups.entry(key).or_default().push(tag);
    }

    let mut merges: Vec<MergeGroup> = groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(normalized, mut members)| {
            // Most used first; the lowest id wins a tie.
            members.sort_by(|a, b| b.file_count.cmp(&a.file_count).then(a.id.cmp(&b.id)));
            let keep = members[0].clone();
            let remove = members[1..].iter().map(|t| (*t).clone()).collect();
            MergeGroup {
                normalized,
                keep,
                remove,
            }
        })
        .collect();

    merges.sort_by_key(|group| group.keep.id);
    merges
}
