//! Bucket → list mapping and the operator-facing configuration check.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::bucket::Bucket;
use crate::board::BoardList;

/// Destination list for each bucket. Entries may be missing; cards whose
/// bucket has no list are skipped by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListMapping {
    lists: BTreeMap<Bucket, String>,
}

impl ListMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: map a bucket to a list.
    pub fn with_list(mut self, bucket: Bucket, list_id: impl Into<String>) -> Self {
        self.insert(bucket, list_id);
        self
    }

    pub fn insert(&mut self, bucket: Bucket, list_id: impl Into<String>) {
        self.lists.insert(bucket, list_id.into());
    }

    /// Target list for a bucket, if one is configured.
    pub fn get(&self, bucket: Bucket) -> Option<&str> {
        self.lists.get(&bucket).map(String::as_str)
    }

    /// Buckets with no list configured, earliest first.
    pub fn missing(&self) -> Vec<Bucket> {
        Bucket::ALL
            .into_iter()
            .filter(|b| !self.lists.contains_key(b))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.lists.len() == Bucket::ALL.len()
    }

    /// Reverse lookup: which bucket a list serves.
    pub fn bucket_for_list(&self, list_id: &str) -> Option<Bucket> {
        self.lists
            .iter()
            .find(|(_, id)| id.as_str() == list_id)
            .map(|(bucket, _)| *bucket)
    }

    /// Compare the mapping against the board's actual lists.
    pub fn check_against(&self, lists: &[BoardList]) -> Vec<MappingIssue> {
        Bucket::ALL
            .into_iter()
            .filter_map(|bucket| match self.get(bucket) {
                None => Some(MappingIssue::Unmapped { bucket }),
                Some(id) if !lists.iter().any(|l| l.id == id) => Some(MappingIssue::UnknownList {
                    bucket,
                    list_id: id.to_string(),
                }),
                Some(_) => None,
            })
            .collect()
    }
}

/// A problem found by [`ListMapping::check_against`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingIssue {
    /// No list configured for the bucket.
    Unmapped { bucket: Bucket },
    /// The configured list id does not exist on the board.
    UnknownList { bucket: Bucket, list_id: String },
}

impl fmt::Display for MappingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingIssue::Unmapped { bucket } => {
                write!(f, "no list configured for '{bucket}' ({})", bucket.env_key())
            }
            MappingIssue::UnknownList { bucket, list_id } => {
                write!(f, "list {list_id} for '{bucket}' does not exist on the board")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_mapping() -> ListMapping {
        Bucket::ALL
            .into_iter()
            .fold(ListMapping::new(), |m, b| m.with_list(b, format!("list_{b:?}")))
    }

    fn board_list(id: &str) -> BoardList {
        BoardList {
            id: id.to_string(),
            name: id.to_string(),
        }
    }

    #[test]
    fn empty_mapping_misses_everything() {
        let mapping = ListMapping::new();
        assert_eq!(mapping.missing(), Bucket::ALL.to_vec());
        assert!(!mapping.is_complete());
        assert!(mapping.get(Bucket::Today).is_none());
    }

    #[test]
    fn partial_mapping_is_incomplete() {
        let mut partial = ListMapping::new();
        for bucket in &Bucket::ALL[..5] {
            partial.insert(*bucket, "x");
        }
        assert!(!partial.is_complete());
        assert_eq!(partial.missing(), vec![Bucket::Later]);
    }

    #[test]
    fn full_mapping_is_complete() {
        let mapping = full_mapping();
        assert!(mapping.is_complete());
        assert!(mapping.missing().is_empty());
        assert_eq!(mapping.get(Bucket::NextWeek), Some("list_NextWeek"));
        assert_eq!(mapping.bucket_for_list("list_Later"), Some(Bucket::Later));
        assert_eq!(mapping.bucket_for_list("elsewhere"), None);
    }

    #[test]
    fn check_reports_unmapped_and_unknown_lists() {
        let mapping = ListMapping::new()
            .with_list(Bucket::Overdue, "a")
            .with_list(Bucket::Today, "b")
            .with_list(Bucket::Tomorrow, "gone")
            .with_list(Bucket::ThisWeek, "c")
            .with_list(Bucket::NextWeek, "d");
        let lists = ["a", "b", "c", "d"].map(board_list);

        let issues = mapping.check_against(&lists);
        assert_eq!(
            issues,
            vec![
                MappingIssue::UnknownList {
                    bucket: Bucket::Tomorrow,
                    list_id: "gone".into()
                },
                MappingIssue::Unmapped {
                    bucket: Bucket::Later
                },
            ]
        );
        assert!(issues[1].to_string().contains("DUE_SORT_LIST_LATER"));
    }

    #[test]
    fn serializes_as_bucket_keyed_object() {
        let mapping = ListMapping::new()
            .with_list(Bucket::Today, "t")
            .with_list(Bucket::Later, "l");
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json, serde_json::json!({"today": "t", "later": "l"}));
    }
}
