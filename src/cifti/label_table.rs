//! Label tables owned by the named maps of a labels mapping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the label every fresh table starts with.
pub const UNASSIGNED_LABEL_KEY: i32 = 0;

/// Name of the unassigned label.
pub const UNASSIGNED_LABEL_NAME: &str = "???";

/// One entry of a label table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Display name.
    pub name: String,
    /// RGBA color, each channel in `[0, 1]`.
    pub rgba: [f32; 4],
}

impl Label {
    /// Create a label with the given name and color.
    pub fn new(name: impl Into<String>, rgba: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            rgba,
        }
    }
}

/// Integer key to label lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelTable {
    labels: BTreeMap<i32, Label>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelTable {
    /// A table holding only the unassigned label.
    pub fn new() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(
            UNASSIGNED_LABEL_KEY,
            Label::new(UNASSIGNED_LABEL_NAME, [0.0, 0.0, 0.0, 0.0]),
        );
        Self { labels }
    }

    /// Insert or replace the label stored under `key`, returning the old one.
    pub fn insert(&mut self, key: i32, label: Label) -> Option<Label> {
        self.labels.insert(key, label)
    }

    /// Remove the label stored under `key`.
    pub fn remove(&mut self, key: i32) -> Option<Label> {
        self.labels.remove(&key)
    }

    /// Label stored under `key`.
    pub fn get(&self, key: i32) -> Option<&Label> {
        self.labels.get(&key)
    }

    /// Key of the first label with the given name.
    pub fn key_for_name(&self, name: &str) -> Option<i32> {
        self.labels
            .iter()
            .find(|(_, label)| label.name == name)
            .map(|(&key, _)| key)
    }

    /// Number of labels, including the unassigned one.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if the table has no labels at all.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in key order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &Label)> {
        self.labels.iter().map(|(&k, v)| (k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_has_unassigned() {
        let table = LabelTable::new();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().name, "???");
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut table = LabelTable::new();
        table.insert(3, Label::new("V1", [1.0, 0.0, 0.0, 1.0]));
        assert_eq!(table.key_for_name("V1"), Some(3));
        assert_eq!(table.key_for_name("V2"), None);
        let old = table.insert(3, Label::new("V1v", [1.0, 0.0, 0.0, 1.0]));
        assert_eq!(old.unwrap().name, "V1");
        assert_eq!(table.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec![0, 3]);
    }
}
