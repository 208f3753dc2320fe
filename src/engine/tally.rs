//! Per-class part tally.

use std::collections::BTreeMap;

use crate::model::PartInfo;

pub const UNKNOWN_PART: &str = "Unknown Part";

#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    pub description: String,
    pub count: u64,
}

/// Cumulative count of detected parts per class name. Only grows.
#[derive(Debug, Default)]
pub struct ClassTally {
    entries: BTreeMap<String, ClassEntry>,
}

impl ClassTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one newly detected part. Blank or placeholder class names are ignored.
    pub fn record(&mut self, part: &PartInfo) -> bool {
        let class_name = part.class_name.trim();
        if class_name.is_empty() || class_name == "undefined" || class_name == "null" {
            return false;
        }
        let entry = self
            .entries
            .entry(class_name.to_string())
            .or_insert_with(|| ClassEntry {
                description: if part.part_description.is_empty() {
                    UNKNOWN_PART.to_string()
                } else {
                    part.part_description.clone()
                },
                count: 0,
            });
        entry.count += 1;
        true
    }

    pub fn get(&self, class_name: &str) -> Option<&ClassEntry> {
        self.entries.get(class_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClassEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(class_name: &str, description: &str) -> PartInfo {
        PartInfo {
            class_name: class_name.to_string(),
            part_description: description.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_counts_accumulate_and_keep_first_description() {
        let mut tally = ClassTally::new();
        tally.record(&part("bracket", "Bracket LH"));
        tally.record(&part("bracket", "Bracket RH"));
        tally.record(&part("cap", ""));

        assert_eq!(tally.get("bracket").unwrap().count, 2);
        assert_eq!(tally.get("bracket").unwrap().description, "Bracket LH");
        assert_eq!(tally.get("cap").unwrap().description, UNKNOWN_PART);
    }

    #[test]
    fn test_ignores_placeholder_classes() {
        let mut tally = ClassTally::new();
        assert!(!tally.record(&part("", "x")));
        assert!(!tally.record(&part("null", "x")));
        assert!(!tally.record(&part(" undefined ", "x")));
        assert!(tally.is_empty());
    }
}
