//! Label Generator
//!
//! Static `foo_N="bar_N"` labels shared by every instrument, plus the
//! per-series `datapoint_id` discriminator.

use std::collections::BTreeMap;

/// Label key distinguishing the series of one instrument
pub const DATAPOINT_LABEL: &str = "datapoint_id";

/// Index-aligned label keys and values, generated once per process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    keys: Vec<String>,
    values: Vec<String>,
}

impl LabelSet {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Label names accepted by every instrument: `datapoint_id` first
    pub fn schema(&self) -> Vec<String> {
        std::iter::once(DATAPOINT_LABEL.to_string())
            .chain(self.keys.iter().cloned())
            .collect()
    }

    /// Label values for one series, in [`schema`](Self::schema) order
    pub fn datapoint_values(&self, datapoint_id: usize) -> Vec<String> {
        std::iter::once(datapoint_id.to_string())
            .chain(self.values.iter().cloned())
            .collect()
    }
}

/// Generate `labels_count` keys `foo_0..` and values `bar_0..`
pub fn generate_labels(labels_count: usize) -> LabelSet {
    LabelSet {
        keys: (0..labels_count).map(|i| format!("foo_{}", i)).collect(),
        values: (0..labels_count).map(|i| format!("bar_{}", i)).collect(),
    }
}

/// Full label mapping for one series
pub fn datapoint_labels(datapoint_id: usize, labels: &LabelSet) -> BTreeMap<String, String> {
    let mut mapping: BTreeMap<String, String> = labels
        .keys
        .iter()
        .cloned()
        .zip(labels.values.iter().cloned())
        .collect();
    mapping.insert(DATAPOINT_LABEL.to_string(), datapoint_id.to_string());
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_labels() {
        let labels = generate_labels(0);
        assert!(labels.is_empty());
        assert_eq!(labels.schema(), vec!["datapoint_id".to_string()]);

        let mapping = datapoint_labels(3, &labels);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("datapoint_id").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_schema_matches_values() {
        let labels = generate_labels(2);
        assert_eq!(labels.schema(), vec!["datapoint_id", "foo_0", "foo_1"]);
        assert_eq!(labels.datapoint_values(7), vec!["7", "bar_0", "bar_1"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_generated_labels_are_aligned(n in 0usize..64) {
            let labels = generate_labels(n);
            prop_assert_eq!(labels.keys().len(), n);
            prop_assert_eq!(labels.values().len(), n);
            for i in 0..n {
                prop_assert_eq!(&labels.keys()[i], &format!("foo_{}", i));
                prop_assert_eq!(&labels.values()[i], &format!("bar_{}", i));
            }
        }

        #[test]
        fn prop_datapoint_labels_complete(n in 0usize..32, id in 0usize..10_000) {
            let labels = generate_labels(n);
            let mapping = datapoint_labels(id, &labels);

            prop_assert_eq!(mapping.len(), n + 1);
            prop_assert_eq!(mapping.get(DATAPOINT_LABEL), Some(&id.to_string()));
            for (key, value) in labels.keys().iter().zip(labels.values()) {
                prop_assert_eq!(mapping.get(key), Some(value));
            }
        }
    }
}
