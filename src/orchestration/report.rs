//! Per-item outcome reports for batch jobs.

use serde::Serialize;
use uuid::Uuid;

/// What happened to one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ItemOutcome {
    Applied,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    /// Stable identifier of the item (event key, position id, tier member).
    pub key: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub job: &'static str,
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn new(job: &'static str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, key: impl Into<String>, outcome: ItemOutcome) {
        self.items.push(BatchItem {
            key: key.into(),
            outcome,
        });
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }

    /// Outcome recorded for `key`, if any.
    pub fn outcome_of(&self, key: &str) -> Option<&ItemOutcome> {
        self.items.iter().find(|i| i.key == key).map(|i| &i.outcome)
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_lookup() {
        let mut report = BatchReport::new("deposit_scan");
        report.push("a", ItemOutcome::Applied);
        report.push("b", ItemOutcome::Skipped("running".to_string()));
        report.push("c", ItemOutcome::Failed("db".to_string()));
        report.push("d", ItemOutcome::Applied);

        assert_eq!((report.applied(), report.skipped(), report.failed()), (2, 1, 1));
        assert_eq!(
            report.outcome_of("b"),
            Some(&ItemOutcome::Skipped("running".to_string()))
        );
        assert!(report.outcome_of("z").is_none());
    }

    #[test]
    fn test_item_serialization() {
        let item = BatchItem {
            key: "0xabc".to_string(),
            outcome: ItemOutcome::Failed("boom".to_string()),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["key"], "0xabc");
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["reason"], "boom");

        let applied = serde_json::to_value(BatchItem {
            key: "k".to_string(),
            outcome: ItemOutcome::Applied,
        })
        .unwrap();
        assert_eq!(applied["outcome"], "applied");
    }
}
