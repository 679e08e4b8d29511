//! In-memory document content store
//!
//! Holds the per-key document contents supplied at open time and edited
//! through the manual path. Persistence of documents is owned by an external
//! service; this store only tracks what the current workflow session sees.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tradedoc_common::steps::{DocKey, ShippingDocVariant, Step, StepMode};

/// Externally supplied initial workflow data
///
/// `contents` is keyed by document key (1..=5); the title is carried
/// separately and never counts toward the modified-step seeding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    /// Document set title (meta, not step content)
    pub title: Option<String>,

    /// Pre-existing document contents keyed by document key
    #[serde(default)]
    pub contents: BTreeMap<DocKey, serde_json::Value>,

    /// Persisted per-step mode map, if the workflow was saved before
    #[serde(default)]
    pub step_modes: Option<BTreeMap<Step, StepMode>>,

    /// Persisted active shipping-document variant
    pub active_variant: Option<ShippingDocVariant>,

    /// Caller-supplied variant override applied on top of the persisted one
    pub variant_override: Option<ShippingDocVariant>,

    /// Explicit ordering of shipping variants once both documents exist
    pub variant_order: Option<Vec<ShippingDocVariant>>,
}

/// Document contents for one workflow session
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    title: Option<String>,
    contents: BTreeMap<DocKey, serde_json::Value>,
}

impl DocumentSet {
    /// Build from an initial snapshot
    pub fn from_snapshot(snapshot: &WorkflowSnapshot) -> Self {
        Self {
            title: snapshot.title.clone(),
            contents: snapshot.contents.clone(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Stored content under a document key, if any
    pub fn content(&self, key: DocKey) -> Option<&serde_json::Value> {
        self.contents.get(&key)
    }

    /// Replace the content stored under a document key
    pub fn set_content(&mut self, key: DocKey, content: serde_json::Value) {
        self.contents.insert(key, content);
    }

    /// Keys that currently hold content (empty or not)
    pub fn keys(&self) -> impl Iterator<Item = DocKey> + '_ {
        self.contents.keys().copied()
    }

    /// Whether a document key holds non-empty content
    ///
    /// Structural check: missing entries, JSON null, whitespace-only
    /// strings, empty arrays and empty objects are all treated as empty.
    pub fn has_content(&self, key: DocKey) -> bool {
        self.contents
            .get(&key)
            .map(|v| !is_empty_content(v))
            .unwrap_or(false)
    }
}

fn is_empty_content(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(n: u8) -> DocKey {
        DocKey::try_from(n).unwrap()
    }

    #[test]
    fn empty_values_have_no_content() {
        let mut docs = DocumentSet::default();
        docs.set_content(key(1), json!(null));
        docs.set_content(key(2), json!("   "));
        docs.set_content(key(3), json!([]));
        docs.set_content(key(4), json!({}));

        for n in 1..=4 {
            assert!(!docs.has_content(key(n)), "key {} should be empty", n);
        }
        assert!(!docs.has_content(key(5)), "missing key should be empty");
    }

    #[test]
    fn populated_values_count_as_content() {
        let mut docs = DocumentSet::default();
        docs.set_content(key(1), json!({"buyer": "Acme GmbH"}));
        docs.set_content(key(2), json!("FOB Shanghai"));
        docs.set_content(key(3), json!(42));

        assert!(docs.has_content(key(1)));
        assert!(docs.has_content(key(2)));
        assert!(docs.has_content(key(3)));
    }

    #[test]
    fn intentionally_emptied_content_is_still_stored() {
        // Emptying a document does not drop the entry; "modified" tracking
        // lives in the step state store, not here.
        let mut docs = DocumentSet::default();
        docs.set_content(key(1), json!({"items": [1, 2]}));
        docs.set_content(key(1), json!({}));

        assert!(docs.content(key(1)).is_some());
        assert!(!docs.has_content(key(1)));
    }

    #[test]
    fn snapshot_deserializes_numeric_keys() {
        let snapshot: WorkflowSnapshot = serde_json::from_value(json!({
            "title": "PO-2291 docs",
            "contents": {"1": {"incoterm": "CIF"}, "3": "signed"},
            "active_variant": "pl"
        }))
        .unwrap();

        let docs = DocumentSet::from_snapshot(&snapshot);
        assert_eq!(docs.title(), Some("PO-2291 docs"));
        assert!(docs.has_content(key(1)));
        assert!(docs.has_content(key(3)));
        assert_eq!(
            snapshot.active_variant,
            Some(ShippingDocVariant::PackingList)
        );
    }
}
