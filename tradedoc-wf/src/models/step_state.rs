//! Per-step workflow state
//!
//! Owns the mode chosen for each step, the set of steps considered
//! modified, the dirty flag, and the active shipping-document variant.
//! Upload lifecycle state is owned elsewhere (the upload tracker); the
//! workflow controller is the only cross-component writer.

use std::collections::BTreeSet;
use tradedoc_common::steps::{ShippingDocVariant, Step, StepMode, STEP_COUNT};

use super::WorkflowSnapshot;

/// Step mode, modified-set, dirty flag and variant state for one workflow
///
/// Every tracked step always has an explicit mode entry ("unset" rather
/// than absent). Setting the dirty flag is the caller's responsibility on
/// user actions; none of the setters here infer dirtiness, so programmatic
/// initialization and history restore never mark the workflow dirty.
#[derive(Debug, Clone)]
pub struct StepStateStore {
    modes: [StepMode; STEP_COUNT as usize],
    modified: BTreeSet<Step>,
    dirty: bool,
    active_variant: ShippingDocVariant,
    variant_order: Option<Vec<ShippingDocVariant>>,
}

impl Default for StepStateStore {
    fn default() -> Self {
        Self {
            modes: [StepMode::Unset; STEP_COUNT as usize],
            modified: BTreeSet::new(),
            dirty: false,
            active_variant: ShippingDocVariant::Undecided,
            variant_order: None,
        }
    }
}

impl StepStateStore {
    /// Seed from externally supplied initial workflow data
    ///
    /// Every pre-existing content key except title/meta counts as already
    /// modified: a step appears in the modified set iff its content belongs
    /// in a "what changed" summary, which pre-existing documents do.
    pub fn from_snapshot(snapshot: &WorkflowSnapshot) -> Self {
        let mut store = Self::default();

        for key in snapshot.contents.keys() {
            store.modified.insert(key.step());
        }

        if let Some(modes) = &snapshot.step_modes {
            for (step, mode) in modes {
                store.modes[step.index()] = *mode;
            }
        }

        // Caller override wins over the persisted variant
        store.active_variant = snapshot
            .variant_override
            .or(snapshot.active_variant)
            .unwrap_or_default();
        store.variant_order = snapshot.variant_order.clone();

        store
    }

    pub fn mode(&self, step: Step) -> StepMode {
        self.modes[step.index()]
    }

    /// Assign a step's production mode
    pub fn set_mode(&mut self, step: Step, mode: StepMode) {
        self.modes[step.index()] = mode;
    }

    /// Idempotent add to the modified-step set
    pub fn mark_modified(&mut self, step: Step) {
        self.modified.insert(step);
    }

    pub fn is_modified(&self, step: Step) -> bool {
        self.modified.contains(&step)
    }

    pub fn modified_steps(&self) -> &BTreeSet<Step> {
        &self.modified
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Set by callers on mutating user actions, cleared after a save
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn active_variant(&self) -> ShippingDocVariant {
        self.active_variant
    }

    /// Switch which concrete document key step 4 resolves to
    ///
    /// Does not clear any data stored under either key.
    pub fn set_active_variant(&mut self, variant: ShippingDocVariant) {
        self.active_variant = variant;
    }

    pub fn variant_order(&self) -> Option<&[ShippingDocVariant]> {
        self.variant_order.as_deref()
    }

    pub fn set_variant_order(&mut self, order: Vec<ShippingDocVariant>) {
        self.variant_order = Some(order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tradedoc_common::steps::DocKey;

    fn step(n: u8) -> Step {
        Step::new(n).unwrap()
    }

    #[test]
    fn mark_modified_is_idempotent() {
        let mut store = StepStateStore::default();
        store.mark_modified(step(2));
        store.mark_modified(step(2));

        assert_eq!(store.modified_steps().len(), 1);
        assert!(store.is_modified(step(2)));
    }

    #[test]
    fn seeding_excludes_title_meta() {
        let snapshot: WorkflowSnapshot = serde_json::from_value(json!({
            "title": "March shipment",
            "contents": {"1": {"a": 1}, "3": {"b": 2}}
        }))
        .unwrap();

        let store = StepStateStore::from_snapshot(&snapshot);
        let modified: Vec<u8> = store.modified_steps().iter().map(|s| s.number()).collect();
        assert_eq!(modified, vec![1, 3]);
        assert!(!store.is_dirty());
    }

    #[test]
    fn seeding_collapses_shipping_keys_to_step_four() {
        let mut snapshot = WorkflowSnapshot::default();
        snapshot
            .contents
            .insert(DocKey::PackingList, json!({"cartons": 12}));

        let store = StepStateStore::from_snapshot(&snapshot);
        assert!(store.is_modified(step(4)));
        assert_eq!(store.modified_steps().len(), 1);
    }

    #[test]
    fn modes_default_to_unset_and_seed_from_map() {
        let snapshot: WorkflowSnapshot = serde_json::from_value(json!({
            "step_modes": {"1": "manual", "4": "upload"}
        }))
        .unwrap();

        let store = StepStateStore::from_snapshot(&snapshot);
        assert_eq!(store.mode(step(1)), StepMode::Manual);
        assert_eq!(store.mode(step(2)), StepMode::Unset);
        assert_eq!(store.mode(step(3)), StepMode::Unset);
        assert_eq!(store.mode(step(4)), StepMode::Upload);
    }

    #[test]
    fn variant_override_wins_over_persisted() {
        let snapshot: WorkflowSnapshot = serde_json::from_value(json!({
            "active_variant": "ci",
            "variant_override": "pl"
        }))
        .unwrap();

        let store = StepStateStore::from_snapshot(&snapshot);
        assert_eq!(store.active_variant(), ShippingDocVariant::PackingList);
    }

    #[test]
    fn setters_never_infer_dirty() {
        let mut store = StepStateStore::default();
        store.set_mode(step(1), StepMode::Skip);
        store.mark_modified(step(1));
        store.set_active_variant(ShippingDocVariant::CommercialInvoice);

        assert!(!store.is_dirty());
        store.set_dirty(true);
        assert!(store.is_dirty());
    }
}
