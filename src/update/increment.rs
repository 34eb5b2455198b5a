use super::DocumentState;
use super::UpdateInfo;
use crate::cos::{ObjectKey, Value};
use std::collections::HashSet;

/// One changed value and the indirect object that owns it.
///
/// `key` is `None` for values that live directly in the document root.
#[derive(Debug, Clone)]
pub struct IncrementEntry {
    pub key: Option<ObjectKey>,
    pub value: Value,
}

/// The objects an incremental save has to append.
///
/// Built once by [`DocumentState::build_increment`]; later mutations are not
/// reflected, build a new one instead.
#[derive(Debug, Clone, Default)]
pub struct Increment {
    entries: Vec<IncrementEntry>,
    objects: Vec<(ObjectKey, Value)>,
    root_updated: bool,
}

impl Increment {
    /// Every changed value, in discovery order from the root
    pub fn entries(&self) -> &[IncrementEntry] {
        &self.entries
    }

    /// Indirect objects to rewrite, each once, with their current value
    pub fn objects(&self) -> &[(ObjectKey, Value)] {
        &self.objects
    }

    /// Whether a change sits directly in the root, so the root itself has
    /// to be written again
    pub fn is_root_updated(&self) -> bool {
        self.root_updated
    }

    /// Number of changed values, counting each instance once
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing changed since loading
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this exact instance was recorded as changed
    pub fn contains(&self, value: &Value) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.value.same_instance(value))
    }

    /// Whether the indirect object `key` is among the objects to rewrite
    pub fn contains_key(&self, key: ObjectKey) -> bool {
        self.objects.iter().any(|(k, _)| *k == key)
    }
}

type Owner = Option<(ObjectKey, Value)>;

pub(super) fn collect(document: &DocumentState, root: &Value) -> Increment {
    let mut increment = Increment::default();
    let mut seen_keys = HashSet::new();
    let mut seen_nodes = HashSet::new();
    let mut pending: Vec<(Value, Owner)> = vec![(root.clone(), None)];

    while let Some((value, owner)) = pending.pop() {
        if let Value::Reference(cell) = &value {
            if !seen_keys.insert(cell.key()) {
                continue;
            }
            // never resolve here: a cell nobody loaded cannot have changed
            let target = cell.cached();
            let owner = Some((cell.key(), target.clone().unwrap_or_default()));
            if cell.update_state().is_updated_under(document) {
                increment.record(value.clone(), &owner);
            }
            if let Some(target) = target {
                pending.push((target, owner));
            }
            continue;
        }

        let (Some(info), Some(identity)) = (value.update_info(), value.identity()) else {
            continue;
        };
        if !seen_nodes.insert(identity) {
            continue;
        }
        if info.update_state().is_updated_under(document) {
            increment.record(value.clone(), &owner);
        }
        for child in info.direct_children().into_iter().rev() {
            pending.push((child, owner.clone()));
        }
    }

    tracing::debug!(
        changed = increment.entries.len(),
        objects = increment.objects.len(),
        root_updated = increment.root_updated,
        "built increment"
    );
    increment
}

impl Increment {
    fn record(&mut self, value: Value, owner: &Owner) {
        match owner {
            Some((key, object)) => {
                if !self.contains_key(*key) {
                    self.objects.push((*key, object.clone()));
                }
                self.entries.push(IncrementEntry {
                    key: Some(*key),
                    value,
                });
            }
            None => {
                self.root_updated = true;
                self.entries.push(IncrementEntry { key: None, value });
            }
        }
    }
}
