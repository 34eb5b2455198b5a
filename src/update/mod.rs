//! Change tracking for incremental saves
//!
//! Every container and every indirect object cell carries an [`UpdateState`].
//! A state is bound to at most one [`DocumentState`] (the first binder wins)
//! and records whether its owner changed after the document finished
//! loading. [`DocumentState::build_increment`] collects the changed values.
//!
//! Binding spreads through newly attached subgraphs: when a value is bound
//! for the first time its direct children are offered the same document.
//! Children that are already bound stop the walk, so cyclic graphs
//! terminate. Attaching a value through a mutation also marks it updated;
//! attaching it because an indirect object was dereferenced never does.

mod document;
mod increment;
mod state;

pub use document::DocumentState;
pub use increment::{Increment, IncrementEntry};
pub use state::UpdateState;

use crate::cos::Value;
use std::cell::{Ref, RefMut};

/// Implemented by every value kind that carries an [`UpdateState`]
pub trait UpdateInfo {
    fn update_state(&self) -> Ref<'_, UpdateState>;

    fn update_state_mut(&self) -> RefMut<'_, UpdateState>;

    /// Values held directly by this node, in order
    fn direct_children(&self) -> Vec<Value>;

    fn is_updated(&self) -> bool {
        self.update_state().is_updated()
    }
}

/// Record a change to `node` itself
pub(crate) fn record(node: &dyn UpdateInfo) -> Option<DocumentState> {
    let mut state = node.update_state_mut();
    state.update();
    state.origin()
}

/// Record a change to `node` that attached or detached `child`
pub(crate) fn record_child(node: &dyn UpdateInfo, child: &Value) {
    let origin = record(node);
    attach(child, origin.as_ref(), false);
}

/// Offer `origin` to `value` and, if it was unbound, to its children.
///
/// With `dereferencing` set the link is established without marking
/// anything updated.
pub(crate) fn attach(value: &Value, origin: Option<&DocumentState>, dereferencing: bool) {
    let Some(origin) = origin else {
        return;
    };
    let mut pending = vec![value.clone()];
    while let Some(current) = pending.pop() {
        let Some(info) = current.update_info() else {
            continue;
        };
        {
            let mut state = info.update_state_mut();
            if !state.bind(origin) {
                continue;
            }
            if !dereferencing {
                state.update();
            }
        }
        pending.extend(info.direct_children().into_iter().rev());
    }
}
