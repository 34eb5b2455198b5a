use super::document::{DocumentState, DocumentStateInner};
use std::fmt;
use std::rc::Weak;

/// Dirty flag plus a non-owning link to the document that tracks it
#[derive(Default)]
pub struct UpdateState {
    origin: Option<Weak<DocumentStateInner>>,
    updated: bool,
}

impl UpdateState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Whether a document has claimed this state (it may since have closed)
    pub fn is_bound(&self) -> bool {
        self.origin.is_some()
    }

    pub fn origin(&self) -> Option<DocumentState> {
        self.origin
            .as_ref()
            .and_then(Weak::upgrade)
            .map(DocumentState::from_inner)
    }

    pub fn is_bound_to(&self, document: &DocumentState) -> bool {
        self.origin
            .as_ref()
            .is_some_and(|weak| document.is_same(weak))
    }

    pub fn is_updated_under(&self, document: &DocumentState) -> bool {
        self.updated && self.is_bound_to(document)
    }

    /// Mark the owner changed.
    ///
    /// Ignored unless bound to a document that accepts updates. Returns
    /// true only on the transition from clean to updated.
    pub fn update(&mut self) -> bool {
        let accepting = self
            .origin()
            .is_some_and(|document| document.is_accepting_updates());
        if !accepting || self.updated {
            return false;
        }
        self.updated = true;
        true
    }

    /// Returns true if this call established the link
    pub(crate) fn bind(&mut self, document: &DocumentState) -> bool {
        if self.origin.is_some() {
            return false;
        }
        tracing::trace!("binding update state to document");
        self.origin = Some(document.downgrade());
        true
    }
}

impl fmt::Debug for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateState")
            .field("bound", &self.is_bound())
            .field("updated", &self.updated)
            .finish()
    }
}
