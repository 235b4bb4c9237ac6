//! graph::revert
//!
//! Reverting tracked changes.
//!
//! - `Modified` and `MarkedForDeletion` objects get their original values
//!   back and become `Unchanged`.
//! - `New` objects are unlinked from everything pointing at them and become
//!   `Detached`.
//! - Other states are left alone.

use log::{debug, info};
use serde::Serialize;

use super::objects::ObjectId;
use super::tracker::EntityState;
use super::GraphContext;
use crate::core::error::GraphError;
use crate::core::verify::{check_navigation_inverses, AdvisoryMode};

/// What [`GraphContext::revert_changes`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevertSummary {
    /// Objects restored to their original values
    pub restored: Vec<ObjectId>,
    /// New objects removed from the graph's links
    pub discarded: Vec<ObjectId>,
}

impl GraphContext<'_> {
    /// Undo every tracked change.
    ///
    /// The advisory inverse-navigation check runs first in `advisory` mode.
    ///
    /// # Errors
    ///
    /// `AdvisoryViolation` in [`AdvisoryMode::Fail`] when the schema has
    /// collection navigations without an inverse.
    pub fn revert_changes(&mut self, advisory: AdvisoryMode) -> Result<RevertSummary, GraphError> {
        check_navigation_inverses(self.session, advisory)?;

        let tracked: Vec<(ObjectId, EntityState)> = self.tracker.entries().collect();
        let mut summary = RevertSummary::default();

        for (id, state) in tracked {
            match state {
                EntityState::Modified | EntityState::MarkedForDeletion => {
                    let original = self
                        .objects
                        .get(id)?
                        .original()
                        .map(|snapshot| snapshot.values.clone());
                    if let Some(values) = original {
                        self.objects.replace_values(id, values)?;
                    }
                    self.tracker.set_state(id, EntityState::Unchanged);
                    debug!("restored {}", id);
                    summary.restored.push(id);
                }
                EntityState::New => {
                    for (source, navigation) in self.objects.incoming(id)? {
                        self.objects.unlink(source, &navigation, id)?;
                    }
                    self.tracker.set_state(id, EntityState::Detached);
                    debug!("discarded {}", id);
                    summary.discarded.push(id);
                }
                EntityState::Unchanged | EntityState::Detached => {}
            }
        }

        info!(
            "reverted {} changed and {} new objects",
            summary.restored.len(),
            summary.discarded.len()
        );
        Ok(summary)
    }
}
