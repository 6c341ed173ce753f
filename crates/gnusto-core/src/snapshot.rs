//! Save/restore of a world's mutable state: JSON-portable, capturing
//! everything a [`WorldStore`] holds except its shared static definitions,
//! which a restore assumes the host re-supplies unchanged.
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::store::{MutableState, WorldStore};

const SNAPSHOT_KIND: &str = "gnusto.snapshot.v1";

/// A captured save point: the current turn plus every mutable field of a
/// [`WorldStore`] — player, global bag, pronoun bindings, active fuses and
/// daemons, change log tail.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    kind: String,
    turn: u64,
    state: MutableState,
}

impl Snapshot {
    /// Captures `store`'s current mutable state at the given turn.
    pub fn capture(store: &WorldStore, turn: u64) -> Self {
        Self {
            kind: SNAPSHOT_KIND.to_string(),
            turn,
            state: store.mutable_state(),
        }
    }

    /// The turn index this snapshot was captured at.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Overwrites `store`'s mutable state with this snapshot's, leaving the
    /// store's static item/location definitions untouched, on the
    /// assumption the host re-supplies the same blueprint it started from.
    ///
    /// # Errors
    /// Returns [`EngineError::SnapshotMismatch`] if this snapshot was not
    /// produced by a version of the engine this build understands.
    pub fn restore(self, store: &mut WorldStore) -> Result<(), EngineError> {
        if self.kind != SNAPSHOT_KIND {
            return Err(EngineError::SnapshotMismatch(format!(
                "expected snapshot kind {SNAPSHOT_KIND}, found {}",
                self.kind
            )));
        }
        store.restore_mutable_state(self.state);
        Ok(())
    }

    /// Serializes to a JSON string.
    ///
    /// # Errors
    /// Returns [`EngineError::SnapshotMismatch`] if serialization fails,
    /// which would indicate a non-serializable value slipped into a typed
    /// payload — never expected in practice.
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|err| EngineError::SnapshotMismatch(err.to_string()))
    }

    /// Parses a JSON string previously produced by [`Snapshot::to_json`].
    ///
    /// # Errors
    /// Returns [`EngineError::SnapshotMismatch`] if `json` does not have the
    /// expected top-level shape.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|err| EngineError::SnapshotMismatch(err.to_string()))
    }
}
