//! Timeline Store
//!
//! Named systems, each an ordered list of committed steps. History is a
//! plain vector: committing after a seek truncates the abandoned future
//! before appending, and the discarded steps are gone for good.

use std::fmt;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::timeline::step::Step;

/// Id of the system that exists when a store is created.
pub const MAIN_SYSTEM_ID: &str = "main";

/// Label of the system that exists when a store is created.
pub const MAIN_SYSTEM_LABEL: &str = "Main System";

/// System identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(pub String);

impl SystemId {
    /// Wrap an existing id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named choreography.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct System {
    /// Unique id
    pub id: SystemId,
    /// Display label
    pub label: String,
    /// Committed steps, oldest first
    pub steps: Vec<Step>,
}

impl System {
    /// Empty system.
    pub fn new(id: SystemId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            steps: Vec::new(),
        }
    }

    /// Index of the last step, if any.
    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }
}

/// Timeline errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    /// Index outside `[0, len)`
    #[error("step index {index} out of range (len {len})")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Number of steps
        len: usize,
    },

    /// No system is selected
    #[error("no active system")]
    NoActiveSystem,

    /// No system with this id
    #[error("unknown system: {0}")]
    UnknownSystem(SystemId),
}

/// All systems plus which one is current.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineStore {
    systems: Vec<System>,
    current: Option<SystemId>,
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineStore {
    /// Store holding one empty, selected "main" system.
    pub fn new() -> Self {
        let main = SystemId::new(MAIN_SYSTEM_ID);
        Self {
            systems: vec![System::new(main.clone(), MAIN_SYSTEM_LABEL)],
            current: Some(main),
        }
    }

    /// Store with no systems at all.
    pub fn empty() -> Self {
        Self {
            systems: Vec::new(),
            current: None,
        }
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// All systems in creation order.
    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    /// Look up a system.
    pub fn system(&self, id: &SystemId) -> Result<&System, TimelineError> {
        self.systems
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| TimelineError::UnknownSystem(id.clone()))
    }

    fn system_mut(&mut self, id: &SystemId) -> Result<&mut System, TimelineError> {
        self.systems
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| TimelineError::UnknownSystem(id.clone()))
    }

    /// Add an empty system. Does not select it.
    pub fn create_system(&mut self, label: impl Into<String>) -> SystemId {
        let id = SystemId::generate();
        let label = label.into();
        debug!(system = %id, %label, "system created");
        self.systems.push(System::new(id.clone(), label));
        id
    }

    /// Change a system's label.
    pub fn rename_system(&mut self, id: &SystemId, label: impl Into<String>) -> Result<(), TimelineError> {
        self.system_mut(id)?.label = label.into();
        Ok(())
    }

    /// Delete a system. Deselects it if it was current.
    pub fn remove_system(&mut self, id: &SystemId) -> Result<System, TimelineError> {
        let pos = self
            .systems
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| TimelineError::UnknownSystem(id.clone()))?;
        if self.current.as_ref() == Some(id) {
            self.current = None;
        }
        debug!(system = %id, "system removed");
        Ok(self.systems.remove(pos))
    }

    /// Make a system current.
    pub fn select_system(&mut self, id: &SystemId) -> Result<(), TimelineError> {
        self.system(id)?;
        self.current = Some(id.clone());
        Ok(())
    }

    /// Id of the current system.
    pub fn current_id(&self) -> Result<&SystemId, TimelineError> {
        self.current.as_ref().ok_or(TimelineError::NoActiveSystem)
    }

    /// The current system.
    pub fn current_system(&self) -> Result<&System, TimelineError> {
        let id = self.current_id()?;
        self.system(id)
    }

    // =========================================================================
    // Steps
    // =========================================================================

    /// Steps of a system.
    pub fn steps(&self, id: &SystemId) -> Result<&[Step], TimelineError> {
        Ok(&self.system(id)?.steps)
    }

    /// Number of steps in a system.
    pub fn step_count(&self, id: &SystemId) -> Result<usize, TimelineError> {
        Ok(self.system(id)?.steps.len())
    }

    /// Truncate to `at_index + 1` steps, then append `step`.
    ///
    /// `at_index` is the caller's seek cursor; `None` means "before the
    /// first step" and clears the system. Returns the new last index.
    /// Unknown systems are left untouched.
    pub fn commit_step(
        &mut self,
        id: &SystemId,
        step: Step,
        at_index: Option<usize>,
    ) -> Result<usize, TimelineError> {
        let system = self.system_mut(id)?;
        let keep = at_index.map_or(0, |i| i + 1);
        let discarded = system.steps.len().saturating_sub(keep);
        system.steps.truncate(keep);
        system.steps.push(step);
        let index = system.steps.len() - 1;
        debug!(system = %id, index, discarded, "step committed");
        Ok(index)
    }

    /// Look up a step.
    pub fn seek(&self, id: &SystemId, index: usize) -> Result<&Step, TimelineError> {
        let steps = &self.system(id)?.steps;
        steps.get(index).ok_or(TimelineError::OutOfRange {
            index,
            len: steps.len(),
        })
    }

    /// Drop every step after `index`.
    pub fn truncate_to(&mut self, id: &SystemId, index: usize) -> Result<(), TimelineError> {
        let system = self.system_mut(id)?;
        let len = system.steps.len();
        if index >= len {
            return Err(TimelineError::OutOfRange { index, len });
        }
        system.steps.truncate(index + 1);
        debug!(system = %id, index, discarded = len - index - 1, "timeline truncated");
        Ok(())
    }
}
