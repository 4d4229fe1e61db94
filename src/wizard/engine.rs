//! Generic step state machine
//!
//! [`WizardEngine`] knows nothing about onboarding. It holds an ordered list
//! of [`StepSpec`]s, each with a validity predicate over some state `S`, and
//! a cursor. Surfaces inject their own step lists (see
//! [`super::steps::Surface`]).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OnboardError, Result};

/// Identifier of a wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    /// Name, URL, description
    General,
    /// Strategy selection and credentials
    Authentication,
    /// Ownership mode
    Type,
    /// Tool allow-list
    Tools,
    /// Team scoping
    Teams,
    /// Operational account setup
    OperationalAccount,
}

impl StepId {
    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::General => "general",
            StepId::Authentication => "authentication",
            StepId::Type => "type",
            StepId::Tools => "tools",
            StepId::Teams => "teams",
            StepId::OperationalAccount => "operational_account",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step: id, display label and validity predicate.
pub struct StepSpec<S> {
    /// Step identifier
    pub id: StepId,
    /// Human-readable label
    pub label: &'static str,
    /// Returns `true` when the step is complete for the given state
    pub validate: fn(&S) -> bool,
}

// Manual impls: deriving would require `S: Clone` / `S: Debug`.
impl<S> Clone for StepSpec<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for StepSpec<S> {}

impl<S> fmt::Debug for StepSpec<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSpec")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

/// Ordered steps plus a cursor.
///
/// # Examples
///
/// ```
/// use mcp_onboard::wizard::engine::{StepId, StepSpec, WizardEngine};
///
/// let steps = vec![
///     StepSpec { id: StepId::General, label: "General", validate: |n: &u32| *n > 0 },
///     StepSpec { id: StepId::Tools, label: "Tools", validate: |_: &u32| true },
/// ];
/// let mut engine = WizardEngine::new(steps).unwrap();
///
/// assert!(engine.next(&0).is_err());
/// assert_eq!(engine.next(&1).unwrap(), Some(StepId::Tools));
/// assert!(engine.is_last());
/// ```
#[derive(Debug, Clone)]
pub struct WizardEngine<S> {
    steps: Vec<StepSpec<S>>,
    index: usize,
}

impl<S> WizardEngine<S> {
    /// Creates an engine positioned on the first step.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Wizard`] for an empty list or a repeated id.
    pub fn new(steps: Vec<StepSpec<S>>) -> Result<Self> {
        if steps.is_empty() {
            return Err(OnboardError::Wizard("a wizard needs at least one step".to_string()).into());
        }
        for (i, step) in steps.iter().enumerate() {
            if steps[..i].iter().any(|s| s.id == step.id) {
                return Err(OnboardError::Wizard(format!("duplicate step '{}'", step.id)).into());
            }
        }
        Ok(Self { steps, index: 0 })
    }

    /// The current step id.
    pub fn current(&self) -> StepId {
        self.steps[self.index].id
    }

    /// The current step spec.
    pub fn current_step(&self) -> &StepSpec<S> {
        &self.steps[self.index]
    }

    /// Zero-based position of the cursor.
    pub fn position(&self) -> usize {
        self.index
    }

    /// All steps in order.
    pub fn steps(&self) -> &[StepSpec<S>] {
        &self.steps
    }

    /// Step ids in order.
    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id).collect()
    }

    /// Returns `true` when the cursor is on the final step.
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.steps.len()
    }

    /// Whether the current step's predicate holds.
    pub fn can_proceed(&self, state: &S) -> bool {
        (self.current_step().validate)(state)
    }

    /// Moves forward one step.
    ///
    /// Returns the new step, or `None` when already on the last step (the
    /// caller commits).
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Wizard`] when the current step is incomplete.
    pub fn next(&mut self, state: &S) -> Result<Option<StepId>> {
        if !self.can_proceed(state) {
            return Err(OnboardError::Wizard(format!(
                "step '{}' is incomplete",
                self.current_step().label
            ))
            .into());
        }
        if self.is_last() {
            return Ok(None);
        }
        self.index += 1;
        Ok(Some(self.current()))
    }

    /// Moves back one step, unconditionally. `None` on the first step.
    pub fn prev(&mut self) -> Option<StepId> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(self.current())
    }

    /// Jumps to `id`.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Wizard`] when the step is not part of this
    /// wizard.
    pub fn go_to(&mut self, id: StepId) -> Result<()> {
        match self.steps.iter().position(|s| s.id == id) {
            Some(index) => {
                self.index = index;
                Ok(())
            }
            None => Err(OnboardError::Wizard(format!("step '{id}' is not part of this wizard")).into()),
        }
    }

    /// The first step, in order, whose predicate fails.
    pub fn first_invalid(&self, state: &S) -> Option<StepId> {
        self.steps
            .iter()
            .find(|s| !(s.validate)(state))
            .map(|s| s.id)
    }

    /// Label of `id`, if present.
    pub fn label_of(&self, id: StepId) -> Option<&'static str> {
        self.steps.iter().find(|s| s.id == id).map(|s| s.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Form {
        name: String,
        agreed: bool,
    }

    fn engine() -> WizardEngine<Form> {
        WizardEngine::new(vec![
            StepSpec {
                id: StepId::General,
                label: "General",
                validate: |f: &Form| !f.name.is_empty(),
            },
            StepSpec {
                id: StepId::Type,
                label: "Type",
                validate: |_: &Form| true,
            },
            StepSpec {
                id: StepId::Teams,
                label: "Teams",
                validate: |f: &Form| f.agreed,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_next_refused_until_step_valid() {
        let mut engine = engine();
        let mut form = Form::default();
        assert!(!engine.can_proceed(&form));
        assert!(engine.next(&form).is_err());
        assert_eq!(engine.current(), StepId::General);

        form.name = "X".to_string();
        assert_eq!(engine.next(&form).unwrap(), Some(StepId::Type));
    }

    #[test]
    fn test_prev_is_unconditional_and_stops_at_start() {
        let mut engine = engine();
        let form = Form {
            name: "X".to_string(),
            agreed: false,
        };
        engine.next(&form).unwrap();
        engine.next(&form).unwrap();
        assert_eq!(engine.prev(), Some(StepId::Type));
        assert_eq!(engine.prev(), Some(StepId::General));
        assert_eq!(engine.prev(), None);
    }

    #[test]
    fn test_next_on_last_step_returns_none() {
        let mut engine = engine();
        let form = Form {
            name: "X".to_string(),
            agreed: true,
        };
        engine.go_to(StepId::Teams).unwrap();
        assert!(engine.is_last());
        assert_eq!(engine.next(&form).unwrap(), None);
        assert_eq!(engine.current(), StepId::Teams);
    }

    #[test]
    fn test_go_to_unknown_step_fails() {
        let mut engine = engine();
        assert!(engine.go_to(StepId::OperationalAccount).is_err());
    }

    #[test]
    fn test_first_invalid_in_order() {
        let engine = engine();
        let form = Form::default();
        assert_eq!(engine.first_invalid(&form), Some(StepId::General));
        let form = Form {
            name: "X".to_string(),
            agreed: false,
        };
        assert_eq!(engine.first_invalid(&form), Some(StepId::Teams));
    }

    #[test]
    fn test_new_rejects_empty_and_duplicates() {
        assert!(WizardEngine::<Form>::new(vec![]).is_err());
        let step = StepSpec {
            id: StepId::Type,
            label: "Type",
            validate: |_: &Form| true,
        };
        assert!(WizardEngine::new(vec![step, step]).is_err());
    }
}
