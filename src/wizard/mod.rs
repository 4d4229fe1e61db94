//! Configuration wizard
//!
//! # Module Layout
//!
//! - `engine`  -- generic ordered-step state machine
//! - `state`   -- values collected across steps
//! - `steps`   -- validity predicates and the per-surface step lists
//! - `session` -- a run bound to the control plane, with commit
//! - `answers` -- YAML-driven non-interactive runs

pub mod answers;
pub mod engine;
pub mod session;
pub mod state;
pub mod steps;

pub use answers::WizardAnswers;
pub use engine::{StepId, StepSpec, WizardEngine};
pub use session::{Advance, CommitReceipt, WizardSession};
pub use state::{RegistrationMode, WizardState};
pub use steps::Surface;
