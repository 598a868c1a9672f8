pub mod autosave;
pub mod entry_flow;
pub mod review_ctx;
pub mod review_flow;
pub mod steps;

pub use autosave::{AutosaveRegistry, AutosaveStatus, Autosaver, DraftSink};
pub use entry_flow::{AdvanceOutcome, EntryFlow};
pub use review_ctx::ReviewCtx;
pub use review_flow::{ReviewEvent, ReviewFlow, ReviewJob};
pub use steps::{WorkflowState, WorkflowStep, WorkflowView};
