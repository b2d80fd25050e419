// Entry pipeline, stops and position lifecycle
pub mod engine;
pub mod exit_machine;
pub mod pivot;
pub mod position;
pub mod position_manager;

pub use engine::{EntryDecision, EntryInput, SignalEngine, SkipCause};
pub use exit_machine::{ExitInputs, ExitMachine, ExitStep};
pub use pivot::{locate_stop, PivotKind};
pub use position::{ExitStage, Position};
pub use position_manager::PositionManager;
