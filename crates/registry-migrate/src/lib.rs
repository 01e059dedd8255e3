//! The import state machine, importer engine, blob transfer service,
//! completion notifier, route selector, and rename coordinator — the
//! components that actually move a repository from the old side to the
//! new side.

pub mod blob_transfer;
pub mod concurrency_gate;
pub mod importer;
pub mod notifier;
pub mod rename;
pub mod route;
pub mod state_machine;

pub use blob_transfer::BlobTransferService;
pub use concurrency_gate::{ConcurrencyGate, GateSlot};
pub use importer::Importer;
pub use notifier::ImportNotifier;
pub use rename::{parse_dry_run, RenameCoordinator, RenameOutcome};
pub use route::{select_route, Route};
pub use state_machine::{ImportStateMachine, ImportType, StartOutcome};
