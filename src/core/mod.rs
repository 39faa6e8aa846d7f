//! Orchestration core: the engine, the gate, and the loops around them.

pub mod console;
pub mod gate;
pub mod journal;
pub mod notify;
pub mod orchestrator;
pub mod severity;
pub mod sync;

pub use console::Console;
pub use gate::{GateError, HilGate};
pub use journal::ProcessJournal;
pub use notify::{NotificationCategory, NotificationEvent, NotificationQueue};
pub use orchestrator::Orchestrator;
pub use severity::aggregate;
pub use sync::{Snapshot, SyncLoop};
