//! Progress Notifier
//!
//! Structured progress events for observers of a pipeline run. The
//! orchestrator emits one event per phase transition and per stage result;
//! delivery is best-effort and never affects the run.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Orchestrator │────▶│ ProgressBus  │────▶│  Subscribers │
//! │   (emit)     │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{
    EventFilter, FilteredReceiver, NoopNotifier, ProgressBus, ProgressNotifier, SharedProgressBus,
};
pub use types::{ProgressEvent, ProgressStage, ProgressTag, SYSTEM_ROLE};
