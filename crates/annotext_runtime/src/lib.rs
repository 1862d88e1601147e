//! Async side of annotext: the shared engine handle, the interaction bus and
//! the task runtime that drives segmentation and matching workers.

pub mod editor;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod notification;
pub mod task;

pub use editor::Editor;
pub use engine::Engine;
pub use error::TaskError;
pub use interaction::{Interaction, InteractionBus};
pub use notification::{Notification, NotificationLevel};
pub use task::{
    find_matches, segment, RunOutcome, SentenceSegmentation, SimpleMatching, TaskContext, TaskId,
    TaskInfo, TaskOptions, TaskRegistry, TaskRunState, TaskRuntime, TaskSpec, TaskWorker,
};
