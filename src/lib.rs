//! Root crate facade: the annotation core plus its async runtime.

pub use annotext_core::*;
pub use annotext_runtime::{
    editor, engine, interaction, notification, task, Editor, Engine, Interaction, InteractionBus,
    Notification, NotificationLevel, RunOutcome, SentenceSegmentation, SimpleMatching, TaskContext,
    TaskError, TaskId, TaskInfo, TaskOptions, TaskRegistry, TaskRunState, TaskRuntime, TaskSpec,
    TaskWorker,
};
