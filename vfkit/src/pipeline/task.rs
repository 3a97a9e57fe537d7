//! Generic task trait for pipeline execution.

use vfkit_shared::errors::VfkitResult;

/// Trait for tasks that can be executed in a pipeline.
///
/// Tasks read their inputs from the context and store their outputs back
/// into it for later tasks.
pub trait PipelineTask<Ctx>: Send + Sync {
    /// Execute the task against the shared pipeline context.
    fn run(&self, ctx: &mut Ctx) -> VfkitResult<()>;

    /// Get human-readable task name for logging.
    fn name(&self) -> &str;
}

pub type BoxedTask<Ctx> = Box<dyn PipelineTask<Ctx>>;
