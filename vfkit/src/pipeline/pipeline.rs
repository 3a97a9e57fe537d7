//! Sequential pipeline executor.

use super::metrics::{PipelineMetrics, TaskMetrics};
use super::task::BoxedTask;
use std::time::Instant;
use vfkit_shared::errors::VfkitResult;

pub struct ExecutionPlan<Ctx> {
    tasks: Vec<BoxedTask<Ctx>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(tasks: Vec<BoxedTask<Ctx>>) -> Self {
        Self { tasks }
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    pub fn tasks(self) -> Vec<BoxedTask<Ctx>> {
        self.tasks
    }
}

/// Pipeline executor.
///
/// Runs tasks in plan order and stops at the first error. Tasks that ran
/// before the failure are not rolled back; whatever they stored in the
/// context is dropped with it.
pub struct PipelineExecutor;

impl PipelineExecutor {
    pub fn execute<Ctx>(plan: ExecutionPlan<Ctx>, ctx: &mut Ctx) -> VfkitResult<PipelineMetrics> {
        let total_start = Instant::now();
        let mut task_metrics = Vec::new();

        for task in plan.tasks() {
            let name = task.name().to_string();
            let task_start = Instant::now();

            task.run(ctx).inspect_err(|e| {
                tracing::debug!(task = %name, error = %e, "Pipeline task failed");
            })?;

            task_metrics.push(TaskMetrics {
                name,
                duration_ms: task_start.elapsed().as_millis(),
            });
        }

        Ok(PipelineMetrics {
            total_duration_ms: total_start.elapsed().as_millis(),
            tasks: task_metrics,
        })
    }
}
