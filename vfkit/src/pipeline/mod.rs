//! Table-driven sequential pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ExecutionPlan → Tasks (run in order, fail fast)
//!
//! - ExecutionPlan: Ordered table of tasks
//! - Task: Atomic unit of work over a shared, mutable context
//! ```
//!
//! Every task is timed; the executor returns [`PipelineMetrics`].
//!
//! ## Example
//!
//! ```ignore
//! use pipeline::{ExecutionPlan, PipelineExecutor};
//!
//! struct Context;
//! struct TaskA;
//! struct TaskB;
//!
//! let plan = ExecutionPlan::new(vec![Box::new(TaskA), Box::new(TaskB)]);
//! let mut ctx = Context;
//! let metrics = PipelineExecutor::execute(plan, &mut ctx)?;
//! println!("pipeline took {}ms", metrics.total_duration_ms);
//! ```

mod metrics;
#[allow(clippy::module_inception)]
mod pipeline;
mod task;

pub use metrics::{PipelineMetrics, TaskMetrics};
pub use pipeline::{ExecutionPlan, PipelineExecutor};
pub use task::{BoxedTask, PipelineTask};
