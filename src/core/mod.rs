// Core plan execution: context, plan decoding and the executor

pub mod context;
pub mod executor;
pub mod plan;


pub use context::{DEFAULT_PLAN_TIMEOUT, ExecutionContext};
pub use executor::PlanExecutor;
pub use plan::{Action, Plan};
