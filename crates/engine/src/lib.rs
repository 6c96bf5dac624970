//! `engine` crate: workflow models, dependency-graph analysis and the
//! dependency-driven execution engine.

pub mod compare;
pub mod dag;
pub mod error;
mod evaluator;
pub mod executor;
pub mod extract;
pub mod gate;
pub mod logger;
pub mod models;
pub mod resolve;
mod scheduler;
pub mod state;

pub use dag::{validate_dag, DependencyGraph};
pub use error::{EngineError, EvalError};
pub use executor::{ExecutorConfig, RunOptions, WorkflowExecutor};
pub use logger::{LogLevel, RunLogEntry};
pub use models::{
    ConditionOperator, Connection, ExtractMode, ExtractNode, LogicOperator, Node, NodeKind,
    ParameterValue, Workflow,
};
pub use state::{ExecutionResult, NodeExecutionState};

#[cfg(test)]
mod executor_tests;
