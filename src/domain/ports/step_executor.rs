//! Step executor port.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::SwarmResult;
use crate::domain::models::workflow::WorkflowStep;

/// The pluggable component that performs a step's work.
///
/// The engine is agnostic to what an executor does; the only constraints
/// are that `validate_step` answers whether the step can run at all and
/// that `execute_step` honors the cancellation token at its suspension
/// points. Results may be any JSON value the state store can persist.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Whether this executor can run the step.
    async fn validate_step(&self, step: &WorkflowStep) -> SwarmResult<bool>;

    /// Perform the step against a snapshot of the execution context.
    async fn execute_step(
        &self,
        step: &WorkflowStep,
        context: &HashMap<String, Value>,
        cancel: &CancellationToken,
    ) -> SwarmResult<Value>;
}
