pub mod executions;
pub mod workflows;
