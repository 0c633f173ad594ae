use serde::Serialize;
use std::time::{Duration, Instant};

pub const LATEST_VERSION: &str = "$LATEST";

/// Execution context handed to a handler during local invocation.
#[derive(Debug, Clone)]
pub struct LambdaContext {
    pub function_name: String,
    pub function_version: String,
    pub memory_limit_in_mb: u32,
    pub aws_request_id: String,
    pub invoked_function_arn: Option<String>,
    pub timeout: Duration,
    started: Instant,
}

impl LambdaContext {
    pub fn new(function_name: impl Into<String>, timeout: Duration, memory_limit_in_mb: u32) -> Self {
        Self {
            function_name: function_name.into(),
            function_version: LATEST_VERSION.to_string(),
            memory_limit_in_mb,
            aws_request_id: uuid::Uuid::new_v4().to_string(),
            invoked_function_arn: None,
            timeout,
            started: Instant::now(),
        }
    }

    /// Milliseconds left of the timeout budget, never below zero.
    pub fn remaining_time_in_millis(&self) -> u64 {
        self.remaining_time_at(Instant::now())
    }

    pub fn remaining_time_at(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.started);
        self.timeout.saturating_sub(elapsed).as_millis() as u64
    }

    /// Snapshot sent across a process boundary. The receiving side starts
    /// its own clock on the full timeout right before calling the handler.
    pub fn to_fields(&self) -> ContextFields {
        ContextFields {
            function_name: self.function_name.clone(),
            function_version: self.function_version.clone(),
            memory_limit_in_mb: self.memory_limit_in_mb,
            aws_request_id: self.aws_request_id.clone(),
            invoked_function_arn: self.invoked_function_arn.clone(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextFields {
    pub function_name: String,
    pub function_version: String,
    pub memory_limit_in_mb: u32,
    pub aws_request_id: String,
    pub invoked_function_arn: Option<String>,
    pub timeout_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_time_counts_down_and_saturates() {
        let ctx = LambdaContext::new("f", Duration::from_secs(3), 128);
        let start = ctx.started;

        assert_eq!(ctx.remaining_time_at(start), 3000);
        assert_eq!(ctx.remaining_time_at(start + Duration::from_millis(1200)), 1800);
        assert_eq!(ctx.remaining_time_at(start + Duration::from_secs(10)), 0);
    }

    #[test]
    fn each_context_gets_a_fresh_request_id() {
        let a = LambdaContext::new("f", Duration::from_secs(1), 128);
        let b = LambdaContext::new("f", Duration::from_secs(1), 128);
        assert_ne!(a.aws_request_id, b.aws_request_id);
        assert_eq!(a.function_version, "$LATEST");
        assert!(a.invoked_function_arn.is_none());
    }

    #[test]
    fn fields_carry_identity_and_budget() {
        let ctx = LambdaContext::new("orders", Duration::from_secs(15), 512);
        let fields = serde_json::to_value(ctx.to_fields()).unwrap();
        assert_eq!(fields["function_name"], "orders");
        assert_eq!(fields["memory_limit_in_mb"], 512);
        assert_eq!(fields["timeout_ms"], 15_000);
    }
}
