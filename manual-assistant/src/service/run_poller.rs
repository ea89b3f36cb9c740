//! Drives a remote run to a terminal state.
//!
//! Each step retrieves the run. A run waiting on tool outputs has its pending
//! calls executed in order and submitted as one batch; the run returned by
//! the submission is inspected before the next wait. Tool call ids are
//! tracked per run so a call the service reports twice is executed once.

use std::collections::HashSet;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assistants::{ConversationService, RequiredAction, Run, RunStatus, ToolOutput};
use crate::config::PollingConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::tools::ToolExecutor;

/// Summary of a run that completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Run retrievals performed
    pub steps: u32,
    /// Tool calls executed and submitted
    pub tool_calls: usize,
}

/// Polling budget for runs
#[derive(Debug, Clone, Copy)]
pub struct RunPoller {
    max_steps: u32,
    interval: Duration,
}

impl RunPoller {
    pub fn new(max_steps: u32, interval: Duration) -> Self {
        Self {
            max_steps,
            interval,
        }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.max_steps, config.interval())
    }

    /// Poll `run_id` until it completes, fails, exhausts the step budget or
    /// `cancel` fires.
    pub async fn poll_to_completion(
        &self,
        conversation: &dyn ConversationService,
        tools: &ToolExecutor,
        thread_id: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> ServiceResult<RunOutcome> {
        let result = self
            .drive(conversation, tools, thread_id, run_id, cancel)
            .await;

        let outcome = match &result {
            Ok(outcome) => {
                metrics::histogram!("assistant_poll_steps").record(outcome.steps as f64);
                "completed"
            }
            Err(ServiceError::RunFailed { .. }) => "failed",
            Err(ServiceError::RunStalled { .. }) => "stalled",
            Err(ServiceError::Cancelled { .. }) => "cancelled",
            Err(_) => "error",
        };
        metrics::counter!("assistant_runs_total", "outcome" => outcome).increment(1);

        result
    }

    async fn drive(
        &self,
        conversation: &dyn ConversationService,
        tools: &ToolExecutor,
        thread_id: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> ServiceResult<RunOutcome> {
        let mut handled: HashSet<String> = HashSet::new();
        let mut tool_calls = 0;

        for step in 1..=self.max_steps {
            if cancel.is_cancelled() {
                return Err(ServiceError::Cancelled {
                    run_id: run_id.to_string(),
                });
            }

            let mut run = conversation.retrieve_run(thread_id, run_id).await?;
            debug!(
                run_id = %run_id,
                thread_id = %run.thread_id,
                step,
                status = %run.status,
                "Retrieved run"
            );

            if run.status == RunStatus::RequiresAction {
                let outputs = dispatch_pending(tools, &run, &mut handled).await?;
                if !outputs.is_empty() {
                    tool_calls += outputs.len();
                    info!(run_id = %run_id, outputs = outputs.len(), "Submitting tool outputs");
                    run = conversation
                        .submit_tool_outputs(thread_id, run_id, outputs)
                        .await?;
                }
            }

            match run.status {
                RunStatus::Completed => {
                    info!(run_id = %run_id, steps = step, tool_calls, "Run completed");
                    return Ok(RunOutcome {
                        steps: step,
                        tool_calls,
                    });
                }
                status if status.is_terminal() => return Err(run_failed(&run)),
                _ => {}
            }

            if step < self.max_steps {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(run_id = %run_id, "Run polling cancelled");
                        return Err(ServiceError::Cancelled {
                            run_id: run_id.to_string(),
                        });
                    }
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        }

        warn!(run_id = %run_id, steps = self.max_steps, "Run did not finish within polling budget");
        Err(ServiceError::RunStalled {
            run_id: run_id.to_string(),
            steps: self.max_steps,
        })
    }
}

/// Execute every pending tool call not handled earlier in this run
async fn dispatch_pending(
    tools: &ToolExecutor,
    run: &Run,
    handled: &mut HashSet<String>,
) -> ServiceResult<Vec<ToolOutput>> {
    let calls = match &run.required_action {
        Some(RequiredAction::SubmitToolOutputs {
            submit_tool_outputs,
        }) => &submit_tool_outputs.tool_calls,
        Some(RequiredAction::Unsupported) | None => {
            return Err(ServiceError::RunFailed {
                run_id: run.id.clone(),
                status: run.status,
                last_error: Some("unsupported required action".to_string()),
            });
        }
    };

    let mut outputs = Vec::with_capacity(calls.len());
    for call in calls {
        if handled.contains(&call.id) {
            debug!(call_id = %call.id, "Skipping tool call already handled");
            continue;
        }
        let output = tools.execute(call).await?;
        handled.insert(call.id.clone());
        outputs.push(ToolOutput {
            tool_call_id: call.id.clone(),
            output,
        });
    }
    Ok(outputs)
}

fn run_failed(run: &Run) -> ServiceError {
    let last_error = run.last_error.as_ref().map(|e| e.describe());
    warn!(
        run_id = %run.id,
        status = %run.status,
        last_error = last_error.as_deref().unwrap_or(""),
        "Run ended without completing"
    );
    ServiceError::RunFailed {
        run_id: run.id.clone(),
        status: run.status,
        last_error,
    }
}
