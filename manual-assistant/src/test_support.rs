//! In-memory fakes of the remote services for unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::assistants::{
    Assistant, AssistantDefinition, ConversationService, CreateRunRequest, FunctionCall,
    MessageContent, RequiredAction, RequiredToolCall, Run, RunStatus, SubmitToolOutputs,
    TextContent, Thread, ThreadMessage, ToolOutput,
};
use crate::error::ServiceResult;
use crate::i18n::I18n;
use crate::search::DocumentSearch;
use crate::service::{GatewayService, Persona, PersonaKind, RunPoller, TopicGate};
use crate::tools::ToolExecutor;

/// A run in `status` with no pending action
pub fn run(status: RunStatus) -> Run {
    Run {
        id: "run_1".to_string(),
        thread_id: "thread_1".to_string(),
        status,
        required_action: None,
        last_error: None,
    }
}

/// A run waiting on the given `(id, tool, arguments)` calls
pub fn tool_run(calls: &[(&str, &str, &str)]) -> Run {
    let tool_calls = calls
        .iter()
        .map(|(id, name, arguments)| RequiredToolCall {
            id: id.to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        })
        .collect();

    Run {
        required_action: Some(RequiredAction::SubmitToolOutputs {
            submit_tool_outputs: SubmitToolOutputs { tool_calls },
        }),
        ..run(RunStatus::RequiresAction)
    }
}

/// Every call made against [`FakeConversation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateAssistant { name: String },
    CreateThread,
    CreateMessage { thread_id: String, content: String },
    CreateRun { thread_id: String, request: CreateRunRequest },
    RetrieveRun { thread_id: String, run_id: String },
    SubmitToolOutputs { run_id: String, outputs: Vec<ToolOutput> },
    ListMessages { thread_id: String },
}

/// Scripted conversation service.
///
/// `retrieve_run` pops scripted runs in order and then keeps answering with
/// the fallback status.
pub struct FakeConversation {
    script: Mutex<VecDeque<Run>>,
    fallback: RunStatus,
    submit_status: RunStatus,
    reply: Option<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeConversation {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: RunStatus::Completed,
            submit_status: RunStatus::Queued,
            reply: Some("Aquí tienes el manual.".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_runs(self, runs: Vec<Run>) -> Self {
        *self.script.lock().unwrap() = runs.into();
        self
    }

    pub fn with_fallback(mut self, status: RunStatus) -> Self {
        self.fallback = status;
        self
    }

    pub fn with_submit_status(mut self, status: RunStatus) -> Self {
        self.submit_status = status;
        self
    }

    pub fn with_reply(mut self, reply: Option<&str>) -> Self {
        self.reply = reply.map(String::from);
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn retrievals(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::RetrieveRun { .. }))
            .count()
    }

    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SubmitToolOutputs { outputs, .. } => Some(outputs),
                _ => None,
            })
            .collect()
    }

    pub fn threads_created(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateThread))
            .count()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateMessage { thread_id, content } => Some((thread_id, content)),
                _ => None,
            })
            .collect()
    }

    pub fn runs_created(&self) -> Vec<CreateRunRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateRun { request, .. } => Some(request),
                _ => None,
            })
            .collect()
    }
}

impl Default for FakeConversation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationService for FakeConversation {
    async fn create_assistant(&self, definition: &AssistantDefinition) -> ServiceResult<Assistant> {
        self.record(Call::CreateAssistant {
            name: definition.name.clone(),
        });
        Ok(Assistant {
            id: format!("asst_{}", definition.name),
        })
    }

    async fn create_thread(&self) -> ServiceResult<Thread> {
        self.record(Call::CreateThread);
        Ok(Thread {
            id: format!("thread_new_{}", self.threads_created()),
        })
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> ServiceResult<ThreadMessage> {
        self.record(Call::CreateMessage {
            thread_id: thread_id.to_string(),
            content: content.to_string(),
        });
        Ok(ThreadMessage {
            id: "msg_user".to_string(),
            role: "user".to_string(),
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: content.to_string(),
                },
            }],
        })
    }

    async fn create_run(&self, thread_id: &str, request: &CreateRunRequest) -> ServiceResult<Run> {
        self.record(Call::CreateRun {
            thread_id: thread_id.to_string(),
            request: request.clone(),
        });
        Ok(Run {
            thread_id: thread_id.to_string(),
            ..run(RunStatus::Queued)
        })
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> ServiceResult<Run> {
        self.record(Call::RetrieveRun {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
        });
        let scripted = self.script.lock().unwrap().pop_front();
        let current = scripted.unwrap_or_else(|| run(self.fallback));
        Ok(Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            ..current
        })
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> ServiceResult<Run> {
        self.record(Call::SubmitToolOutputs {
            run_id: run_id.to_string(),
            outputs,
        });
        Ok(Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            ..run(self.submit_status)
        })
    }

    async fn list_messages(&self, thread_id: &str) -> ServiceResult<Vec<ThreadMessage>> {
        self.record(Call::ListMessages {
            thread_id: thread_id.to_string(),
        });
        Ok(self
            .reply
            .iter()
            .map(|text| ThreadMessage {
                id: "msg_assistant".to_string(),
                role: "assistant".to_string(),
                content: vec![MessageContent::Text {
                    text: TextContent {
                        value: text.clone(),
                    },
                }],
            })
            .collect())
    }
}

/// Document search returning a fixed summary and recording its arguments
pub struct FakeSearch {
    reply: String,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeSearch {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentSearch for FakeSearch {
    async fn search(&self, model: &str, year: &str, query: &str) -> String {
        self.calls.lock().unwrap().push((
            model.to_string(),
            year.to_string(),
            query.to_string(),
        ));
        self.reply.clone()
    }
}

/// Gateway wired to the given fakes with both personas configured
pub fn gateway(conversation: Arc<FakeConversation>, search: Arc<FakeSearch>) -> GatewayService {
    let personas = vec![
        Persona {
            kind: PersonaKind::Mechanic,
            assistant_id: "asst_mechanic".to_string(),
            run_instructions: Some("Eres un asistente de mecánica.".to_string()),
            topic_gated: false,
        },
        Persona {
            kind: PersonaKind::Basic,
            assistant_id: "asst_basic".to_string(),
            run_instructions: None,
            topic_gated: true,
        },
    ];

    GatewayService::new(
        conversation,
        ToolExecutor::new(search),
        RunPoller::new(5, Duration::from_millis(1)),
        Arc::new(I18n::new("es")),
        personas,
        TopicGate::default(),
        CancellationToken::new(),
    )
}
