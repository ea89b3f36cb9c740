//! Conversation service: the remote Assistants API that owns threads and runs.
//!
//! [`ConversationService`] is the seam the gateway and the run poller talk to;
//! [`AzureAssistantsClient`] implements it over the Azure OpenAI REST surface.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;

use crate::config::AssistantConfig;
use crate::error::{AssistantError, ServiceError, ServiceResult};
use crate::tools::ToolDefinition;

/// Operations the gateway needs from the remote conversation service
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Register an assistant together with the tools it may call
    async fn create_assistant(&self, definition: &AssistantDefinition) -> ServiceResult<Assistant>;

    async fn create_thread(&self) -> ServiceResult<Thread>;

    /// Append a user message to a thread
    async fn create_message(&self, thread_id: &str, content: &str) -> ServiceResult<ThreadMessage>;

    async fn create_run(&self, thread_id: &str, request: &CreateRunRequest) -> ServiceResult<Run>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> ServiceResult<Run>;

    /// Submit every output for the pending tool calls of a run in one batch
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> ServiceResult<Run>;

    /// Messages of a thread, newest first
    async fn list_messages(&self, thread_id: &str) -> ServiceResult<Vec<ThreadMessage>>;
}

/// Run lifecycle states reported by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether the run can no longer change state
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            RunStatus::Queued
                | RunStatus::InProgress
                | RunStatus::RequiresAction
                | RunStatus::Cancelling
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// One assistant invocation over a thread
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequiredAction {
    SubmitToolOutputs {
        submit_tool_outputs: SubmitToolOutputs,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<RequiredToolCall>,
}

/// A tool invocation requested by the assistant
#[derive(Debug, Clone, Deserialize)]
pub struct RequiredToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl RunError {
    pub fn describe(&self) -> String {
        match (self.code.is_empty(), self.message.is_empty()) {
            (false, false) => format!("{}: {}", self.code, self.message),
            (false, true) => self.code.clone(),
            _ => self.message.clone(),
        }
    }
}

/// Output of one tool call, matched to the call by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }

    /// Text of the first text block, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Other => None,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: TextContent,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub value: String,
}

/// Assistant registration payload
#[derive(Debug, Clone, Serialize)]
pub struct AssistantDefinition {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// Internal API payloads

#[derive(Debug, Serialize)]
struct CreateMessageBody<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct SubmitToolOutputsBody {
    tool_outputs: Vec<ToolOutput>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// Azure OpenAI Assistants API client
pub struct AzureAssistantsClient {
    client: Client,
    config: AssistantConfig,
}

impl AzureAssistantsClient {
    /// Create a new client with the configured request timeout
    pub fn new(config: AssistantConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ServiceError::Assistant(AssistantError::Connection {
                    url: config.endpoint.clone(),
                    source: e,
                })
            })?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/openai/{}",
            self.config.endpoint.trim_end_matches('/'),
            path
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .query(&[("api-version", self.config.api_version.as_str())])
            .header("api-key", &self.config.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        let url = self.url(path);
        debug!(url = %url, "GET assistant service");
        let request = self.authorized(self.client.get(&url));
        Self::send(request, url).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ServiceResult<T> {
        let url = self.url(path);
        debug!(url = %url, "POST assistant service");
        let request = self.authorized(self.client.post(&url)).json(body);
        Self::send(request, url).await
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder, url: String) -> ServiceResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AssistantError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Assistant(AssistantError::Api { status, message }));
        }

        let body = response
            .json()
            .await
            .map_err(|e| AssistantError::InvalidResponse { url, source: e })?;
        Ok(body)
    }
}

fn segment(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

#[async_trait]
impl ConversationService for AzureAssistantsClient {
    async fn create_assistant(&self, definition: &AssistantDefinition) -> ServiceResult<Assistant> {
        self.post_json("assistants", definition).await
    }

    async fn create_thread(&self) -> ServiceResult<Thread> {
        self.post_json("threads", &serde_json::json!({})).await
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> ServiceResult<ThreadMessage> {
        let path = format!("threads/{}/messages", segment(thread_id));
        self.post_json(
            &path,
            &CreateMessageBody {
                role: "user",
                content,
            },
        )
        .await
    }

    async fn create_run(&self, thread_id: &str, request: &CreateRunRequest) -> ServiceResult<Run> {
        let path = format!("threads/{}/runs", segment(thread_id));
        self.post_json(&path, request).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> ServiceResult<Run> {
        let path = format!("threads/{}/runs/{}", segment(thread_id), segment(run_id));
        self.get_json(&path).await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> ServiceResult<Run> {
        let path = format!(
            "threads/{}/runs/{}/submit_tool_outputs",
            segment(thread_id),
            segment(run_id)
        );
        self.post_json(
            &path,
            &SubmitToolOutputsBody {
                tool_outputs: outputs,
            },
        )
        .await
    }

    async fn list_messages(&self, thread_id: &str) -> ServiceResult<Vec<ThreadMessage>> {
        let path = format!("threads/{}/messages?order=desc", segment(thread_id));
        let list: ListResponse<ThreadMessage> = self.get_json(&path).await?;
        Ok(list.data)
    }
}
