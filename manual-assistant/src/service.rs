//! Conversation gateway: owns the remote clients and the personas.

mod chat;
mod prompts;
pub mod run_poller;
mod state;
pub mod topic_gate;

pub use run_poller::RunPoller;
pub use state::{ChatReply, Persona, PersonaKind, PersonaSettings};
pub use topic_gate::{DEFAULT_TOPIC_KEYWORDS, TopicGate};

use std::collections::HashMap;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::assistants::{AssistantDefinition, AzureAssistantsClient, ConversationService};
use crate::config::{AppConfig, PersonasConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::i18n::I18n;
use crate::search::SearchService;
use crate::tools::{ToolExecutor, tool_definitions};

/// Main service coordinator
pub struct GatewayService {
    conversation: Arc<dyn ConversationService>,
    tools: ToolExecutor,
    poller: RunPoller,
    i18n: Arc<I18n>,
    personas: HashMap<PersonaKind, Persona>,
    topic_gate: TopicGate,
    shutdown: CancellationToken,
}

impl GatewayService {
    pub fn new(
        conversation: Arc<dyn ConversationService>,
        tools: ToolExecutor,
        poller: RunPoller,
        i18n: Arc<I18n>,
        personas: Vec<Persona>,
        topic_gate: TopicGate,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            conversation,
            tools,
            poller,
            i18n,
            personas: personas.into_iter().map(|p| (p.kind, p)).collect(),
            topic_gate,
            shutdown,
        }
    }

    /// Build the remote clients and make sure every persona has an assistant
    pub async fn from_config(
        config: &AppConfig,
        i18n: Arc<I18n>,
        shutdown: CancellationToken,
    ) -> ServiceResult<Self> {
        info!("Initializing manual assistant gateway");

        let conversation: Arc<dyn ConversationService> =
            Arc::new(AzureAssistantsClient::new(config.assistant.clone())?);
        let search = Arc::new(SearchService::new(config.search.clone(), i18n.clone())?);

        let personas = provision_personas(
            conversation.as_ref(),
            &config.personas,
            config.assistant.model.as_deref(),
        )
        .await?;

        Ok(Self::new(
            conversation,
            ToolExecutor::new(search),
            RunPoller::from_config(&config.polling),
            i18n,
            personas,
            TopicGate::from_config(&config.topic_gate),
            shutdown,
        ))
    }

    pub fn persona(&self, kind: PersonaKind) -> ServiceResult<&Persona> {
        self.personas.get(&kind).ok_or_else(|| ServiceError::Internal {
            message: format!("persona {} is not configured", kind),
        })
    }

    pub fn i18n(&self) -> &Arc<I18n> {
        &self.i18n
    }

    /// Token cancelled when the process shuts down
    #[cfg(test)]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}

/// Resolve every persona, creating remote assistants for those without an id
pub async fn provision_personas(
    conversation: &dyn ConversationService,
    config: &PersonasConfig,
    model: Option<&str>,
) -> ServiceResult<Vec<Persona>> {
    let mut personas = Vec::new();

    for kind in PersonaKind::iter() {
        let persona_config = match kind {
            PersonaKind::Mechanic => &config.mechanic,
            PersonaKind::Basic => &config.basic,
        };
        let settings = PersonaSettings::resolve(kind, persona_config);

        let assistant_id = match settings.assistant_id.clone() {
            Some(id) => {
                info!(persona = %kind, assistant_id = %id, "Using configured assistant");
                id
            }
            None => {
                let model = model.ok_or_else(|| ServiceError::Config {
                    message: format!(
                        "personas.{}.assistant_id is unset and assistant.model is missing",
                        kind
                    ),
                })?;
                let assistant = conversation
                    .create_assistant(&AssistantDefinition {
                        name: settings.name.clone(),
                        model: model.to_string(),
                        instructions: settings.instructions.clone(),
                        tools: tool_definitions(),
                    })
                    .await?;
                info!(persona = %kind, assistant_id = %assistant.id, "Created assistant");
                assistant.id
            }
        };

        personas.push(settings.into_persona(assistant_id));
    }

    Ok(personas)
}
