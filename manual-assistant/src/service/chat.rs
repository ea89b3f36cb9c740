//! Per-request chat orchestration.

use tracing::info;

use crate::assistants::CreateRunRequest;
use crate::error::{ServiceError, ServiceResult};

use super::GatewayService;
use super::state::{ChatReply, PersonaKind};

impl GatewayService {
    /// Answer `message` with the given persona, continuing `thread_id` when
    /// one is supplied and starting a new thread otherwise.
    pub async fn handle(
        &self,
        kind: PersonaKind,
        message: Option<&str>,
        thread_id: Option<&str>,
    ) -> ServiceResult<ChatReply> {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| ServiceError::MissingParameter {
                name: "msj".to_string(),
            })?;
        let persona = self.persona(kind)?;

        let thread_id = match thread_id.filter(|t| !t.trim().is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let thread = self.conversation.create_thread().await?;
                info!(persona = %kind, thread_id = %thread.id, "Created thread");
                thread.id
            }
        };

        if persona.topic_gated && !self.topic_gate.allows(message) {
            info!(persona = %kind, thread_id = %thread_id, "Message refused by topic gate");
            return Ok(ChatReply {
                text: self.i18n.text("topic-refusal"),
                thread: thread_id,
            });
        }

        self.conversation.create_message(&thread_id, message).await?;

        let run = self
            .conversation
            .create_run(
                &thread_id,
                &CreateRunRequest {
                    assistant_id: persona.assistant_id.clone(),
                    instructions: persona.run_instructions.clone(),
                },
            )
            .await?;
        info!(persona = %kind, thread_id = %thread_id, run_id = %run.id, "Started run");

        let cancel = self.shutdown.child_token();
        let outcome = self
            .poller
            .poll_to_completion(
                self.conversation.as_ref(),
                &self.tools,
                &thread_id,
                &run.id,
                &cancel,
            )
            .await?;

        let messages = self.conversation.list_messages(&thread_id).await?;
        let (message_id, text) = messages
            .first()
            .filter(|m| m.is_assistant())
            .and_then(|m| m.first_text().map(|text| (m.id.as_str(), text)))
            .ok_or_else(|| ServiceError::EmptyReply {
                thread_id: thread_id.clone(),
            })?;
        info!(
            persona = %kind,
            thread_id = %thread_id,
            message_id = %message_id,
            steps = outcome.steps,
            tool_calls = outcome.tool_calls,
            "Assistant replied"
        );
        let text = text.to_string();

        Ok(ChatReply {
            text,
            thread: thread_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistants::RunStatus;
    use crate::test_support::{Call, FakeConversation, FakeSearch, gateway, run, tool_run};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_new_conversation_round_trip() {
        let conversation = Arc::new(FakeConversation::new());
        let service = gateway(conversation.clone(), FakeSearch::new("unused"));

        let reply = service
            .handle(PersonaKind::Mechanic, Some("manual Clio 2015"), None)
            .await
            .unwrap();

        assert_eq!(reply.text, "Aquí tienes el manual.");
        assert_eq!(reply.thread, "thread_new_1");
        assert_eq!(
            conversation.messages(),
            vec![("thread_new_1".to_string(), "manual Clio 2015".to_string())]
        );
        assert_eq!(
            conversation.runs_created(),
            vec![CreateRunRequest {
                assistant_id: "asst_mechanic".to_string(),
                instructions: Some("Eres un asistente de mecánica.".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_existing_thread_is_reused() {
        let conversation = Arc::new(FakeConversation::new());
        let service = gateway(conversation.clone(), FakeSearch::new("unused"));

        for text in ["hola", "manual del Clio"] {
            let reply = service
                .handle(PersonaKind::Mechanic, Some(text), Some("thread_abc"))
                .await
                .unwrap();
            assert_eq!(reply.thread, "thread_abc");
        }

        assert_eq!(conversation.threads_created(), 0);
        assert_eq!(
            conversation.messages(),
            vec![
                ("thread_abc".to_string(), "hola".to_string()),
                ("thread_abc".to_string(), "manual del Clio".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_thread_id_is_used_verbatim() {
        let conversation = Arc::new(FakeConversation::new());
        let service = gateway(conversation.clone(), FakeSearch::new("unused"));

        let reply = service
            .handle(PersonaKind::Mechanic, Some("hola"), Some(" thread_abc "))
            .await
            .unwrap();

        assert_eq!(reply.thread, " thread_abc ");
        assert_eq!(conversation.threads_created(), 0);
        assert_eq!(
            conversation.messages(),
            vec![(" thread_abc ".to_string(), "hola".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_message_makes_no_remote_call() {
        let conversation = Arc::new(FakeConversation::new());
        let service = gateway(conversation.clone(), FakeSearch::new("unused"));

        for message in [None, Some(""), Some("   ")] {
            let err = service
                .handle(PersonaKind::Basic, message, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::MissingParameter { .. }));
        }
        assert!(conversation.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_flows_through_search() {
        let conversation = Arc::new(FakeConversation::new().with_runs(vec![
            tool_run(&[(
                "call_1",
                "perform_search",
                r#"{"model": "Renault Clio", "year": "2015", "search": "manual"}"#,
            )]),
            run(RunStatus::Completed),
        ]));
        let search = FakeSearch::new("He encontrado los siguientes documentos:");
        let service = gateway(conversation.clone(), search.clone());

        service
            .handle(PersonaKind::Mechanic, Some("manual del Renault Clio 2015"), None)
            .await
            .unwrap();

        assert_eq!(search.calls().len(), 1);
        assert_eq!(conversation.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_basic_persona_gates_off_topic_messages() {
        let conversation = Arc::new(FakeConversation::new());
        let service = gateway(conversation.clone(), FakeSearch::new("unused"));

        let reply = service
            .handle(PersonaKind::Basic, Some("cuál es la capital de Francia"), None)
            .await
            .unwrap();

        assert!(reply.text.starts_with("Lo siento"));
        assert_eq!(reply.thread, "thread_new_1");
        assert_eq!(conversation.calls(), vec![Call::CreateThread]);
    }

    #[tokio::test]
    async fn test_basic_persona_runs_on_topic_messages() {
        let conversation = Arc::new(FakeConversation::new());
        let service = gateway(conversation.clone(), FakeSearch::new("unused"));

        service
            .handle(
                PersonaKind::Basic,
                Some("necesito el manual del motor de un Renault Clio 2015"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            conversation.runs_created(),
            vec![CreateRunRequest {
                assistant_id: "asst_basic".to_string(),
                instructions: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_reply_is_an_error() {
        let conversation = Arc::new(FakeConversation::new().with_reply(None));
        let service = gateway(conversation.clone(), FakeSearch::new("unused"));

        let err = service
            .handle(PersonaKind::Mechanic, Some("manual"), Some("thread_abc"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::EmptyReply { thread_id } if thread_id == "thread_abc"));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_poll() {
        let conversation =
            Arc::new(FakeConversation::new().with_fallback(RunStatus::InProgress));
        let service = gateway(conversation.clone(), FakeSearch::new("unused"));
        service.shutdown_token().cancel();

        let err = service
            .handle(PersonaKind::Mechanic, Some("manual"), Some("thread_abc"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Cancelled { .. }));
        assert_eq!(conversation.retrievals(), 0);
    }
}
