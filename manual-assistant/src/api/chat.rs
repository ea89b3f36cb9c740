//! Chat endpoints, one per persona.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::I18nError;
use crate::service::{ChatReply, PersonaKind};

use super::AppState;

/// Query parameters of the chat endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ChatParams {
    /// User message
    pub msj: Option<String>,
    /// Thread to continue; a new thread is started when absent
    pub thread_id: Option<String>,
}

/// General purpose mechanic assistant
pub async fn asistant_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChatParams>,
) -> Result<Json<ChatReply>, I18nError> {
    chat(&state, PersonaKind::Mechanic, params).await
}

/// Topic-gated assistant
pub async fn basic_asistant_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChatParams>,
) -> Result<Json<ChatReply>, I18nError> {
    chat(&state, PersonaKind::Basic, params).await
}

async fn chat(
    state: &AppState,
    kind: PersonaKind,
    params: ChatParams,
) -> Result<Json<ChatReply>, I18nError> {
    let reply = state
        .service
        .handle(kind, params.msj.as_deref(), params.thread_id.as_deref())
        .await
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(reply))
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{API_KEY, app, send};
    use crate::test_support::FakeConversation;
    use axum::http::StatusCode;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_msj_is_bad_request_without_remote_calls() {
        for route in ["/asistant", "/basic_asistant"] {
            let conversation = Arc::new(FakeConversation::new());
            let (status, body) =
                send(app(conversation.clone()), route, Some(("api-key", API_KEY))).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{route}");
            assert_eq!(body["message"], "Falta el parámetro msj");
            assert_eq!(body["code"], "missing_parameter");
            assert!(conversation.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn test_forbidden_before_any_remote_call() {
        let conversation = Arc::new(FakeConversation::new());
        let (status, _) = send(app(conversation.clone()), "/asistant?msj=manual", None).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(conversation.calls().is_empty());
    }

    #[tokio::test]
    async fn test_chat_returns_text_and_thread() {
        let conversation = Arc::new(FakeConversation::new());
        let (status, body) = send(
            app(conversation.clone()),
            "/asistant?msj=manual%20Clio%202015&thread_id=thread_abc",
            Some(("api-key", API_KEY)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "Aquí tienes el manual.");
        assert_eq!(body["thread"], "thread_abc");
        assert_eq!(
            conversation.messages(),
            vec![("thread_abc".to_string(), "manual Clio 2015".to_string())]
        );
    }

    #[tokio::test]
    async fn test_basic_assistant_refuses_off_topic() {
        let conversation = Arc::new(FakeConversation::new());
        let (status, body) = send(
            app(conversation.clone()),
            "/basic_asistant?msj=cu%C3%A1l%20es%20la%20capital%20de%20Francia",
            Some(("api-key", API_KEY)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["text"].as_str().unwrap().starts_with("Lo siento"));
        assert_eq!(body["thread"], "thread_new_1");
        assert!(conversation.runs_created().is_empty());
    }

    #[tokio::test]
    async fn test_stalled_run_maps_to_gateway_timeout() {
        let conversation = Arc::new(
            FakeConversation::new().with_fallback(crate::assistants::RunStatus::InProgress),
        );
        let (status, body) = send(
            app(conversation),
            "/asistant?msj=manual",
            Some(("api-key", API_KEY)),
        )
        .await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["code"], "run_stalled");
    }
}
