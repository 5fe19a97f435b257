//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CreateSessionPayload, DetectTopicsPayload, DetectTopicsResponse, ErrorResponse,
        FeedbackDetails, FeedbackResponse, FormalityResponse, PersonaResponse, PolitenessPayload,
        RecommendTopicsPayload, RecommendTopicsResponse, RecommendedTopicResponse,
        RegisterBreakdown, RelationshipPayload, RelationshipResponse, SendMessagePayload,
        SessionOverview, SessionResponse, SummaryResponse, TopicResponse, TopicResultResponse,
        TurnResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_personas,
        handlers::get_persona,
        handlers::get_persona_formality,
        handlers::list_topics,
        handlers::get_topic,
        handlers::detect_topics,
        handlers::recommend_topics,
        handlers::analyze_politeness,
        handlers::analyze_relationship,
        handlers::create_session,
        handlers::list_sessions,
        handlers::get_session,
        handlers::send_message,
        handlers::end_session,
    ),
    components(
        schemas(
            PersonaResponse, FormalityResponse, TopicResponse, DetectTopicsPayload,
            DetectTopicsResponse, TopicResultResponse, RecommendTopicsPayload,
            RecommendTopicsResponse, RecommendedTopicResponse, PolitenessPayload,
            FeedbackResponse, FeedbackDetails, RegisterBreakdown, RelationshipPayload,
            RelationshipResponse, CreateSessionPayload,
            SendMessagePayload, SessionResponse, SessionOverview, TurnResponse,
            SummaryResponse, ErrorResponse
        )
    ),
    tags(
        (name = "Talkativ API", description = "Korean speech-level coaching with persona conversations")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/personas", get(handlers::list_personas))
        .route("/personas/{id}", get(handlers::get_persona))
        .route(
            "/personas/{id}/formality",
            get(handlers::get_persona_formality),
        )
        .route("/topics", get(handlers::list_topics))
        .route("/topics/{id}", get(handlers::get_topic))
        .route("/topics/detect", post(handlers::detect_topics))
        .route("/topics/recommend", post(handlers::recommend_topics))
        .route("/analysis/politeness", post(handlers::analyze_politeness))
        .route(
            "/analysis/relationship",
            post(handlers::analyze_relationship),
        )
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/messages", post(handlers::send_message))
        .route("/sessions/{id}/end", post(handlers::end_session))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
