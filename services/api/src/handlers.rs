//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for personas,
//! topics, politeness analysis and coaching sessions. It uses `utoipa` doc
//! comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use talkativ_core::{
    CoachError, ErrorKind,
    orchestrator::MAX_MESSAGE_CHARS,
    persona::{Difficulty, Role},
    relationship,
    session::Session,
};
use tracing::error;
use uuid::Uuid;

use crate::{
    models::{
        CreateSessionPayload, DetectTopicsPayload, DetectTopicsResponse, ErrorResponse,
        FeedbackResponse, FormalityResponse, PersonaQuery, PersonaResponse, PolitenessPayload,
        RecommendTopicsPayload, RecommendTopicsResponse, RelationshipPayload,
        RelationshipResponse, SendMessagePayload, SessionOverview, SessionResponse,
        SummaryResponse, TopicListQuery, TopicResponse, TurnResponse,
    },
    state::AppState,
};

/// Largest `top_k` a caller may ask for.
pub const MAX_TOP_K: usize = 10;
const DEFAULT_DETECT_TOP_K: usize = 3;
const DEFAULT_RECOMMEND_TOP_K: usize = 5;
const DEFAULT_LEARNER_AGE: u8 = 22;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// Session bookkeeping is broken. Reported apart from other failures.
    InvariantViolation(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InvariantViolation(detail) => {
                error!(%detail, "Internal bookkeeping error");
                let message = "An internal bookkeeping error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl From<CoachError> for ApiError {
    fn from(err: CoachError) -> Self {
        match err.kind() {
            ErrorKind::Validation => ApiError::BadRequest(err.to_string()),
            ErrorKind::NotFound => ApiError::NotFound(err.to_string()),
            ErrorKind::StateConflict => ApiError::Conflict(err.to_string()),
            ErrorKind::Internal => ApiError::InvariantViolation(err.to_string()),
            ErrorKind::Storage => ApiError::InternalServerError(err.into()),
        }
    }
}

fn user_id(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("x-user-id header is required".to_string()))
}

fn validate_text(text: &str) -> Result<(), ApiError> {
    let len = text.trim().chars().count();
    if len == 0 || len > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text must be between 1 and {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(())
}

fn validate_top_k(top_k: usize) -> Result<usize, ApiError> {
    if top_k > MAX_TOP_K {
        return Err(ApiError::BadRequest(format!(
            "top_k must be at most {}",
            MAX_TOP_K
        )));
    }
    Ok(top_k)
}

/// Loads a session and hides it from anyone but its owner.
async fn owned_session(state: &AppState, id: Uuid, user_id: &str) -> Result<Session, ApiError> {
    let session = state.orchestrator.get_session(id).await?;
    if session.user_id != user_id {
        return Err(CoachError::SessionNotFound(id).into());
    }
    Ok(session)
}

// --- Personas ---

/// List personas, optionally filtered by difficulty and role.
#[utoipa::path(
    get,
    path = "/personas",
    params(PersonaQuery),
    responses(
        (status = 200, description = "Personas in catalog order", body = [PersonaResponse]),
        (status = 400, description = "Unknown difficulty or role", body = ErrorResponse)
    )
)]
pub async fn list_personas(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PersonaQuery>,
) -> Result<Json<Vec<PersonaResponse>>, ApiError> {
    let difficulty = query
        .difficulty
        .as_deref()
        .map(|d| {
            Difficulty::parse(d)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown difficulty '{}'", d)))
        })
        .transpose()?;
    let role = query
        .role
        .as_deref()
        .map(|r| Role::parse(r).ok_or_else(|| ApiError::BadRequest(format!("unknown role '{}'", r))))
        .transpose()?;

    let personas = state
        .catalog
        .filter(difficulty, role)
        .into_iter()
        .map(PersonaResponse::from)
        .collect();
    Ok(Json(personas))
}

/// Get a persona by its ID.
#[utoipa::path(
    get,
    path = "/personas/{id}",
    responses(
        (status = 200, description = "Persona details", body = PersonaResponse),
        (status = 404, description = "Persona not found", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Persona ID"))
)]
pub async fn get_persona(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PersonaResponse>, ApiError> {
    let persona = state.catalog.get(&id)?;
    Ok(Json(persona.into()))
}

/// Speech-level guidance for talking to a persona.
#[utoipa::path(
    get,
    path = "/personas/{id}/formality",
    responses(
        (status = 200, description = "Formality tips", body = FormalityResponse),
        (status = 404, description = "Persona not found", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Persona ID"))
)]
pub async fn get_persona_formality(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FormalityResponse>, ApiError> {
    let persona = state.catalog.get(&id)?;
    Ok(Json(FormalityResponse::new(
        persona,
        persona.required_register.tips(),
    )))
}

// --- Topics ---

/// List the topic taxonomy.
#[utoipa::path(
    get,
    path = "/topics",
    params(TopicListQuery),
    responses((status = 200, description = "Topics in taxonomy order", body = [TopicResponse]))
)]
pub async fn list_topics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopicListQuery>,
) -> Json<Vec<TopicResponse>> {
    let topics = state
        .topics
        .list(query.include_sensitive.unwrap_or(false))
        .into_iter()
        .map(TopicResponse::from)
        .collect();
    Json(topics)
}

/// Get a topic by its ID.
#[utoipa::path(
    get,
    path = "/topics/{id}",
    responses(
        (status = 200, description = "Topic details", body = TopicResponse),
        (status = 404, description = "Topic not found", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Topic ID"))
)]
pub async fn get_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TopicResponse>, ApiError> {
    Ok(Json(state.topics.get(&id)?.into()))
}

/// Rank topics for a piece of text.
#[utoipa::path(
    post,
    path = "/topics/detect",
    request_body = DetectTopicsPayload,
    responses(
        (status = 200, description = "Ranked topics, best first", body = DetectTopicsResponse),
        (status = 400, description = "Invalid text or top_k", body = ErrorResponse)
    )
)]
pub async fn detect_topics(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DetectTopicsPayload>,
) -> Result<Json<DetectTopicsResponse>, ApiError> {
    validate_text(&payload.text)?;
    let top_k = validate_top_k(payload.top_k.unwrap_or(DEFAULT_DETECT_TOP_K))?;

    let topics = state
        .topics
        .classify_with(&payload.text, top_k, payload.include_sensitive)?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(DetectTopicsResponse { topics }))
}

/// Suggest conversation topics for a learner and persona.
#[utoipa::path(
    post,
    path = "/topics/recommend",
    request_body = RecommendTopicsPayload,
    responses(
        (status = 200, description = "Recommended topics", body = RecommendTopicsResponse),
        (status = 400, description = "Invalid top_k", body = ErrorResponse),
        (status = 404, description = "Persona not found", body = ErrorResponse)
    )
)]
pub async fn recommend_topics(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecommendTopicsPayload>,
) -> Result<Json<RecommendTopicsResponse>, ApiError> {
    let top_k = validate_top_k(payload.top_k.unwrap_or(DEFAULT_RECOMMEND_TOP_K))?;

    let persona_topics = match (payload.persona_topics, payload.persona_id.as_deref()) {
        (Some(topics), _) => topics,
        (None, Some(id)) => state
            .catalog
            .get(id)?
            .topics
            .iter()
            .map(|t| t.to_string())
            .collect(),
        (None, None) => Vec::new(),
    };

    let recommendation = state.topics.recommend(
        &payload.user_topics,
        &persona_topics,
        payload.context.as_deref(),
        top_k,
    )?;
    Ok(Json(recommendation.into()))
}

// --- Analysis ---

/// Score a sentence's speech level against an expected register.
///
/// Never fails on the text itself: empty or non-Korean text scores 0.
#[utoipa::path(
    post,
    path = "/analysis/politeness",
    request_body = PolitenessPayload,
    responses(
        (status = 200, description = "Register feedback", body = FeedbackResponse),
        (status = 400, description = "No expected register given", body = ErrorResponse),
        (status = 404, description = "Persona not found", body = ErrorResponse)
    )
)]
pub async fn analyze_politeness(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PolitenessPayload>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    if payload.text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let persona = payload
        .persona_id
        .as_deref()
        .map(|id| state.catalog.get(id))
        .transpose()?;

    let feedback = match (payload.expected_register, persona) {
        (Some(expected), Some(p)) => state.scorer.score_addressing(&payload.text, expected, p.role),
        (Some(expected), None) => state.scorer.score(&payload.text, expected),
        (None, Some(p)) => state
            .scorer
            .score_addressing(&payload.text, p.required_register, p.role),
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either expected_register or persona_id is required".to_string(),
            ));
        }
    };
    Ok(Json(feedback.into()))
}

/// Recommend a register and difficulty for talking to someone.
#[utoipa::path(
    post,
    path = "/analysis/relationship",
    request_body = RelationshipPayload,
    responses(
        (status = 200, description = "Recommended register, difficulty and tips", body = RelationshipResponse),
        (status = 400, description = "Unknown role or impossible age", body = ErrorResponse)
    )
)]
pub async fn analyze_relationship(
    Json(payload): Json<RelationshipPayload>,
) -> Result<Json<RelationshipResponse>, ApiError> {
    let role = Role::parse(&payload.listener_role).ok_or_else(|| {
        ApiError::BadRequest(format!("unknown role '{}'", payload.listener_role))
    })?;
    let analysis = relationship::analyze_relationship(
        role,
        payload.learner_age.unwrap_or(DEFAULT_LEARNER_AGE),
        payload.listener_age,
    )?;
    Ok(Json(analysis.into()))
}

// --- Sessions ---

/// Start a coaching session with a persona.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionPayload,
    responses(
        (status = 201, description = "Session created successfully", body = SessionResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Persona or topic not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user creating the session")
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let user_id = user_id(&headers)?;
    let session = state
        .orchestrator
        .start(user_id, &payload.persona_id, payload.topic.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// List all sessions for a user, newest first.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "List of sessions", body = [SessionOverview]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<SessionOverview>>, ApiError> {
    let user_id = user_id(&headers)?;
    let sessions = state.orchestrator.list_sessions(user_id).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// Get a specific session, including its full history.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user_id = user_id(&headers)?;
    let session = owned_session(&state, id, user_id).await?;
    Ok(Json(session.into()))
}

/// Send a message and get the persona's reply.
///
/// A reply that could not be generated still returns 200, with the turn
/// marked degraded and no `avatar_reply`.
#[utoipa::path(
    post,
    path = "/sessions/{id}/messages",
    request_body = SendMessagePayload,
    responses(
        (status = 200, description = "The committed turn", body = TurnResponse),
        (status = 400, description = "Invalid text", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session has ended", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<TurnResponse>, ApiError> {
    let user_id = user_id(&headers)?;
    validate_text(&payload.text)?;
    owned_session(&state, id, user_id).await?;

    let turn = state
        .orchestrator
        .send_message(id, &payload.text, payload.include_feedback)
        .await?;
    Ok(Json(turn.into()))
}

/// End a session and get its summary.
#[utoipa::path(
    post,
    path = "/sessions/{id}/end",
    responses(
        (status = 200, description = "Session summary", body = SummaryResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session already ended", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let user_id = user_id(&headers)?;
    owned_session(&state, id, user_id).await?;

    let summary = state.orchestrator.end_session(id).await?;
    Ok(Json(summary.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use talkativ_core::{
        dialogue::{DialogueGateway, ReplyPolicy},
        llm_client::{ChatMessage, LLMClient, LLMError},
        orchestrator::SessionOrchestrator,
        persona::{PersonaCatalog, Register},
        store::InMemorySessionStore,
    };

    struct CannedClient;

    #[async_trait]
    impl LLMClient for CannedClient {
        async fn chat(&self, _: String, _: Vec<ChatMessage>) -> Result<String, LLMError> {
            Ok("반가워요.".to_string())
        }
    }

    fn app_state() -> Arc<AppState> {
        let catalog = Arc::new(PersonaCatalog::builtin());
        let orchestrator = SessionOrchestrator::new(
            catalog.clone(),
            DialogueGateway::new(Arc::new(CannedClient), ReplyPolicy::default()),
            Arc::new(InMemorySessionStore::new()),
        );
        Arc::new(AppState::new(catalog, orchestrator))
    }

    fn headers(user: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_str(user).unwrap());
        headers
    }

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    async fn start(state: &Arc<AppState>, user: &str, persona: &str) -> SessionResponse {
        let (status, Json(session)) = create_session(
            State(state.clone()),
            headers(user),
            Json(CreateSessionPayload {
                persona_id: persona.to_string(),
                topic: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        session
    }

    #[test]
    fn test_coach_error_status_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(
            status_of(CoachError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoachError::SessionNotFound(id).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CoachError::SessionAlreadyEnded(id).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CoachError::Invariant("gap".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(matches!(
            ApiError::from(CoachError::Invariant("gap".into())),
            ApiError::InvariantViolation(_)
        ));
        assert!(matches!(
            ApiError::from(CoachError::Storage(anyhow::anyhow!("down"))),
            ApiError::InternalServerError(_)
        ));
    }

    #[tokio::test]
    async fn test_list_personas_filters() {
        let state = app_state();
        let Json(all) = list_personas(State(state.clone()), Query(PersonaQuery::default()))
            .await
            .unwrap();
        assert_eq!(all.len(), 5);

        let Json(hard) = list_personas(
            State(state.clone()),
            Query(PersonaQuery {
                difficulty: Some("hard".into()),
                role: None,
            }),
        )
        .await
        .unwrap();
        assert!(hard.iter().all(|p| p.difficulty == "hard"));
        assert!(!hard.is_empty());

        let err = list_personas(
            State(state),
            Query(PersonaQuery {
                difficulty: None,
                role: Some("king".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_persona_formality() {
        let Json(tips) = get_persona_formality(State(app_state()), Path("professor_kim".into()))
            .await
            .unwrap();
        assert_eq!(tips.register, Register::Formal);
        assert!(!tips.endings.is_empty());

        let err = get_persona(State(app_state()), Path("ghost".into()))
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_detect_topics_bounds() {
        let state = app_state();
        let Json(found) = detect_topics(
            State(state.clone()),
            Json(DetectTopicsPayload {
                text: "과제랑 발표 준비 때문에 바빠".into(),
                top_k: Some(3),
                include_sensitive: false,
            }),
        )
        .await
        .unwrap();
        assert!(found.topics.len() <= 3);
        assert_eq!(found.topics[0].label, "class_study");

        for top_k in [0, MAX_TOP_K + 1] {
            let err = detect_topics(
                State(state.clone()),
                Json(DetectTopicsPayload {
                    text: "과제".into(),
                    top_k: Some(top_k),
                    include_sensitive: false,
                }),
            )
            .await
            .unwrap_err();
            assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_analyze_politeness_needs_expectation() {
        let state = app_state();
        let Json(feedback) = analyze_politeness(
            State(state.clone()),
            Json(PolitenessPayload {
                text: "야 뭐해".into(),
                expected_register: None,
                persona_id: Some("professor_kim".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(feedback.detected_register, Some(Register::Casual));
        assert!(!feedback.matched);

        let Json(empty) = analyze_politeness(
            State(state.clone()),
            Json(PolitenessPayload {
                text: "".into(),
                expected_register: Some(Register::Polite),
                persona_id: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(empty.score, 0);

        let err = analyze_politeness(
            State(state),
            Json(PolitenessPayload {
                text: "안녕".into(),
                expected_register: None,
                persona_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_relationship() {
        let Json(senior) = analyze_relationship(Json(RelationshipPayload {
            listener_role: "senior".into(),
            listener_age: 26,
            learner_age: None,
        }))
        .await
        .unwrap();
        assert_eq!(senior.recommended_register, Register::Polite);
        assert_eq!(senior.difficulty, "medium");
        assert_eq!(senior.age_gap, 4);
        assert!(!senior.tips.is_empty());

        let Json(boss) = analyze_relationship(Json(RelationshipPayload {
            listener_role: "Boss".into(),
            listener_age: 35,
            learner_age: Some(24),
        }))
        .await
        .unwrap();
        assert_eq!(boss.listener_role, "supervisor");
        assert_eq!(boss.recommended_register, Register::Formal);
        assert_eq!(boss.difficulty, "hard");

        let Json(older_friend) = analyze_relationship(Json(RelationshipPayload {
            listener_role: "friend".into(),
            listener_age: 30,
            learner_age: Some(22),
        }))
        .await
        .unwrap();
        assert_eq!(older_friend.recommended_register, Register::Polite);

        let err = analyze_relationship(Json(RelationshipPayload {
            listener_role: "landlord".into(),
            listener_age: 50,
            learner_age: None,
        }))
        .await
        .unwrap_err();
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);

        let err = analyze_relationship(Json(RelationshipPayload {
            listener_role: "senior".into(),
            listener_age: 0,
            learner_age: None,
        }))
        .await
        .unwrap_err();
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_session_flow() {
        let state = app_state();
        let session = start(&state, "user_1", "minsu_senior").await;
        assert_eq!(session.greeting, "반가워요.");

        let Json(turn) = send_message(
            State(state.clone()),
            headers("user_1"),
            Path(session.id),
            Json(SendMessagePayload {
                text: "선배, 잘 지내셨어요?".into(),
                include_feedback: true,
            }),
        )
        .await
        .unwrap();
        assert_eq!(turn.index, 0);
        assert!(turn.feedback.is_some());
        assert_eq!(turn.avatar_reply.as_deref(), Some("반가워요."));

        let Json(summary) = end_session(State(state.clone()), headers("user_1"), Path(session.id))
            .await
            .unwrap();
        assert_eq!(summary.turn_count, 1);
        assert_eq!(summary.scored_turns, 1);

        let err = end_session(State(state.clone()), headers("user_1"), Path(session.id))
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::CONFLICT);

        let err = send_message(
            State(state.clone()),
            headers("user_1"),
            Path(session.id),
            Json(SendMessagePayload {
                text: "하나 더요".into(),
                include_feedback: false,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status_of(err), StatusCode::CONFLICT);

        let Json(listed) = list_sessions(State(state), headers("user_1")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].turn_count, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_scoped_to_their_owner() {
        let state = app_state();
        let session = start(&state, "user_1", "sujin_friend").await;

        let err = get_session(State(state.clone()), headers("user_2"), Path(session.id))
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);

        let err = get_session(State(state), HeaderMap::new(), Path(session.id))
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_message_rejects_empty_text() {
        let state = app_state();
        let session = start(&state, "user_1", "sujin_friend").await;
        let err = send_message(
            State(state),
            headers("user_1"),
            Path(session.id),
            Json(SendMessagePayload {
                text: "  ".into(),
                include_feedback: true,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }
}
