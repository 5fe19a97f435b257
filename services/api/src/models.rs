//! API Models
//!
//! Request and response bodies for the REST API, with `utoipa` schemas for the
//! OpenAPI document. Core types are mapped into these at the edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use talkativ_core::{
    persona::{FormalityTips, Persona, Register},
    register::{LevelCounts, RegisterFeedback},
    relationship::RelationshipAnalysis,
    session::{Session, SessionStatus, SessionSummary, Turn},
    topic::{RecommendationSource, RecommendedTopic, TopicInfo, TopicRecommendation, TopicResult},
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Personas ---

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct PersonaQuery {
    /// easy, medium or hard
    pub difficulty: Option<String>,
    /// friend, senior, professor, supervisor or junior
    pub role: Option<String>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct PersonaResponse {
    #[schema(example = "professor_kim")]
    pub id: String,
    pub display_name: String,
    pub display_name_en: String,
    #[schema(example = "professor")]
    pub role: String,
    #[schema(value_type = String, example = "formal")]
    pub required_register: Register,
    #[schema(example = "hard")]
    pub difficulty: String,
    pub age: u8,
    pub personality: String,
    pub topics: Vec<String>,
    pub greeting: String,
}

impl From<&Persona> for PersonaResponse {
    fn from(p: &Persona) -> Self {
        Self {
            id: p.id.to_string(),
            display_name: p.display_name.to_string(),
            display_name_en: p.display_name_en.to_string(),
            role: p.role.to_string(),
            required_register: p.required_register,
            difficulty: format!("{:?}", p.difficulty).to_lowercase(),
            age: p.age,
            personality: p.personality.to_string(),
            topics: owned(p.topics),
            greeting: p.greeting.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct FormalityResponse {
    pub persona_id: String,
    #[schema(example = "professor")]
    pub role: String,
    #[schema(value_type = String, example = "formal")]
    pub register: Register,
    pub name_ko: String,
    pub name_en: String,
    pub usage: String,
    pub endings: Vec<String>,
    pub examples: Vec<String>,
    pub honorifics: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl FormalityResponse {
    pub fn new(persona: &Persona, tips: FormalityTips) -> Self {
        Self {
            persona_id: persona.id.to_string(),
            role: persona.role.to_string(),
            register: tips.register,
            name_ko: tips.name_ko.to_string(),
            name_en: tips.name_en.to_string(),
            usage: tips.usage.to_string(),
            endings: owned(tips.endings),
            examples: owned(tips.examples),
            honorifics: owned(tips.honorifics),
        }
    }
}

// --- Topics ---

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct TopicListQuery {
    pub include_sensitive: Option<bool>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct TopicResponse {
    #[schema(example = "campus_life")]
    pub id: String,
    pub name_ko: String,
    pub name_en: String,
    pub keywords: Vec<String>,
    pub sensitive: bool,
    pub description: String,
}

impl From<&TopicInfo> for TopicResponse {
    fn from(t: &TopicInfo) -> Self {
        Self {
            id: t.id.to_string(),
            name_ko: t.name_ko.to_string(),
            name_en: t.name_en.to_string(),
            keywords: owned(t.keywords),
            sensitive: t.sensitive,
            description: t.description.to_string(),
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct DetectTopicsPayload {
    #[schema(example = "내일 중간고사라서 도서관에서 공부해야 돼")]
    pub text: String,
    #[schema(example = 3)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub include_sensitive: bool,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct TopicResultResponse {
    pub label: String,
    pub name_ko: String,
    pub name_en: String,
    pub confidence: f64,
    pub is_sensitive: bool,
    pub match_count: u32,
}

impl From<TopicResult> for TopicResultResponse {
    fn from(r: TopicResult) -> Self {
        Self {
            label: r.label,
            name_ko: r.name_ko,
            name_en: r.name_en,
            confidence: r.confidence,
            is_sensitive: r.is_sensitive,
            match_count: r.match_count,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct DetectTopicsResponse {
    pub topics: Vec<TopicResultResponse>,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct RecommendTopicsPayload {
    #[serde(default)]
    pub user_topics: Vec<String>,
    /// Use this persona's topics when `persona_topics` is not given.
    pub persona_id: Option<String>,
    pub persona_topics: Option<Vec<String>>,
    pub context: Option<String>,
    #[schema(example = 5)]
    pub top_k: Option<usize>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct RecommendedTopicResponse {
    pub label: String,
    pub name_ko: String,
    pub name_en: String,
    pub score: f64,
    #[schema(value_type = String, example = "common")]
    pub source: RecommendationSource,
}

impl From<RecommendedTopic> for RecommendedTopicResponse {
    fn from(r: RecommendedTopic) -> Self {
        Self {
            label: r.label,
            name_ko: r.name_ko,
            name_en: r.name_en,
            score: r.score,
            source: r.source,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct RecommendTopicsResponse {
    pub recommended: Vec<RecommendedTopicResponse>,
    pub common_topics: Vec<String>,
    pub context_detected: Vec<String>,
}

impl From<TopicRecommendation> for RecommendTopicsResponse {
    fn from(r: TopicRecommendation) -> Self {
        Self {
            recommended: r.recommended.into_iter().map(Into::into).collect(),
            common_topics: r.common_topics,
            context_detected: r.context_detected,
        }
    }
}

// --- Politeness analysis ---

#[derive(Deserialize, ToSchema, Debug)]
pub struct PolitenessPayload {
    #[schema(example = "교수님, 질문이 있습니다.")]
    pub text: String,
    /// Required unless `persona_id` is given.
    #[schema(value_type = Option<String>, example = "formal")]
    pub expected_register: Option<Register>,
    /// Takes the expected register and listener role from this persona.
    pub persona_id: Option<String>,
}

#[derive(Serialize, ToSchema, Debug, Clone, Default)]
pub struct RegisterBreakdown {
    pub casual: u32,
    pub polite: u32,
    pub formal: u32,
}

impl From<LevelCounts> for RegisterBreakdown {
    fn from(c: LevelCounts) -> Self {
        Self {
            casual: c.casual,
            polite: c.polite,
            formal: c.formal,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct FeedbackDetails {
    /// Sentences detected at each register.
    pub sentence_levels: RegisterBreakdown,
    pub endings_found: Vec<String>,
    pub honorifics_found: Vec<String>,
    pub honorific_points: u32,
    pub casual_markers: Vec<String>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct FeedbackResponse {
    #[schema(example = 85)]
    pub score: u8,
    /// Absent when the text held no Korean to classify.
    #[schema(value_type = Option<String>, example = "formal")]
    pub detected_register: Option<Register>,
    #[schema(value_type = String, example = "formal")]
    pub expected_register: Register,
    pub matched: bool,
    pub suggestions: Vec<String>,
    pub details: FeedbackDetails,
}

impl From<RegisterFeedback> for FeedbackResponse {
    fn from(f: RegisterFeedback) -> Self {
        Self {
            score: f.score,
            detected_register: f.detected_register,
            expected_register: f.expected_register,
            matched: f.matched,
            suggestions: f.suggestions,
            details: FeedbackDetails {
                sentence_levels: f.details.level_counts.into(),
                endings_found: f.details.endings_found,
                honorifics_found: f.details.honorifics_found,
                honorific_points: f.details.honorific_points,
                casual_markers: f.details.casual_markers,
            },
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct RelationshipPayload {
    /// friend, senior, professor, supervisor or junior
    #[schema(example = "senior")]
    pub listener_role: String,
    #[schema(example = 26)]
    pub listener_age: u8,
    /// Defaults to a 22-year-old student.
    #[schema(example = 22)]
    pub learner_age: Option<u8>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct RelationshipResponse {
    #[schema(example = "senior")]
    pub listener_role: String,
    #[schema(value_type = String, example = "polite")]
    pub recommended_register: Register,
    #[schema(example = "medium")]
    pub difficulty: String,
    pub difficulty_score: f64,
    pub power_distance: i8,
    pub age_gap: i16,
    pub tips: Vec<String>,
}

impl From<RelationshipAnalysis> for RelationshipResponse {
    fn from(a: RelationshipAnalysis) -> Self {
        Self {
            listener_role: a.listener_role.to_string(),
            recommended_register: a.recommended_register,
            difficulty: format!("{:?}", a.difficulty).to_lowercase(),
            difficulty_score: a.difficulty_score,
            power_distance: a.power_distance,
            age_gap: a.age_gap,
            tips: a.tips,
        }
    }
}

// --- Sessions ---

#[derive(Deserialize, ToSchema, Debug)]
pub struct CreateSessionPayload {
    #[schema(example = "professor_kim")]
    pub persona_id: String,
    /// Sensitive topics are ignored.
    #[schema(example = "class_study")]
    pub topic: Option<String>,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct SendMessagePayload {
    #[schema(example = "교수님, 과제 관련해서 여쭤볼 것이 있습니다.")]
    pub text: String,
    /// Score the message's register. Off unless asked for.
    #[serde(default)]
    pub include_feedback: bool,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct TurnResponse {
    pub index: u32,
    pub user_text: String,
    pub feedback: Option<FeedbackResponse>,
    /// Absent when the reply could not be generated.
    pub avatar_reply: Option<String>,
    pub degraded: bool,
    pub degraded_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<Turn> for TurnResponse {
    fn from(t: Turn) -> Self {
        Self {
            index: t.index,
            user_text: t.user_text,
            feedback: t.register_feedback.map(Into::into),
            avatar_reply: t.avatar_reply,
            degraded: t.degraded,
            degraded_reason: t.degraded_reason,
            timestamp: t.timestamp,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct SessionResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub user_id: String,
    pub persona_id: String,
    #[schema(value_type = String, example = "Active")]
    pub status: SessionStatus,
    pub topic: Option<String>,
    pub greeting: String,
    pub turns: Vec<TurnResponse>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            id: s.session_id,
            user_id: s.user_id,
            persona_id: s.persona_id,
            status: s.status,
            topic: s.topic,
            greeting: s.greeting,
            turns: s.history.into_iter().map(Into::into).collect(),
            created_at: s.created_at,
            ended_at: s.ended_at,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct SessionOverview {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub persona_id: String,
    #[schema(value_type = String, example = "Active")]
    pub status: SessionStatus,
    pub topic: Option<String>,
    pub turn_count: usize,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<Session> for SessionOverview {
    fn from(s: Session) -> Self {
        Self {
            id: s.session_id,
            turn_count: s.turn_count(),
            persona_id: s.persona_id,
            status: s.status,
            topic: s.topic,
            created_at: s.created_at,
            ended_at: s.ended_at,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct SummaryResponse {
    #[schema(value_type = String, format = Uuid)]
    pub session_id: Uuid,
    pub persona_id: String,
    pub turn_count: usize,
    pub scored_turns: usize,
    pub degraded_turns: usize,
    /// `null` when no turn was scored.
    pub average_score: Option<f64>,
    pub register_breakdown: RegisterBreakdown,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
}

impl From<SessionSummary> for SummaryResponse {
    fn from(s: SessionSummary) -> Self {
        Self {
            session_id: s.session_id,
            persona_id: s.persona_id,
            turn_count: s.turn_count,
            scored_turns: s.scored_turns,
            degraded_turns: s.degraded_turns,
            average_score: s.average_score,
            register_breakdown: s.register_breakdown.into(),
            strengths: s.strengths,
            weaknesses: s.weaknesses,
            suggestions: s.suggestions,
            started_at: s.started_at,
            ended_at: s.ended_at,
            duration_seconds: s.duration_seconds,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
