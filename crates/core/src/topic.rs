//! Topic Classifier
//!
//! Maps free text to ranked topic labels from a fixed taxonomy using keyword
//! matching. Classification is a pure function of its input: nothing here is
//! stored as session state.

use crate::error::{CoachError, Result};
use serde::{Deserialize, Serialize};

/// One entry of the conversation taxonomy.
#[derive(Debug, Clone, Serialize)]
pub struct TopicInfo {
    pub id: &'static str,
    pub name_ko: &'static str,
    pub name_en: &'static str,
    pub keywords: &'static [&'static str],
    /// Sensitive topics are never recommended and only detected on request.
    pub sensitive: bool,
    pub description: &'static str,
}

/// The taxonomy, in declaration order. Ties in ranking follow this order.
pub static TOPIC_TAXONOMY: [TopicInfo; 15] = [
    TopicInfo {
        id: "campus_life",
        name_ko: "대학생활",
        name_en: "Campus Life",
        keywords: &["학점", "중간고사", "기말고사", "동아리", "수강신청", "개강", "종강", "캠퍼스", "학생회", "축제", "MT"],
        sensitive: false,
        description: "General campus life and university activities",
    },
    TopicInfo {
        id: "class_study",
        name_ko: "수업/과제",
        name_en: "Class & Study",
        keywords: &["과제", "레포트", "발표", "팀플", "조별과제", "수업", "강의", "시험", "공부", "필기", "출석"],
        sensitive: false,
        description: "Classes, assignments, and studying",
    },
    TopicInfo {
        id: "professor_meeting",
        name_ko: "교수님 면담",
        name_en: "Professor Meeting",
        keywords: &["교수님", "면담", "상담", "연구실", "오피스아워", "추천서", "지도교수"],
        sensitive: false,
        description: "Meeting with professors",
    },
    TopicInfo {
        id: "part_time_job",
        name_ko: "아르바이트",
        name_en: "Part-time Job",
        keywords: &["알바", "시급", "근무", "사장님", "손님", "편의점", "카페알바", "과외"],
        sensitive: false,
        description: "Part-time work experiences",
    },
    TopicInfo {
        id: "career_future",
        name_ko: "진로/취업",
        name_en: "Career & Future",
        keywords: &["취업", "진로", "인턴", "자소서", "면접", "이력서", "포트폴리오", "스펙"],
        sensitive: false,
        description: "Career planning and job hunting",
    },
    TopicInfo {
        id: "friendship",
        name_ko: "친구관계",
        name_en: "Friendship",
        keywords: &["친구", "우정", "약속", "모임", "선배", "후배", "동기", "연락"],
        sensitive: false,
        description: "Friendships and social relationships",
    },
    TopicInfo {
        id: "roommate",
        name_ko: "룸메이트/기숙사",
        name_en: "Roommate & Dorm",
        keywords: &["룸메", "룸메이트", "기숙사", "자취", "원룸", "층간소음", "청소"],
        sensitive: false,
        description: "Living arrangements and roommates",
    },
    TopicInfo {
        id: "daily_life",
        name_ko: "일상생활",
        name_en: "Daily Life",
        keywords: &["일상", "주말", "오늘", "어제", "내일", "요즘", "하루", "생활"],
        sensitive: false,
        description: "General daily life",
    },
    TopicInfo {
        id: "weather",
        name_ko: "날씨",
        name_en: "Weather",
        keywords: &["날씨", "비", "눈", "더워", "추워", "햇살", "미세먼지", "장마"],
        sensitive: false,
        description: "Weather and seasons",
    },
    TopicInfo {
        id: "cafe_food",
        name_ko: "카페/맛집",
        name_en: "Cafe & Food",
        keywords: &["카페", "맛집", "커피", "음식", "식당", "배달", "디저트", "브런치"],
        sensitive: false,
        description: "Food, cafes, and restaurants",
    },
    TopicInfo {
        id: "kpop",
        name_ko: "K-POP",
        name_en: "K-POP",
        keywords: &["아이돌", "컴백", "콘서트", "뮤비", "팬덤", "앨범", "팬미팅", "음방"],
        sensitive: false,
        description: "K-POP and idol culture",
    },
    TopicInfo {
        id: "drama_movie",
        name_ko: "드라마/영화",
        name_en: "Drama & Movie",
        keywords: &["드라마", "영화", "넷플릭스", "시청", "배우", "예능", "유튜브"],
        sensitive: false,
        description: "TV shows and movies",
    },
    TopicInfo {
        id: "museum_art",
        name_ko: "미술/전시",
        name_en: "Museum & Art",
        keywords: &["미술관", "전시", "갤러리", "작품", "예술", "사진전", "박물관"],
        sensitive: false,
        description: "Art and exhibitions",
    },
    TopicInfo {
        id: "politics",
        name_ko: "정치",
        name_en: "Politics",
        keywords: &["정치", "선거", "대통령", "국회", "여당", "야당"],
        sensitive: true,
        description: "Political topics - avoid",
    },
    TopicInfo {
        id: "religion",
        name_ko: "종교",
        name_en: "Religion",
        keywords: &["종교", "교회", "절", "성당", "기도", "신앙"],
        sensitive: true,
        description: "Religious topics - avoid",
    },
];

const FALLBACK_TOPIC: &str = "daily_life";
const FALLBACK_CONFIDENCE: f64 = 0.1;

/// A ranked classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicResult {
    pub label: String,
    pub name_ko: String,
    pub name_en: String,
    /// 0.0..=1.0, rounded to three decimals.
    pub confidence: f64,
    pub is_sensitive: bool,
    pub match_count: u32,
}

impl TopicResult {
    fn new(info: &TopicInfo, confidence: f64, match_count: u32) -> Self {
        Self {
            label: info.id.to_string(),
            name_ko: info.name_ko.to_string(),
            name_en: info.name_en.to_string(),
            confidence,
            is_sensitive: info.sensitive,
            match_count,
        }
    }
}

/// Where a recommendation came from, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    ContextCommon,
    Common,
    ContextPersona,
    Persona,
    Safe,
}

impl RecommendationSource {
    fn score(self) -> f64 {
        match self {
            RecommendationSource::ContextCommon => 1.0,
            RecommendationSource::Common => 0.9,
            RecommendationSource::ContextPersona => 0.8,
            RecommendationSource::Persona => 0.6,
            RecommendationSource::Safe => 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedTopic {
    pub label: String,
    pub name_ko: String,
    pub name_en: String,
    pub score: f64,
    pub source: RecommendationSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecommendation {
    pub recommended: Vec<RecommendedTopic>,
    pub common_topics: Vec<String>,
    pub context_detected: Vec<String>,
}

/// Lexical classifier over [`TOPIC_TAXONOMY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicClassifier;

impl TopicClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Ranks non-sensitive topics for `text`, returning at most `top_k`.
    pub fn classify(&self, text: &str, top_k: usize) -> Result<Vec<TopicResult>> {
        self.classify_with(text, top_k, false)
    }

    /// Ranks topics by descending confidence, ties in taxonomy order.
    ///
    /// When no keyword matches, a single low-confidence `daily_life` result is
    /// returned so callers always get a topic to steer the conversation with.
    pub fn classify_with(
        &self,
        text: &str,
        top_k: usize,
        include_sensitive: bool,
    ) -> Result<Vec<TopicResult>> {
        if top_k == 0 {
            return Err(CoachError::Validation(
                "top_k must be at least 1".to_string(),
            ));
        }

        let text = text.to_lowercase();
        let words = words(&text);
        let mut results: Vec<TopicResult> = TOPIC_TAXONOMY
            .iter()
            .filter(|info| include_sensitive || !info.sensitive)
            .filter_map(|info| {
                let matches = info
                    .keywords
                    .iter()
                    .filter(|kw| mentions(&words, &kw.to_lowercase()))
                    .count() as u32;
                (matches > 0).then(|| TopicResult::new(info, confidence(info, matches), matches))
            })
            .collect();

        // Stable sort keeps declaration order among equal confidences.
        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        if results.is_empty() {
            if let Some(info) = lookup(FALLBACK_TOPIC) {
                results.push(TopicResult::new(info, FALLBACK_CONFIDENCE, 0));
            }
        }

        results.truncate(top_k);
        Ok(results)
    }

    /// Suggests topics shared by the learner and a persona, optionally
    /// steered by free-text context. Sensitive topics are never suggested.
    pub fn recommend(
        &self,
        user_topics: &[String],
        persona_topics: &[String],
        context: Option<&str>,
        top_k: usize,
    ) -> Result<TopicRecommendation> {
        if top_k == 0 {
            return Err(CoachError::Validation(
                "top_k must be at least 1".to_string(),
            ));
        }

        let safe = |id: &str| lookup(id).is_some_and(|info| !info.sensitive);
        let common: Vec<&str> = TOPIC_TAXONOMY
            .iter()
            .map(|info| info.id)
            .filter(|id| safe(id))
            .filter(|id| user_topics.iter().any(|t| t == *id))
            .filter(|id| persona_topics.iter().any(|t| t == *id))
            .collect();

        let context_detected: Vec<String> = match context {
            Some(text) if !text.trim().is_empty() => self
                .classify(text, 3)?
                .into_iter()
                .map(|r| r.label)
                .collect(),
            _ => Vec::new(),
        };

        let mut recommended: Vec<RecommendedTopic> = Vec::new();
        let mut push = |id: &str, source: RecommendationSource| {
            if recommended.iter().any(|r| r.label == id) {
                return;
            }
            if let Some(info) = lookup(id) {
                recommended.push(RecommendedTopic {
                    label: info.id.to_string(),
                    name_ko: info.name_ko.to_string(),
                    name_en: info.name_en.to_string(),
                    score: source.score(),
                    source,
                });
            }
        };

        for id in context_detected.iter().filter(|id| common.contains(&id.as_str())) {
            push(id, RecommendationSource::ContextCommon);
        }
        for id in &common {
            push(id, RecommendationSource::Common);
        }
        for id in context_detected
            .iter()
            .filter(|id| persona_topics.contains(id) && safe(id))
        {
            push(id, RecommendationSource::ContextPersona);
        }
        for id in persona_topics.iter().filter(|id| safe(id)) {
            push(id, RecommendationSource::Persona);
        }
        for info in TOPIC_TAXONOMY.iter().filter(|info| !info.sensitive) {
            push(info.id, RecommendationSource::Safe);
        }

        recommended.truncate(top_k);
        Ok(TopicRecommendation {
            recommended,
            common_topics: common.into_iter().map(str::to_string).collect(),
            context_detected,
        })
    }

    pub fn list(&self, include_sensitive: bool) -> Vec<&'static TopicInfo> {
        TOPIC_TAXONOMY
            .iter()
            .filter(|info| include_sensitive || !info.sensitive)
            .collect()
    }

    pub fn get(&self, topic_id: &str) -> Result<&'static TopicInfo> {
        lookup(topic_id).ok_or_else(|| CoachError::TopicNotFound(topic_id.to_string()))
    }

    pub fn is_sensitive(&self, topic_id: &str) -> bool {
        lookup(topic_id).is_some_and(|info| info.sensitive)
    }
}

fn lookup(topic_id: &str) -> Option<&'static TopicInfo> {
    TOPIC_TAXONOMY.iter().find(|info| info.id == topic_id)
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// A keyword counts when a word starts with it, so particles may follow
/// (카페에서, 과제랑) but a keyword buried inside another word (준비) does not.
fn mentions(words: &[&str], keyword: &str) -> bool {
    words.iter().any(|w| w.starts_with(keyword))
}

fn confidence(info: &TopicInfo, matches: u32) -> f64 {
    let normalizer = (info.keywords.len() as f64 * 0.3).max(1.0);
    let raw = (f64::from(matches) / normalizer).min(1.0);
    (raw * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TopicClassifier {
        TopicClassifier::new()
    }

    #[test]
    fn test_classify_respects_top_k_and_ordering() {
        let results = classifier()
            .classify("오늘 중간고사 끝나고 카페에서 과제하고 동아리 모임 갔어", 3)
            .unwrap();
        assert!(results.len() <= 3);
        assert!(!results.is_empty());
        for pair in results.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        assert_eq!(results[0].label, "campus_life");
    }

    #[test]
    fn test_classify_rejects_zero_top_k() {
        let err = classifier().classify("아무거나", 0).unwrap_err();
        assert!(matches!(err, CoachError::Validation(_)));
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        // Both topics have eight keywords, so one hit each gives equal confidence.
        let results = classifier().classify("친구랑 알바", 5).unwrap();
        let labels: Vec<_> = results.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["part_time_job", "friendship"]);
        assert_eq!(results[0].confidence, results[1].confidence);
    }

    #[test]
    fn test_no_match_falls_back_to_daily_life() {
        let results = classifier().classify("hello", 3).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "daily_life");
        assert_eq!(results[0].confidence, 0.1);
        assert_eq!(results[0].match_count, 0);
    }

    #[test]
    fn test_sensitive_topics_hidden_unless_requested() {
        let hidden = classifier().classify("선거 때문에 정치 얘기", 3).unwrap();
        assert!(hidden.iter().all(|r| !r.is_sensitive));

        let shown = classifier()
            .classify_with("선거 때문에 정치 얘기", 3, true)
            .unwrap();
        assert_eq!(shown[0].label, "politics");
        assert!(shown[0].is_sensitive);
    }

    #[test]
    fn test_confidence_is_bounded() {
        let text = "아이돌 컴백 콘서트 뮤비 팬덤 앨범 팬미팅 음방";
        let results = classifier().classify(text, 1).unwrap();
        assert_eq!(results[0].label, "kpop");
        assert_eq!(results[0].confidence, 1.0);
        assert_eq!(results[0].match_count, 8);
    }

    #[test]
    fn test_recommend_prioritises_context_and_common() {
        let rec = classifier()
            .recommend(
                &["cafe_food".to_string(), "kpop".to_string()],
                &["daily_life".to_string(), "cafe_food".to_string(), "kpop".to_string()],
                Some("아이돌 콘서트 갔다 왔어"),
                4,
            )
            .unwrap();
        assert_eq!(rec.common_topics, vec!["cafe_food", "kpop"]);
        assert_eq!(rec.recommended[0].label, "kpop");
        assert_eq!(rec.recommended[0].source, RecommendationSource::ContextCommon);
        assert_eq!(rec.recommended[1].label, "cafe_food");
        assert_eq!(rec.recommended[1].source, RecommendationSource::Common);
        assert_eq!(rec.recommended[2].label, "daily_life");
        assert_eq!(rec.recommended[2].source, RecommendationSource::Persona);
        assert_eq!(rec.recommended.len(), 4);
    }

    #[test]
    fn test_recommend_never_suggests_sensitive_topics() {
        let rec = classifier()
            .recommend(
                &["politics".to_string()],
                &["politics".to_string(), "religion".to_string()],
                None,
                10,
            )
            .unwrap();
        assert!(rec.common_topics.is_empty());
        assert!(
            rec.recommended
                .iter()
                .all(|r| r.label != "politics" && r.label != "religion")
        );
        assert_eq!(rec.recommended.len(), 10);
    }

    #[test]
    fn test_keywords_match_word_starts_only() {
        let results = classifier().classify("발표 준비했어요", 5).unwrap();
        assert!(results.iter().all(|r| r.label != "weather"));
        assert_eq!(results[0].label, "class_study");

        let results = classifier().classify("눈이 와서 카페에서 커피 마셨어", 5).unwrap();
        let labels: Vec<_> = results.iter().map(|r| r.label.as_str()).collect();
        assert!(labels.contains(&"weather"));
        assert_eq!(labels[0], "cafe_food");

        let results = classifier().classify("준비", 3).unwrap();
        assert_eq!(results[0].label, "daily_life");
        assert_eq!(results[0].match_count, 0);
    }

    #[test]
    fn test_list_and_get() {
        assert_eq!(classifier().list(false).len(), 13);
        assert_eq!(classifier().list(true).len(), 15);
        assert_eq!(classifier().get("weather").unwrap().name_en, "Weather");
        assert!(matches!(
            classifier().get("astrology"),
            Err(CoachError::TopicNotFound(_))
        ));
        assert!(classifier().is_sensitive("religion"));
    }
}
