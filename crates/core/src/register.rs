//! Register Scorer
//!
//! Classifies a Korean utterance into a speech level (반말 / 존댓말 / 격식체)
//! with a local, deterministic heuristic and grades it against the register a
//! persona expects. Scoring never fails and never touches the network, so
//! feedback stays available when the dialogue backend is not.
//!
//! Detection combines three kinds of evidence:
//!
//! 1. sentence-final endings, checked most formal first,
//! 2. honorific vocabulary (드리다, 여쭙다, 말씀, ...), worth points,
//! 3. casual vocabulary markers (야, 너, 뭐해, ㅋㅋ, ...).
//!
//! Laughter and crying runs (ㅋㅋ, ㅎㅎ, ㅠㅠ) are casual markers only. They are
//! stripped before an ending is read, so "감사합니다 ㅎㅎ" still ends in 니다.
//!
//! The score is banded by registral distance so that it is monotonic:
//! an exact match always lands in `80..=100`, an adjacent register in
//! `40..=60` and the opposite extreme in `0..=15`. Evidence only moves the
//! score inside its band.

use crate::persona::{Register, Role};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!。？！\n]+").expect("sentence split pattern"));

/// Ending patterns in detection order: the first register that matches wins.
static ENDINGS: LazyLock<[(Register, Regex); 3]> = LazyLock::new(|| {
    [
        (
            Register::Formal,
            Regex::new(r"(?:니다|니까|십시오|시오)$").expect("formal ending pattern"),
        ),
        (
            Register::Polite,
            Regex::new(r"(?:요|죠)$|^(?:네|예)$").expect("polite ending pattern"),
        ),
        (
            Register::Casual,
            Regex::new(r"(?:안녕|[아어야여지냐니래자해워와봐줘가게네라까다])$")
                .expect("casual ending pattern"),
        ),
    ]
});

/// Honorific stems and the points each contributes (counted once per stem).
const HONORIFICS: &[(&str, u32)] = &[
    ("드리", 10),
    ("드립", 10),
    ("드려", 10),
    ("여쭙", 10),
    ("여쭤", 10),
    ("말씀", 10),
    ("뵙", 10),
    ("뵈", 10),
    ("계시", 10),
    ("계세", 10),
    ("계십", 10),
    ("주무시", 10),
    ("진지", 10),
    ("성함", 10),
    ("연세", 10),
    ("혹시", 5),
    ("실례", 5),
    ("죄송", 5),
    ("감사", 5),
];

/// Whole tokens that only occur in casual speech.
const CASUAL_MARKERS: &[&str] = &[
    "야", "응", "어", "너", "나", "내가", "니가", "너가", "나는", "너는", "뭐해", "헐", "대박",
];

/// Casual word, polite replacement, formal replacement.
const WORD_CORRECTIONS: &[(&str, &str, &str)] = &[
    ("나", "저", "저"),
    ("내가", "제가", "제가"),
    ("우리", "저희", "저희"),
    ("밥", "식사", "진지"),
    ("이름", "성함", "성함"),
    ("나이", "연세", "연세"),
    ("집", "댁", "댁"),
];

const PARTICLES: &[&str] = &["은", "는", "이", "가", "을", "를", "도", "에", "의", "랑", "한테"];

const HONORIFIC_BONUS_CAP: u32 = 10;
const CONSISTENCY_BONUS: i32 = 5;
const CONSISTENCY_RATIO: f64 = 0.8;
const CASUAL_MARKER_PENALTY: i32 = 5;
const FORMAL_BY_HONORIFICS: u32 = 15;

/// Per-register sentence counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub casual: u32,
    pub polite: u32,
    pub formal: u32,
}

impl LevelCounts {
    pub fn get(&self, register: Register) -> u32 {
        match register {
            Register::Casual => self.casual,
            Register::Polite => self.polite,
            Register::Formal => self.formal,
        }
    }

    pub fn increment(&mut self, register: Register) {
        match register {
            Register::Casual => self.casual += 1,
            Register::Polite => self.polite += 1,
            Register::Formal => self.formal += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.casual + self.polite + self.formal
    }
}

/// The evidence a score was computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetails {
    pub level_counts: LevelCounts,
    pub endings_found: Vec<String>,
    pub honorifics_found: Vec<String>,
    pub honorific_points: u32,
    pub casual_markers: Vec<String>,
}

/// Register feedback for one utterance. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterFeedback {
    /// 0..=100
    pub score: u8,
    /// `None` when the input held no Korean to classify.
    pub detected_register: Option<Register>,
    pub expected_register: Register,
    pub matched: bool,
    pub suggestions: Vec<String>,
    pub details: ScoreDetails,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterScorer;

impl RegisterScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores `utterance` against `expected` without knowing who is addressed.
    pub fn score(&self, utterance: &str, expected: Register) -> RegisterFeedback {
        self.grade(utterance, expected, None)
    }

    /// Scores `utterance` and phrases suggestions for a listener in `role`.
    pub fn score_addressing(
        &self,
        utterance: &str,
        expected: Register,
        role: Role,
    ) -> RegisterFeedback {
        self.grade(utterance, expected, Some(role))
    }

    fn grade(&self, utterance: &str, expected: Register, role: Option<Role>) -> RegisterFeedback {
        let text = utterance.trim();
        if text.is_empty() {
            return unscorable(
                expected,
                "The message is empty. Write at least one Korean sentence to get feedback.",
            );
        }
        if !text.chars().any(is_hangul) {
            return unscorable(
                expected,
                "No Korean text was found. Write your sentence in Hangul so its speech level can be checked.",
            );
        }

        let details = collect_evidence(text);
        let detected = dominant_register(&details);
        let score = band_score(detected, expected, &details);
        let suggestions = suggestions_for(detected, expected, role, &details, text);

        RegisterFeedback {
            score,
            detected_register: Some(detected),
            expected_register: expected,
            matched: detected == expected,
            suggestions,
            details,
        }
    }
}

fn unscorable(expected: Register, hint: &str) -> RegisterFeedback {
    RegisterFeedback {
        score: 0,
        detected_register: None,
        expected_register: expected,
        matched: false,
        suggestions: vec![hint.to_string()],
        details: ScoreDetails::default(),
    }
}

fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7A3}' | '\u{3131}'..='\u{318E}' | '\u{1100}'..='\u{11FF}')
}

fn is_laughter(c: char) -> bool {
    matches!(c, 'ㅋ' | 'ㅎ' | 'ㅠ' | 'ㅜ')
}

/// Sentences with trailing punctuation, emoticons and laughter removed.
fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_SPLIT
        .split(text)
        .map(|s| s.trim_end_matches(|c: char| is_laughter(c) || !c.is_alphanumeric()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn sentence_level(sentence: &str) -> Option<(Register, &str)> {
    ENDINGS
        .iter()
        .find_map(|(register, pattern)| pattern.find(sentence).map(|m| (*register, m.as_str())))
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
}

fn collect_evidence(text: &str) -> ScoreDetails {
    let mut details = ScoreDetails::default();

    for sentence in split_sentences(text) {
        if let Some((register, ending)) = sentence_level(sentence) {
            details.level_counts.increment(register);
            details.endings_found.push(ending.to_string());
        }
    }

    for (stem, points) in HONORIFICS {
        if text.contains(stem) {
            details.honorifics_found.push((*stem).to_string());
            details.honorific_points += points;
        }
    }

    for token in tokens(text) {
        let word = token.trim_end_matches(is_laughter);
        if CASUAL_MARKERS.contains(&word) {
            details.casual_markers.push(word.to_string());
        }
        if word.len() < token.len() {
            details.casual_markers.push(token[word.len()..].to_string());
        }
    }

    details
}

/// Most frequent sentence level, ties broken toward the more formal register.
/// Without any recognised ending, heavy honorific use reads as formal.
fn dominant_register(details: &ScoreDetails) -> Register {
    let counts = &details.level_counts;
    if counts.total() == 0 {
        return if details.honorific_points >= FORMAL_BY_HONORIFICS {
            Register::Formal
        } else if details.casual_markers.is_empty() {
            Register::Polite
        } else {
            Register::Casual
        };
    }
    // `max_by_key` keeps the last maximum, and `ALL` runs casual to formal.
    Register::ALL
        .into_iter()
        .max_by_key(|r| counts.get(*r))
        .unwrap_or(Register::Polite)
}

fn band_score(detected: Register, expected: Register, details: &ScoreDetails) -> u8 {
    let distance = detected.distance(expected);
    let (base, floor, ceiling) = match distance {
        0 => (85, 80, 100),
        1 => (45, 40, 60),
        _ => (5, 0, 15),
    };
    let mut score: i32 = base;

    let counts = &details.level_counts;
    let total = counts.total();
    if distance < 2 && total > 0 {
        let ratio = f64::from(counts.get(detected)) / f64::from(total);
        if ratio >= CONSISTENCY_RATIO {
            score += CONSISTENCY_BONUS;
        }
    }

    // Honorifics count when the listener warrants them, or as effort
    // toward a higher register than the one actually reached.
    let honorifics_help = if distance == 0 {
        expected != Register::Casual
    } else {
        detected < expected
    };
    if honorifics_help {
        score += details.honorific_points.min(HONORIFIC_BONUS_CAP) as i32;
    }

    if expected != Register::Casual {
        score -= CASUAL_MARKER_PENALTY * details.casual_markers.len() as i32;
    }

    score.clamp(floor, ceiling) as u8
}

fn listener(role: Option<Role>) -> String {
    match role {
        Some(role) => format!("a {} ({})", role, role.name_ko()),
        None => "this listener".to_string(),
    }
}

fn register_hint(detected: Register, expected: Register, to: &str) -> Option<String> {
    let hint = match (detected, expected) {
        (Register::Casual, Register::Polite) => format!(
            "Add the polite ending -요 when speaking to {} (e.g. 뭐 해요?, 같이 가요).",
            to
        ),
        (Register::Casual, Register::Formal) => format!(
            "Casual speech is too familiar for {}. Use formal endings such as -습니다 / -습니까 (e.g. 무엇을 하십니까?).",
            to
        ),
        (Register::Polite, Register::Formal) => format!(
            "Switch -요 endings to -습니다 / -습니까 when addressing {}.",
            to
        ),
        (Register::Polite, Register::Casual) => format!(
            "-요 endings sound distant with {}. Casual endings like -어 / -아 are more natural.",
            to
        ),
        (Register::Formal, Register::Casual) => format!(
            "Formal -습니다 speech sounds stiff with {}. Drop to casual endings like -어 / -지.",
            to
        ),
        (Register::Formal, Register::Polite) => format!(
            "-습니다 is more formal than needed with {}. Friendly -요 endings are enough.",
            to
        ),
        _ => return None,
    };
    Some(hint)
}

fn word_corrections(text: &str, expected: Register, to: &str) -> Vec<String> {
    let mut hints = Vec::new();
    for (casual, polite, formal) in WORD_CORRECTIONS {
        let used = tokens(text).any(|token| {
            token == *casual
                || token
                    .strip_prefix(casual)
                    .is_some_and(|rest| PARTICLES.contains(&rest))
        });
        if used {
            let better = if expected == Register::Formal { formal } else { polite };
            hints.push(format!(
                "Say '{}' instead of '{}' when speaking to {}.",
                better, casual, to
            ));
        }
    }
    hints
}

fn suggestions_for(
    detected: Register,
    expected: Register,
    role: Option<Role>,
    details: &ScoreDetails,
    text: &str,
) -> Vec<String> {
    let to = listener(role);
    let mut suggestions = Vec::new();

    if let Some(hint) = register_hint(detected, expected, &to) {
        suggestions.push(hint);
    }

    if expected == Register::Formal && detected != Register::Formal && details.honorific_points == 0
    {
        suggestions.push(format!(
            "Use honorific vocabulary with {}: 드리다 instead of 주다, 여쭙다 instead of 묻다, 말씀 instead of 말.",
            to
        ));
    }

    if expected != Register::Casual {
        suggestions.extend(word_corrections(text, expected, &to));
    }

    let counts = &details.level_counts;
    if counts.total() > 1 {
        let mixed: Vec<String> = Register::ALL
            .into_iter()
            .filter(|r| counts.get(*r) > 0)
            .map(|r| r.name_ko().to_string())
            .collect();
        if mixed.len() > 1 {
            suggestions.push(format!(
                "Keep one speech level throughout. This message mixes {}.",
                mixed.join(" and ")
            ));
        }
    }

    suggestions
}
