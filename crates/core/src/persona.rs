//! Persona Catalog
//!
//! The closed set of conversational partners a learner can practise with.
//! Personas are compiled in, loaded once into an immutable [`PersonaCatalog`]
//! and shared freely without locking.

use crate::error::{CoachError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The social role of a persona relative to the learner (a university student).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Friend,
    Senior,
    Professor,
    Supervisor,
    Junior,
}

impl Role {
    /// Korean form of address used in feedback text.
    pub fn name_ko(self) -> &'static str {
        match self {
            Role::Friend => "친구",
            Role::Senior => "선배",
            Role::Professor => "교수님",
            Role::Supervisor => "상사",
            Role::Junior => "후배",
        }
    }

    /// The register a student is expected to use with someone in this role.
    pub fn recommended_register(self) -> Register {
        match self {
            Role::Professor | Role::Supervisor => Register::Formal,
            Role::Senior => Register::Polite,
            Role::Friend | Role::Junior => Register::Casual,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "friend" => Some(Role::Friend),
            "senior" => Some(Role::Senior),
            "professor" => Some(Role::Professor),
            "supervisor" | "boss" => Some(Role::Supervisor),
            "junior" => Some(Role::Junior),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Friend => "friend",
            Role::Senior => "senior",
            Role::Professor => "professor",
            Role::Supervisor => "supervisor",
            Role::Junior => "junior",
        };
        write!(f, "{}", s)
    }
}

/// Social formality tier of an utterance, ordered from least to most formal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    /// 반말
    Casual,
    /// 존댓말 (-요)
    Polite,
    /// 격식체 (-습니다)
    Formal,
}

impl Register {
    pub const ALL: [Register; 3] = [Register::Casual, Register::Polite, Register::Formal];

    pub fn rank(self) -> u8 {
        match self {
            Register::Casual => 0,
            Register::Polite => 1,
            Register::Formal => 2,
        }
    }

    /// Number of tiers between two registers (0, 1 or 2).
    pub fn distance(self, other: Register) -> u8 {
        self.rank().abs_diff(other.rank())
    }

    pub fn name_ko(self) -> &'static str {
        match self {
            Register::Casual => "반말",
            Register::Polite => "존댓말",
            Register::Formal => "격식체",
        }
    }

    /// Speech-style guidance injected into the persona's system prompt.
    pub fn prompt_instruction(self) -> &'static str {
        match self {
            Register::Casual => {
                "반말을 사용하세요. 친한 친구나 후배와 대화하는 것처럼 편하게 말하세요.\n\
                 - 문장 끝: ~어/아, ~지, ~냐, ~야\n\
                 - 예: \"뭐해?\", \"밥 먹었어?\", \"같이 가자\""
            }
            Register::Polite => {
                "존댓말(-요)을 사용하세요. 예의 바르지만 친근하게 말하세요.\n\
                 - 문장 끝: ~요, ~세요, ~죠\n\
                 - 예: \"뭐 해요?\", \"밥 먹었어요?\", \"같이 가요\""
            }
            Register::Formal => {
                "격식체(-습니다)를 사용하세요. 매우 공손하게 말하세요.\n\
                 - 문장 끝: ~습니다, ~습니까, ~십시오\n\
                 - 높임말: 드리다, 여쭙다, 말씀, 뵙다\n\
                 - 예: \"무엇을 하십니까?\", \"식사하셨습니까?\""
            }
        }
    }

    pub fn tips(self) -> FormalityTips {
        match self {
            Register::Casual => FormalityTips {
                register: self,
                name_ko: "반말",
                name_en: "Casual",
                usage: "친구, 후배, 어린 사람에게",
                endings: &["-어/아", "-지", "-냐", "-야"],
                examples: &["뭐해?", "밥 먹었어?", "같이 가자"],
                honorifics: &[],
            },
            Register::Polite => FormalityTips {
                register: self,
                name_ko: "존댓말",
                name_en: "Polite",
                usage: "선배, 처음 만난 사람, 약간 나이 많은 사람에게",
                endings: &["-요", "-세요", "-죠"],
                examples: &["뭐 해요?", "밥 먹었어요?", "같이 가요"],
                honorifics: &[],
            },
            Register::Formal => FormalityTips {
                register: self,
                name_ko: "격식체",
                name_en: "Formal",
                usage: "교수님, 상사, 공식적인 상황에서",
                endings: &["-습니다", "-습니까", "-십시오"],
                examples: &["무엇을 하십니까?", "식사하셨습니까?"],
                honorifics: &["드리다", "여쭙다", "말씀", "뵙다", "계시다"],
            },
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Register::Casual => "casual",
            Register::Polite => "polite",
            Register::Formal => "formal",
        };
        write!(f, "{}", s)
    }
}

/// How to speak in a given register.
#[derive(Debug, Clone, Serialize)]
pub struct FormalityTips {
    pub register: Register,
    pub name_ko: &'static str,
    pub name_en: &'static str,
    pub usage: &'static str,
    pub endings: &'static [&'static str],
    pub examples: &'static [&'static str],
    pub honorifics: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// A fixed conversational counterpart.
#[derive(Debug, Clone, Serialize)]
pub struct Persona {
    pub id: &'static str,
    pub display_name: &'static str,
    pub display_name_en: &'static str,
    pub role: Role,
    pub required_register: Register,
    pub difficulty: Difficulty,
    pub age: u8,
    pub personality: &'static str,
    /// Topic ids from the taxonomy this persona likes to talk about.
    pub topics: &'static [&'static str],
    /// Static greeting, used when the generated one is unavailable.
    pub greeting: &'static str,
}

const BUILTIN_PERSONAS: [Persona; 5] = [
    Persona {
        id: "minsu_senior",
        display_name: "민수 선배",
        display_name_en: "Minsu (Senior)",
        role: Role::Senior,
        required_register: Register::Polite,
        difficulty: Difficulty::Medium,
        age: 26,
        personality: "친근하고 잘 도와주는 선배",
        topics: &["campus_life", "class_study", "career_future", "friendship"],
        greeting: "안녕! 오랜만이다. 요즘 어떻게 지내?",
    },
    Persona {
        id: "professor_kim",
        display_name: "김 교수님",
        display_name_en: "Professor Kim",
        role: Role::Professor,
        required_register: Register::Formal,
        difficulty: Difficulty::Hard,
        age: 52,
        personality: "엄격하지만 학생들을 챙겨주시는 교수님",
        topics: &["professor_meeting", "class_study", "career_future"],
        greeting: "어서 오세요. 무슨 일로 왔나요?",
    },
    Persona {
        id: "sujin_friend",
        display_name: "수진",
        display_name_en: "Sujin (Friend)",
        role: Role::Friend,
        required_register: Register::Casual,
        difficulty: Difficulty::Easy,
        age: 22,
        personality: "밝고 수다스러운 동기",
        topics: &["daily_life", "cafe_food", "kpop", "drama_movie", "friendship"],
        greeting: "야! 왔어? 뭐해?",
    },
    Persona {
        id: "manager_lee",
        display_name: "이 매니저님",
        display_name_en: "Manager Lee",
        role: Role::Supervisor,
        required_register: Register::Formal,
        difficulty: Difficulty::Hard,
        age: 35,
        personality: "바쁘지만 공정한 매니저",
        topics: &["part_time_job", "career_future"],
        greeting: "네, 무슨 일이에요?",
    },
    Persona {
        id: "jiwon_junior",
        display_name: "지원",
        display_name_en: "Jiwon (Junior)",
        role: Role::Junior,
        required_register: Register::Casual,
        difficulty: Difficulty::Easy,
        age: 20,
        personality: "예의 바르고 질문이 많은 후배",
        topics: &["campus_life", "class_study", "roommate"],
        greeting: "선배님! 안녕하세요!",
    },
];

/// Read-only lookup table of personas, in declaration order.
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    personas: Vec<Persona>,
}

impl PersonaCatalog {
    /// Builds the catalog from the compiled-in persona set.
    pub fn builtin() -> Self {
        Self::from_personas(BUILTIN_PERSONAS.to_vec())
    }

    pub fn from_personas(personas: Vec<Persona>) -> Self {
        Self { personas }
    }

    pub fn get(&self, persona_id: &str) -> Result<&Persona> {
        self.personas
            .iter()
            .find(|p| p.id == persona_id)
            .ok_or_else(|| CoachError::PersonaNotFound(persona_id.to_string()))
    }

    pub fn list(&self) -> &[Persona] {
        &self.personas
    }

    pub fn filter(&self, difficulty: Option<Difficulty>, role: Option<Role>) -> Vec<&Persona> {
        self.personas
            .iter()
            .filter(|p| difficulty.is_none_or(|d| p.difficulty == d))
            .filter(|p| role.is_none_or(|r| p.role == r))
            .collect()
    }
}

impl Default for PersonaCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_known_persona() {
        let catalog = PersonaCatalog::builtin();
        let persona = catalog.get("professor_kim").unwrap();
        assert_eq!(persona.role, Role::Professor);
        assert_eq!(persona.required_register, Register::Formal);
        assert_eq!(persona.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_get_unknown_persona_is_not_found() {
        let catalog = PersonaCatalog::builtin();
        match catalog.get("nobody") {
            Err(CoachError::PersonaNotFound(id)) => assert_eq!(id, "nobody"),
            other => panic!("expected PersonaNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_list_keeps_declaration_order() {
        let catalog = PersonaCatalog::builtin();
        let ids: Vec<_> = catalog.list().iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec![
                "minsu_senior",
                "professor_kim",
                "sujin_friend",
                "manager_lee",
                "jiwon_junior"
            ]
        );
    }

    #[test]
    fn test_filter_by_difficulty_and_role() {
        let catalog = PersonaCatalog::builtin();
        let hard = catalog.filter(Some(Difficulty::Hard), None);
        assert_eq!(hard.len(), 2);

        let hard_supervisors = catalog.filter(Some(Difficulty::Hard), Some(Role::Supervisor));
        assert_eq!(hard_supervisors.len(), 1);
        assert_eq!(hard_supervisors[0].id, "manager_lee");

        assert_eq!(catalog.filter(None, None).len(), 5);
    }

    #[test]
    fn test_builtin_personas_follow_role_hierarchy() {
        for persona in PersonaCatalog::builtin().list() {
            assert_eq!(
                persona.required_register,
                persona.role.recommended_register(),
                "persona {}",
                persona.id
            );
        }
    }

    #[test]
    fn test_register_distance() {
        assert_eq!(Register::Casual.distance(Register::Casual), 0);
        assert_eq!(Register::Casual.distance(Register::Polite), 1);
        assert_eq!(Register::Formal.distance(Register::Casual), 2);
        assert!(Register::Casual < Register::Formal);
    }

    #[test]
    fn test_register_serialization() {
        assert_eq!(
            serde_json::to_string(&Register::Formal).unwrap(),
            "\"formal\""
        );
        let parsed: Register = serde_json::from_str("\"casual\"").unwrap();
        assert_eq!(parsed, Register::Casual);
    }

    #[test]
    fn test_role_parse_accepts_boss_alias() {
        assert_eq!(Role::parse("boss"), Some(Role::Supervisor));
        assert_eq!(Role::parse("Professor"), Some(Role::Professor));
        assert_eq!(Role::parse("king"), None);
    }

    #[test]
    fn test_formal_tips_list_honorifics() {
        let tips = Register::Formal.tips();
        assert!(tips.honorifics.contains(&"여쭙다"));
        assert!(Register::Casual.tips().honorifics.is_empty());
    }
}
