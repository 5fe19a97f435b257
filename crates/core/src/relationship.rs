//! Relationship analysis
//!
//! Given who the learner is talking to, recommends the register to use and
//! how hard the conversation will be. The learner is always a university
//! student, ranked alongside a friend.

use crate::{
    error::{CoachError, Result},
    persona::{Difficulty, Register, Role},
};
use serde::{Deserialize, Serialize};

/// A listener this many years older is owed 존댓말 whatever their role.
const POLITE_AGE_GAP: i16 = 5;
/// Beyond this gap the conversation is hard even with a peer.
const HARD_AGE_GAP: i16 = 20;
const MAX_AGE: u8 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAnalysis {
    pub listener_role: Role,
    pub recommended_register: Register,
    pub difficulty: Difficulty,
    /// 0.2 easy, 0.5 medium, 0.8 hard.
    pub difficulty_score: f64,
    /// Listener rank minus the learner's; positive means the listener is above.
    pub power_distance: i8,
    /// Listener age minus learner age.
    pub age_gap: i16,
    pub tips: Vec<String>,
}

fn rank(role: Role) -> i8 {
    match role {
        Role::Junior => 0,
        Role::Friend => 1,
        Role::Senior => 2,
        Role::Professor | Role::Supervisor => 3,
    }
}

pub fn analyze_relationship(
    listener: Role,
    learner_age: u8,
    listener_age: u8,
) -> Result<RelationshipAnalysis> {
    for (who, age) in [("learner", learner_age), ("listener", listener_age)] {
        if age == 0 || age > MAX_AGE {
            return Err(CoachError::Validation(format!(
                "{} age must be between 1 and {}",
                who, MAX_AGE
            )));
        }
    }

    let power_distance = rank(listener) - rank(Role::Friend);
    let age_gap = i16::from(listener_age) - i16::from(learner_age);

    let by_role = listener.recommended_register();
    let raised_for_age = by_role == Register::Casual && age_gap > POLITE_AGE_GAP;
    let recommended_register = if raised_for_age {
        Register::Polite
    } else {
        by_role
    };

    let (difficulty, difficulty_score) = if rank(listener) >= 3 || age_gap > HARD_AGE_GAP {
        (Difficulty::Hard, 0.8)
    } else if power_distance > 0 || age_gap > POLITE_AGE_GAP {
        (Difficulty::Medium, 0.5)
    } else {
        (Difficulty::Easy, 0.2)
    };

    Ok(RelationshipAnalysis {
        listener_role: listener,
        recommended_register,
        difficulty,
        difficulty_score,
        power_distance,
        age_gap,
        tips: tips(listener, recommended_register, raised_for_age),
    })
}

fn tips(listener: Role, register: Register, raised_for_age: bool) -> Vec<String> {
    let mut tips: Vec<&str> = match register {
        Register::Formal => vec![
            "격식체(-습니다/-습니까)를 사용하세요",
            "높임 표현(드리다, 여쭙다)을 적극 활용하세요",
        ],
        Register::Polite => vec![
            "존댓말(-요)을 기본으로 사용하세요",
            "친근하지만 예의 바르게 대화하세요",
        ],
        Register::Casual => vec!["반말을 사용해도 괜찮아요", "편하게 대화하세요"],
    };
    match listener {
        Role::Professor => tips.push("'교수님'이라고 호칭하세요"),
        Role::Supervisor => tips.push("'팀장님'처럼 직함으로 호칭하세요"),
        Role::Senior => tips.push("'선배(님)'이라고 호칭하세요"),
        _ => {}
    }
    if raised_for_age {
        tips.push("나이 차이가 크니 먼저 존댓말로 시작하세요");
    }
    tips.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_professor_is_formal_and_hard() {
        let analysis = analyze_relationship(Role::Professor, 22, 52).unwrap();
        assert_eq!(analysis.recommended_register, Register::Formal);
        assert_eq!(analysis.difficulty, Difficulty::Hard);
        assert_eq!(analysis.difficulty_score, 0.8);
        assert_eq!(analysis.power_distance, 2);
        assert_eq!(analysis.age_gap, 30);
        assert!(analysis.tips.iter().any(|t| t.contains("교수님")));
    }

    #[test]
    fn test_senior_is_polite_and_medium() {
        let analysis = analyze_relationship(Role::Senior, 22, 26).unwrap();
        assert_eq!(analysis.recommended_register, Register::Polite);
        assert_eq!(analysis.difficulty, Difficulty::Medium);
        assert!(analysis.tips.iter().any(|t| t.contains("선배")));
    }

    #[test]
    fn test_same_age_friend_is_casual_and_easy() {
        let analysis = analyze_relationship(Role::Friend, 22, 22).unwrap();
        assert_eq!(analysis.recommended_register, Register::Casual);
        assert_eq!(analysis.difficulty, Difficulty::Easy);
        assert_eq!(analysis.power_distance, 0);

        let analysis = analyze_relationship(Role::Junior, 22, 20).unwrap();
        assert_eq!(analysis.recommended_register, Register::Casual);
        assert_eq!(analysis.power_distance, -1);
        assert_eq!(analysis.age_gap, -2);
    }

    #[test]
    fn test_much_older_friend_raises_register() {
        let analysis = analyze_relationship(Role::Friend, 22, 28).unwrap();
        assert_eq!(analysis.recommended_register, Register::Polite);
        assert_eq!(analysis.difficulty, Difficulty::Medium);
        assert!(analysis.tips.iter().any(|t| t.contains("나이 차이")));

        // Exactly five years is not enough.
        let analysis = analyze_relationship(Role::Friend, 22, 27).unwrap();
        assert_eq!(analysis.recommended_register, Register::Casual);

        let analysis = analyze_relationship(Role::Junior, 22, 45).unwrap();
        assert_eq!(analysis.recommended_register, Register::Polite);
        assert_eq!(analysis.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_register_matches_builtin_personas() {
        for persona in crate::persona::PersonaCatalog::builtin().list() {
            let analysis = analyze_relationship(persona.role, 22, persona.age).unwrap();
            assert_eq!(
                analysis.recommended_register, persona.required_register,
                "persona {}",
                persona.id
            );
        }
    }

    #[test]
    fn test_rejects_impossible_ages() {
        for (learner, listener) in [(0, 30), (22, 0), (22, 200)] {
            let err = analyze_relationship(Role::Senior, learner, listener).unwrap_err();
            assert!(matches!(err, CoachError::Validation(_)));
        }
    }
}
