//! Session data model and summary aggregation.
//!
//! A [`Session`] is owned by the orchestrator; everyone else only ever sees
//! clones. History is append-only and its length is the turn count.

use crate::{
    error::{CoachError, Result},
    persona::Register,
    register::{LevelCounts, RegisterFeedback},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Per-turn score at or above which a turn counts as a strength.
pub const STRONG_TURN_SCORE: u8 = 80;
/// Per-turn score below which a turn counts as a weakness.
pub const WEAK_TURN_SCORE: u8 = 40;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Ended,
}

/// One user utterance, its optional feedback and the persona's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// 0-based and gapless within a session.
    pub index: u32,
    pub user_text: String,
    /// Present only when feedback was requested for this message.
    pub register_feedback: Option<RegisterFeedback>,
    /// `None` when the reply could not be generated; see `degraded`.
    pub avatar_reply: Option<String>,
    /// Set when the turn was committed without a reply.
    pub degraded: bool,
    pub degraded_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: String,
    /// Fixed for the lifetime of the session.
    pub persona_id: String,
    pub status: SessionStatus,
    pub topic: Option<String>,
    pub greeting: String,
    pub history: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        persona_id: impl Into<String>,
        topic: Option<String>,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: user_id.into(),
            persona_id: persona_id.into(),
            status: SessionStatus::Active,
            topic,
            greeting: greeting.into(),
            history: Vec::new(),
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    /// Index the next turn must carry. Fails loudly if history has a gap.
    pub fn next_index(&self) -> Result<u32> {
        self.check_contiguous()?;
        u32::try_from(self.history.len())
            .map_err(|_| CoachError::Invariant("turn index overflow".to_string()))
    }

    pub fn check_contiguous(&self) -> Result<()> {
        for (position, turn) in self.history.iter().enumerate() {
            if turn.index as usize != position {
                return Err(CoachError::Invariant(format!(
                    "session {} has turn index {} at position {}",
                    self.session_id, turn.index, position
                )));
            }
        }
        Ok(())
    }

    /// Appends a fully built turn. Rejected on closed sessions and on any
    /// index other than the next contiguous one.
    pub fn append(&mut self, turn: Turn) -> Result<()> {
        if !self.is_active() {
            return Err(CoachError::SessionClosed(self.session_id));
        }
        let expected = self.next_index()?;
        if turn.index != expected {
            return Err(CoachError::Invariant(format!(
                "session {} expected turn index {}, got {}",
                self.session_id, expected, turn.index
            )));
        }
        self.history.push(turn);
        Ok(())
    }

    /// Moves the session to `Ended`. `ended_at` is written exactly once.
    pub fn end(&mut self, at: DateTime<Utc>) -> Result<()> {
        match (self.status, self.ended_at) {
            (SessionStatus::Ended, _) => Err(CoachError::SessionAlreadyEnded(self.session_id)),
            (SessionStatus::Active, Some(_)) => Err(CoachError::Invariant(format!(
                "active session {} already carries an end time",
                self.session_id
            ))),
            (SessionStatus::Active, None) => {
                self.status = SessionStatus::Ended;
                self.ended_at = Some(at);
                Ok(())
            }
        }
    }

    /// Aggregates per-turn feedback into a summary. Computed on demand only.
    pub fn summarize(&self, expected: Register) -> SessionSummary {
        let feedback: Vec<&RegisterFeedback> = self
            .history
            .iter()
            .filter_map(|t| t.register_feedback.as_ref())
            .collect();

        let average_score = if feedback.is_empty() {
            None
        } else {
            let total: f64 = feedback.iter().map(|f| f64::from(f.score)).sum();
            Some(total / feedback.len() as f64)
        };

        let mut breakdown = LevelCounts::default();
        let mut unscorable = 0usize;
        for f in &feedback {
            match f.detected_register {
                Some(register) => breakdown.increment(register),
                None => unscorable += 1,
            }
        }

        let matched = feedback.iter().filter(|f| f.matched).count();
        let strong = feedback
            .iter()
            .filter(|f| f.score >= STRONG_TURN_SCORE)
            .count();
        let weak = feedback.iter().filter(|f| f.score < WEAK_TURN_SCORE).count();
        let honorifics: BTreeSet<&str> = feedback
            .iter()
            .flat_map(|f| f.details.honorifics_found.iter().map(String::as_str))
            .collect();

        let mut strengths = Vec::new();
        if matched > 0 {
            strengths.push(format!(
                "Used the expected {} register in {} of {} scored turns.",
                expected,
                matched,
                feedback.len()
            ));
        }
        if strong > 0 && strong == feedback.len() {
            strengths.push("Every scored turn was appropriate for the listener.".to_string());
        }
        if expected != Register::Casual && !honorifics.is_empty() {
            let sample: Vec<&str> = honorifics.iter().take(3).copied().collect();
            strengths.push(format!(
                "Used honorific vocabulary ({}).",
                sample.join(", ")
            ));
        }

        let mut weaknesses = Vec::new();
        for register in Register::ALL {
            let count = breakdown.get(register);
            if register != expected && count > 0 {
                weaknesses.push(format!(
                    "Used {} speech {} time(s) where {} was expected.",
                    register, count, expected
                ));
            }
        }
        if weak > 0 {
            weaknesses.push(format!(
                "{} turn(s) scored below {}.",
                weak, WEAK_TURN_SCORE
            ));
        }
        if unscorable > 0 {
            weaknesses.push(format!(
                "{} message(s) had no Korean text to score.",
                unscorable
            ));
        }

        let suggestions = closing_suggestions(average_score, &breakdown, expected);

        SessionSummary {
            session_id: self.session_id,
            persona_id: self.persona_id.clone(),
            turn_count: self.turn_count(),
            scored_turns: feedback.len(),
            degraded_turns: self.history.iter().filter(|t| t.degraded).count(),
            average_score,
            register_breakdown: breakdown,
            strengths,
            weaknesses,
            suggestions,
            started_at: self.created_at,
            ended_at: self.ended_at,
            duration_seconds: self
                .ended_at
                .map(|end| (end - self.created_at).num_seconds()),
        }
    }
}

fn closing_suggestions(
    average_score: Option<f64>,
    breakdown: &LevelCounts,
    expected: Register,
) -> Vec<String> {
    let Some(average) = average_score else {
        return vec![
            "Ask for feedback on your messages next time to get a register score.".to_string(),
        ];
    };

    let mut suggestions = Vec::new();
    if average < 50.0 {
        suggestions.push("Raise your overall speech level to match the listener.".to_string());
    }
    if expected == Register::Formal && breakdown.casual > 0 {
        suggestions.push("Practise formal -습니다 / -습니까 endings.".to_string());
    }
    if expected == Register::Polite && breakdown.casual > breakdown.polite {
        suggestions.push("Use polite -요 endings more often.".to_string());
    }
    if average >= 70.0 {
        suggestions.push("Well done! Keep practising to stay consistent.".to_string());
    }
    if suggestions.is_empty() {
        suggestions.push("Try practising with a different persona or situation.".to_string());
    }
    suggestions
}

/// Aggregate feedback for a session, computed once the session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub persona_id: String,
    pub turn_count: usize,
    pub scored_turns: usize,
    pub degraded_turns: usize,
    /// Mean of all attached feedback scores; `None` means no data.
    pub average_score: Option<f64>,
    pub register_breakdown: LevelCounts,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
}
