use async_trait::async_trait;
use interview_core::model::{Difficulty, MAX_ANSWER_SCORE, QuestionDraft};

use super::{AnswerScore, ScoreRequest, Scorer, SummaryItem};
use crate::error::ScoringError;

const KEYWORDS: [&str; 8] = [
    "react",
    "node",
    "javascript",
    "api",
    "database",
    "component",
    "state",
    "props",
];

const CHARS_PER_POINT: usize = 20;
const STRONG_ANSWER: u8 = 7;
const WEAK_ANSWER: u8 = 5;

const STATIC_QUESTIONS: [(&str, Difficulty); 6] = [
    ("What is React and what are its main features?", Difficulty::Easy),
    ("Explain the difference between props and state in React.", Difficulty::Easy),
    (
        "How would you optimize a React application for better performance?",
        Difficulty::Medium,
    ),
    (
        "Describe the Node.js event loop and how it handles asynchronous operations.",
        Difficulty::Medium,
    ),
    (
        "Design a scalable microservices architecture for an e-commerce platform. What challenges would you face?",
        Difficulty::Hard,
    ),
    (
        "Implement a real-time chat application using WebSockets. How would you handle connection failures and message ordering?",
        Difficulty::Hard,
    ),
];

/// Deterministic local scoring, summary and question set.
///
/// Always available and never fails; used whenever the remote capability is
/// unusable or returns something unusable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackScorer;

impl FallbackScorer {
    /// Score from answer length and domain keywords, nudged by difficulty.
    #[must_use]
    pub fn score_answer(answer: &str, difficulty: Difficulty) -> AnswerScore {
        let lowered = answer.to_lowercase();
        let keyword_hits = KEYWORDS.iter().filter(|k| lowered.contains(*k)).count();
        let words = answer.split_whitespace().count();
        let raw = answer.chars().count() / CHARS_PER_POINT + keyword_hits;
        let base = u8::try_from(raw.min(usize::from(MAX_ANSWER_SCORE)))
            .unwrap_or(MAX_ANSWER_SCORE)
            .max(1);

        let score = match difficulty {
            Difficulty::Easy => (base + 1).min(MAX_ANSWER_SCORE),
            Difficulty::Medium => base,
            Difficulty::Hard => base.saturating_sub(1).max(1),
        };

        AnswerScore {
            score,
            feedback: format!(
                "Answer scored on length ({words} words) and {keyword_hits} technical keyword(s). \
                 Consider providing more detailed technical explanations."
            ),
        }
    }

    /// Summary built from the score distribution.
    #[must_use]
    pub fn summary(items: &[SummaryItem], total_score: u32) -> String {
        let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
        let max_score = count.saturating_mul(u32::from(MAX_ANSWER_SCORE));
        let average = if count == 0 {
            0.0
        } else {
            f64::from(total_score) / f64::from(count)
        };
        let strengths = items.iter().filter(|i| i.score >= STRONG_ANSWER).count();
        let weaknesses = items.iter().filter(|i| i.score < WEAK_ANSWER).count();

        let mut summary = format!(
            "Interview completed with a total score of {total_score}/{max_score} (average: {average:.1}/10). "
        );
        if strengths > weaknesses {
            summary.push_str(&format!(
                "The candidate demonstrated strong technical knowledge with {strengths} high-scoring answers. "
            ));
        } else if weaknesses > strengths {
            summary.push_str(&format!(
                "The candidate showed areas for improvement with {weaknesses} low-scoring answers. "
            ));
        } else {
            summary.push_str("The candidate showed mixed performance across different questions. ");
        }
        summary.push_str(
            "Overall, this candidate shows potential for a full-stack developer role with room for growth in specific technical areas.",
        );
        summary
    }

    /// The reference question set: two easy, two medium, two hard.
    #[must_use]
    pub fn questions() -> Vec<QuestionDraft> {
        STATIC_QUESTIONS
            .iter()
            .map(|(text, difficulty)| {
                QuestionDraft::new(*text, *difficulty, difficulty.default_time_limit())
            })
            .collect()
    }
}

#[async_trait]
impl Scorer for FallbackScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<AnswerScore, ScoringError> {
        Ok(Self::score_answer(&request.answer, request.difficulty))
    }

    async fn summarize(
        &self,
        items: &[SummaryItem],
        total_score: u32,
    ) -> Result<String, ScoringError> {
        Ok(Self::summary(items, total_score))
    }

    async fn generate_questions(&self) -> Result<Vec<QuestionDraft>, ScoringError> {
        Ok(Self::questions())
    }
}
