use async_trait::async_trait;
use interview_core::model::{Difficulty, QuestionDraft, QuestionError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::config::{AiConfig, AiSettings};
use super::{AnswerScore, ScoreRequest, Scorer, SummaryItem};
use crate::error::ScoringError;

/// Scorer backed by an OpenAI-compatible chat completions endpoint.
///
/// Reads `AiSettings` on every call, so a key added or removed at runtime
/// takes effect on the next question.
#[derive(Clone)]
pub struct RemoteScorer {
    client: Client,
    settings: AiSettings,
}

impl RemoteScorer {
    #[must_use]
    pub fn new(settings: AiSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    async fn complete(&self, prompt: String, temperature: f32) -> Result<String, ScoringError> {
        let config = self
            .settings
            .current()
            .filter(AiConfig::is_usable)
            .ok_or(ScoringError::Disabled)?;

        match tokio::time::timeout(config.timeout, self.send(&config, prompt, temperature)).await {
            Ok(result) => result,
            Err(_) => Err(ScoringError::Timeout(config.timeout)),
        }
    }

    async fn send(
        &self,
        config: &AiConfig,
        prompt: String,
        temperature: f32,
    ) -> Result<String, ScoringError> {
        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScoringError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ScoringError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl Scorer for RemoteScorer {
    fn is_available(&self) -> bool {
        self.settings.is_configured()
    }

    async fn score(&self, request: &ScoreRequest) -> Result<AnswerScore, ScoringError> {
        let prompt = format!(
            "Score this interview answer on a scale of 1-10:\n\n\
             Question: {}\nDifficulty: {}\nAnswer: {}\n\n\
             Consider: technical accuracy, completeness, clarity, and relevance.\n\
             Return JSON with score (number) and feedback (string).",
            request.question, request.difficulty, request.answer
        );
        let reply = self.complete(prompt, 0.3).await?;
        parse_score(&reply)
    }

    async fn summarize(
        &self,
        items: &[SummaryItem],
        total_score: u32,
    ) -> Result<String, ScoringError> {
        let max_score = items.len() * 10;
        let transcript = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                format!(
                    "{}. {}\nAnswer: {}\nScore: {}/10",
                    i + 1,
                    item.question,
                    item.answer,
                    item.score
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "Generate a brief interview summary for a full-stack developer candidate:\n\n\
             Total Score: {total_score}/{max_score}\nQuestions and Answers:\n{transcript}\n\n\
             Provide a concise summary highlighting strengths, areas for improvement, and overall assessment."
        );
        self.complete(prompt, 0.5).await
    }

    async fn generate_questions(&self) -> Result<Vec<QuestionDraft>, ScoringError> {
        let prompt = "Generate 6 interview questions for a full-stack developer position (React/Node.js).\n\
                      Format: 2 easy questions (20s each), 2 medium questions (60s each), 2 hard questions (120s each).\n\
                      Return as JSON array with text, difficulty, and timeLimit fields."
            .to_string();
        let reply = self.complete(prompt, 0.7).await?;
        parse_questions(&reply)
    }
}

/// Pull the outermost `open`..`close` span out of free-form model output.
fn extract_json(reply: &str, open: char, close: char) -> Result<&str, ScoringError> {
    let start = reply.find(open);
    let end = reply.rfind(close);
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&reply[start..=end]),
        _ => Err(ScoringError::MalformedResponse(format!(
            "no JSON {open}...{close} in reply"
        ))),
    }
}

fn parse_score(reply: &str) -> Result<AnswerScore, ScoringError> {
    let raw: RawScore = serde_json::from_str(extract_json(reply, '{', '}')?)
        .map_err(|e| ScoringError::MalformedResponse(e.to_string()))?;
    let rounded = raw.score.round();
    if !rounded.is_finite() || !(0.0..=f64::from(u8::MAX)).contains(&rounded) {
        return Err(ScoringError::MalformedResponse(format!(
            "score {} is not a small number",
            raw.score
        )));
    }
    // Range checked above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = rounded as u8;
    Ok(AnswerScore {
        score,
        feedback: raw.feedback.trim().to_owned(),
    })
}

fn parse_questions(reply: &str) -> Result<Vec<QuestionDraft>, ScoringError> {
    let raw: Vec<RawQuestion> = serde_json::from_str(extract_json(reply, '[', ']')?)
        .map_err(|e| ScoringError::MalformedResponse(e.to_string()))?;
    raw.into_iter()
        .map(|q| {
            let difficulty: Difficulty = q
                .difficulty
                .parse()
                .map_err(|e: QuestionError| ScoringError::MalformedResponse(e.to_string()))?;
            let time_limit_secs = q
                .time_limit
                .unwrap_or_else(|| difficulty.default_time_limit());
            Ok(QuestionDraft::new(q.text, difficulty, time_limit_secs))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawScore {
    score: f64,
    #[serde(default)]
    feedback: String,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    text: String,
    difficulty: String,
    #[serde(default, alias = "timeLimit", alias = "time_limit_secs")]
    time_limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_extracted_from_chatty_reply() {
        let reply = "Sure! Here you go:\n```json\n{\"score\": 7, \"feedback\": \"Good depth.\"}\n```";
        let scored = parse_score(reply).unwrap();
        assert_eq!(scored.score, 7);
        assert_eq!(scored.feedback, "Good depth.");
    }

    #[test]
    fn fractional_scores_are_rounded() {
        let scored = parse_score("{\"score\": 6.6, \"feedback\": \"ok\"}").unwrap();
        assert_eq!(scored.score, 7);
    }

    #[test]
    fn reply_without_json_is_malformed() {
        assert!(matches!(
            parse_score("I would give this a seven."),
            Err(ScoringError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_score("{\"score\": -4}"),
            Err(ScoringError::MalformedResponse(_))
        ));
    }

    #[test]
    fn questions_accept_camel_case_time_limit() {
        let reply = r#"Questions:
[
  {"text": "What is JSX?", "difficulty": "easy", "timeLimit": 20},
  {"text": "Explain closures.", "difficulty": "Medium"}
]"#;
        let drafts = parse_questions(reply).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].time_limit_secs, 20);
        assert_eq!(drafts[1].difficulty, Difficulty::Medium);
        assert_eq!(drafts[1].time_limit_secs, 60);
    }

    #[test]
    fn unknown_difficulty_is_malformed() {
        let reply = r#"[{"text": "Q", "difficulty": "expert", "timeLimit": 30}]"#;
        assert!(matches!(
            parse_questions(reply),
            Err(ScoringError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_scorer_is_disabled() {
        let scorer = RemoteScorer::new(AiSettings::new(None));
        assert!(!scorer.is_available());
        let request = ScoreRequest {
            question: "Q".into(),
            answer: "A".into(),
            difficulty: Difficulty::Easy,
        };
        assert!(matches!(
            scorer.score(&request).await,
            Err(ScoringError::Disabled)
        ));
    }
}
