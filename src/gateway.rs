use std::sync::Arc;

use serde::Deserialize;

use crate::error::{AssistError, Result};
use crate::models::{ChatMessage, GroqRequest};
use crate::prompts::{self, ModelParams, PromptPair};
use crate::request::AssistRequest;
use crate::response::{PromptAnalysis, QuizQuestion, Response};
use crate::transport::Transport;

/// Quiz payloads arrive either wrapped in an object or as a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum QuizEnvelope {
    Wrapped { questions: Vec<QuizQuestion> },
    Bare(Vec<QuizQuestion>),
}

pub struct LlmGateway {
    tx: Arc<dyn Transport>,
    model: String,
}

impl LlmGateway {
    pub fn new(tx: Arc<dyn Transport>, model: String) -> Self {
        Self { tx, model }
    }

    /// Send one system/user exchange and return the trimmed completion text.
    pub async fn complete(&self, prompt: &PromptPair, params: &ModelParams) -> Result<String> {
        let request = GroqRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(prompt.system.clone()),
                ChatMessage::user(prompt.user.clone()),
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream: false,
            response_format: params
                .json_output
                .then(|| serde_json::json!({"type": "json_object"})),
        };

        let groq_response = self.tx.chat(&request).await?;

        match groq_response.first_content().map(str::trim) {
            Some(content) if !content.is_empty() => Ok(content.to_string()),
            Some(_) => Err(AssistError::MalformedResponse(
                "Groq API returned empty content".to_string(),
            )),
            None => Err(AssistError::MalformedResponse(
                "Groq API returned empty choices".to_string(),
            )),
        }
    }

    /// Build the prompt for `request`, call the provider and shape the result.
    pub async fn run(&self, request: &AssistRequest) -> Result<Response> {
        let mode = request.mode();
        tracing::info!(mode = %mode, model = %self.model, "Calling Groq");

        let prompt = prompts::build_messages(request);
        let params = prompts::model_params(mode);
        let raw = self.complete(&prompt, &params).await?;
        interpret(request, &raw)
    }
}

/// Turn raw completion text into the response shape `request` mandates.
pub fn interpret(request: &AssistRequest, raw: &str) -> Result<Response> {
    let text = request.input().to_string();
    let raw = raw.trim();

    match request {
        AssistRequest::Analyze { .. } => {
            let analysis: PromptAnalysis = serde_json::from_str(extract_json_object(raw)?)
                .map_err(|e| AssistError::MalformedResponse(format!("analysis JSON: {e}")))?;
            if analysis.strengths.is_empty()
                && analysis.weaknesses.is_empty()
                && analysis.suggestions.is_empty()
            {
                return Err(AssistError::MalformedResponse(
                    "analysis JSON carried no findings".to_string(),
                ));
            }
            Ok(Response::analysis(text, analysis))
        }
        AssistRequest::Enhance { .. } => Ok(Response::enhanced(text, raw)),
        AssistRequest::Handwriting { .. } | AssistRequest::DocumentAnalysis { .. } => {
            Ok(Response::processed(text, raw))
        }
        AssistRequest::EducationalChat { options, .. } => Ok(Response::tutor(
            text,
            raw,
            "🎓",
            options
                .topic
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        )),
        AssistRequest::QuizGeneration { options, .. } => {
            let envelope: QuizEnvelope = serde_json::from_str(extract_json(raw)?)
                .map_err(|e| AssistError::MalformedResponse(format!("quiz JSON: {e}")))?;
            let parsed = match envelope {
                QuizEnvelope::Wrapped { questions } | QuizEnvelope::Bare(questions) => questions,
            };

            let total = parsed.len();
            let mut questions: Vec<QuizQuestion> = parsed
                .into_iter()
                .filter(QuizQuestion::is_well_formed)
                .take(options.question_count())
                .collect();
            if questions.len() < total.min(options.question_count()) {
                tracing::warn!(
                    kept = questions.len(),
                    received = total,
                    "Dropped malformed quiz questions from provider output"
                );
            }
            if questions.is_empty() {
                return Err(AssistError::MalformedResponse(
                    "quiz JSON contained no well-formed questions".to_string(),
                ));
            }

            for (i, question) in questions.iter_mut().enumerate() {
                if question.id.trim().is_empty() {
                    question.id = format!("q{}", i + 1);
                }
            }
            Ok(Response::quiz(text, questions))
        }
    }
}

/// Slice the outermost `{...}` out of text that may carry fences or prose.
fn extract_json_object(raw: &str) -> Result<&str> {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&raw[start..=end]),
        _ => Err(AssistError::MalformedResponse(format!(
            "no JSON object in provider output: {}",
            preview(raw)
        ))),
    }
}

/// Like `extract_json_object` but also accepts a top-level array.
pub(crate) fn extract_json(raw: &str) -> Result<&str> {
    let object = raw.find('{');
    let array = raw.find('[');
    match (object, array) {
        (Some(o), Some(a)) if a < o => match raw.rfind(']') {
            Some(end) if a < end => Ok(&raw[a..=end]),
            _ => extract_json_object(raw),
        },
        _ => extract_json_object(raw),
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroqResponse;
    use crate::request::{DocumentAnalysis, QuestionType, QuizOptions, ToneStyle};
    use crate::transport::MockTransport;

    fn gateway_returning(content: &'static str) -> LlmGateway {
        let mut mock = MockTransport::new();
        mock.expect_chat()
            .times(1)
            .returning(move |_| Ok(GroqResponse::from_content(content)));
        LlmGateway::new(Arc::new(mock), "test-model".to_string())
    }

    #[tokio::test]
    async fn test_complete_sends_fixed_shape_request() {
        let mut mock = MockTransport::new();
        mock.expect_chat()
            .withf(|req| {
                req.model == "test-model"
                    && !req.stream
                    && req.messages.len() == 2
                    && req.messages[0].role == "system"
                    && req.messages[1].role == "user"
                    && req.response_format.is_some()
                    && (req.temperature - 0.3).abs() < f32::EPSILON
            })
            .times(1)
            .returning(|_| Ok(GroqResponse::from_content("  {\"score\": 80, \"strengths\": [\"clear\"]}  ")));
        let gateway = LlmGateway::new(Arc::new(mock), "test-model".to_string());

        let response = gateway.run(&AssistRequest::analyze("Write a poem")).await.unwrap();
        let analysis = response.analysis_result().unwrap();
        assert_eq!(analysis.score, 80);
        assert_eq!(response.text, "Write a poem");
    }

    #[tokio::test]
    async fn test_free_text_modes_use_trimmed_text() {
        let gateway = gateway_returning("\n  A sharper prompt.  \n");
        let response = gateway
            .run(&AssistRequest::enhance("prompt", ToneStyle::Casual))
            .await
            .unwrap();
        assert_eq!(response.enhanced_prompt(), Some("A sharper prompt."));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let mut mock = MockTransport::new();
        mock.expect_chat()
            .returning(|_| Ok(GroqResponse { choices: vec![] }));
        let gateway = LlmGateway::new(Arc::new(mock), "m".to_string());
        let err = gateway
            .run(&AssistRequest::document("doc", DocumentAnalysis::Summarize))
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_transport_errors_surface_to_caller() {
        let mut mock = MockTransport::new();
        mock.expect_chat()
            .returning(|_| Err(AssistError::Transport("connection refused".to_string())));
        let gateway = LlmGateway::new(Arc::new(mock), "m".to_string());
        let err = gateway.run(&AssistRequest::analyze("x")).await.unwrap_err();
        assert!(matches!(err, AssistError::Transport(_)));
    }

    #[test]
    fn test_analysis_json_inside_code_fence() {
        let raw = "Here you go:\n```json\n{\"score\": 64, \"strengths\": [\"a\"], \"weaknesses\": [\"b\"], \"suggestions\": [\"c\"]}\n```";
        let response = interpret(&AssistRequest::analyze("p"), raw).unwrap();
        assert_eq!(response.analysis_result().unwrap().score, 64);
    }

    #[test]
    fn test_non_json_for_json_mode_is_malformed() {
        let err = interpret(&AssistRequest::analyze("p"), "I think it's a good prompt!").unwrap_err();
        assert!(matches!(err, AssistError::MalformedResponse(_)));

        let err = interpret(&AssistRequest::analyze("p"), "{\"score\": 50}").unwrap_err();
        assert!(matches!(err, AssistError::MalformedResponse(_)));
    }

    #[test]
    fn test_quiz_parsing_filters_and_numbers_questions() {
        let raw = r#"{"questions": [
            {"type": "multiple-choice", "question": "2+2?", "options": ["3","4"], "correctAnswer": "4", "explanation": "sum"},
            {"type": "multiple-choice", "question": "no options", "correctAnswer": "x"},
            {"id": "custom", "type": "short-answer", "question": "Name a prime.", "correctAnswer": "2"},
            {"type": "true-false", "question": "1 is prime.", "options": ["True","False"], "correctAnswer": false}
        ]}"#;
        let options = QuizOptions {
            question_count: 2,
            ..QuizOptions::default()
        };
        let response = interpret(&AssistRequest::quiz("math", options), raw).unwrap();
        let questions = response.questions().unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, "q1");
        assert_eq!(questions[1].id, "custom");
        assert_eq!(questions[1].kind, QuestionType::ShortAnswer);
        assert!(questions.iter().all(QuizQuestion::is_well_formed));
    }

    #[test]
    fn test_quiz_accepts_bare_array() {
        let raw = r#"[{"type": "true-false", "question": "Water boils at 100C at sea level.", "options": ["True","False"], "correctAnswer": "True"}]"#;
        let response = interpret(&AssistRequest::quiz("science", QuizOptions::default()), raw).unwrap();
        assert_eq!(response.questions().unwrap().len(), 1);
    }

    #[test]
    fn test_quiz_without_valid_questions_is_malformed() {
        let raw = r#"{"questions": [{"type": "multiple-choice", "question": "?", "correctAnswer": "x"}]}"#;
        let err = interpret(&AssistRequest::quiz("x", QuizOptions::default()), raw).unwrap_err();
        assert!(matches!(err, AssistError::MalformedResponse(_)));
    }
}
