use serde::{Deserialize, Deserializer, Serialize};

use crate::request::{Difficulty, QuestionType};
#[cfg(test)]
use crate::request::Mode;

/// Flexible score deserializer: providers return ints, floats or numeric strings
fn deserialize_flexible_score<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleScore {
        Int(i64),
        Float(f64),
        String(String),
    }

    let value = FlexibleScore::deserialize(deserializer)?;
    let raw = match value {
        FlexibleScore::Int(i) => i as f64,
        FlexibleScore::Float(f) => f,
        FlexibleScore::String(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom)?,
    };
    Ok(raw.round().clamp(0.0, 100.0) as u32)
}

/// Flexible answer deserializer: true/false questions often come back as booleans
fn deserialize_flexible_answer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleAnswer {
        Bool(bool),
        Number(f64),
        String(String),
    }

    Ok(match FlexibleAnswer::deserialize(deserializer)? {
        FlexibleAnswer::Bool(b) => (if b { "True" } else { "False" }).to_string(),
        FlexibleAnswer::Number(n) => n.to_string(),
        FlexibleAnswer::String(s) => s,
    })
}

/// Mode-shaped result. `text` always echoes the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub text: String,
    #[serde(flatten)]
    pub payload: Payload,
}

/// Exactly one mode-specific field group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Analysis {
        analysis: PromptAnalysis,
    },
    Enhanced {
        #[serde(rename = "enhancedPrompt")]
        enhanced_prompt: String,
    },
    Processed {
        #[serde(rename = "processedText")]
        processed_text: String,
    },
    Tutor {
        response: String,
        emoji: String,
        #[serde(
            rename = "detectedTopic",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        detected_topic: Option<String>,
    },
    Quiz {
        questions: Vec<QuizQuestion>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptAnalysis {
    #[serde(deserialize_with = "deserialize_flexible_score")]
    pub score: u32,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(deserialize_with = "deserialize_flexible_answer")]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl QuizQuestion {
    /// `options` present and non-empty iff the type is not short-answer
    pub fn is_well_formed(&self) -> bool {
        let options_ok = match (&self.options, self.kind.requires_options()) {
            (Some(options), true) => !options.is_empty(),
            (None, false) => true,
            _ => false,
        };
        options_ok && !self.question.trim().is_empty() && !self.correct_answer.trim().is_empty()
    }
}

impl Response {
    pub fn analysis(text: impl Into<String>, analysis: PromptAnalysis) -> Self {
        Self {
            text: text.into(),
            payload: Payload::Analysis { analysis },
        }
    }

    pub fn enhanced(text: impl Into<String>, enhanced_prompt: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            payload: Payload::Enhanced {
                enhanced_prompt: enhanced_prompt.into(),
            },
        }
    }

    pub fn processed(text: impl Into<String>, processed_text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            payload: Payload::Processed {
                processed_text: processed_text.into(),
            },
        }
    }

    pub fn tutor(
        text: impl Into<String>,
        response: impl Into<String>,
        emoji: impl Into<String>,
        detected_topic: Option<String>,
    ) -> Self {
        Self {
            text: text.into(),
            payload: Payload::Tutor {
                response: response.into(),
                emoji: emoji.into(),
                detected_topic,
            },
        }
    }

    pub fn quiz(text: impl Into<String>, questions: Vec<QuizQuestion>) -> Self {
        Self {
            text: text.into(),
            payload: Payload::Quiz { questions },
        }
    }

    /// Whether the payload is the one mandated for `mode` and internally valid
    #[cfg(test)]
    pub fn satisfies_shape(&self, mode: Mode) -> bool {
        match (mode, &self.payload) {
            (Mode::Analyze, Payload::Analysis { analysis }) => analysis.score <= 100,
            (Mode::Enhance, Payload::Enhanced { .. }) => true,
            (Mode::Handwriting | Mode::DocumentAnalysis, Payload::Processed { .. }) => true,
            (Mode::EducationalChat, Payload::Tutor { .. }) => true,
            (Mode::QuizGeneration, Payload::Quiz { questions }) => {
                questions.iter().all(QuizQuestion::is_well_formed)
            }
            _ => false,
        }
    }

    pub fn enhanced_prompt(&self) -> Option<&str> {
        match &self.payload {
            Payload::Enhanced { enhanced_prompt } => Some(enhanced_prompt),
            _ => None,
        }
    }

    pub fn processed_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Processed { processed_text } => Some(processed_text),
            _ => None,
        }
    }

    pub fn analysis_result(&self) -> Option<&PromptAnalysis> {
        match &self.payload {
            Payload::Analysis { analysis } => Some(analysis),
            _ => None,
        }
    }

    pub fn questions(&self) -> Option<&[QuizQuestion]> {
        match &self.payload {
            Payload::Quiz { questions } => Some(questions),
            _ => None,
        }
    }
}

/// Top-level JSON fields a response for `mode` must carry, besides `text`
#[cfg(test)]
pub fn required_fields(mode: Mode) -> &'static [&'static str] {
    match mode {
        Mode::Analyze => &["analysis"],
        Mode::Enhance => &["enhancedPrompt"],
        Mode::Handwriting | Mode::DocumentAnalysis => &["processedText"],
        Mode::EducationalChat => &["response", "emoji"],
        Mode::QuizGeneration => &["questions"],
    }
}

/// Top-level JSON fields a response for `mode` may carry, besides `text`
#[cfg(test)]
pub fn allowed_fields(mode: Mode) -> &'static [&'static str] {
    match mode {
        Mode::EducationalChat => &["response", "emoji", "detectedTopic"],
        other => required_fields(other),
    }
}
