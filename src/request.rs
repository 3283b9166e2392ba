//! Request types: one closed variant per mode, carrying only the options that
//! mode understands.

use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_QUESTION_COUNT: usize = 5;
pub const MAX_QUESTION_COUNT: usize = 20;

/// Operation category; selects templates, model parameters and response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Analyze,
    Enhance,
    Handwriting,
    DocumentAnalysis,
    EducationalChat,
    QuizGeneration,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Analyze,
        Mode::Enhance,
        Mode::Handwriting,
        Mode::DocumentAnalysis,
        Mode::EducationalChat,
        Mode::QuizGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Analyze => "analyze",
            Mode::Enhance => "enhance",
            Mode::Handwriting => "handwriting",
            Mode::DocumentAnalysis => "document-analysis",
            Mode::EducationalChat => "educational-chat",
            Mode::QuizGeneration => "quiz-generation",
        }
    }

    /// Modes whose provider output must be a JSON object
    pub fn expects_json(&self) -> bool {
        matches!(self, Mode::Analyze | Mode::QuizGeneration)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToneStyle {
    #[default]
    Formal,
    Casual,
    Technical,
    Creative,
    Academic,
}

impl ToneStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToneStyle::Formal => "formal",
            ToneStyle::Casual => "casual",
            ToneStyle::Technical => "technical",
            ToneStyle::Creative => "creative",
            ToneStyle::Academic => "academic",
        }
    }
}

impl FromStr for ToneStyle {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "formal" | "professional" => Ok(ToneStyle::Formal),
            "casual" | "friendly" => Ok(ToneStyle::Casual),
            "technical" => Ok(ToneStyle::Technical),
            "creative" => Ok(ToneStyle::Creative),
            "academic" => Ok(ToneStyle::Academic),
            other => Err(format!("unknown tone style '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandwritingAction {
    Continue,
    Grammar,
    Shorten,
    Summarize,
}

impl HandwritingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandwritingAction::Continue => "continue",
            HandwritingAction::Grammar => "grammar",
            HandwritingAction::Shorten => "shorten",
            HandwritingAction::Summarize => "summarize",
        }
    }
}

/// Document analysis sub-mode. Q&A always carries its question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DocumentAnalysis {
    Summarize,
    ExtractKeywords,
    QAndA { question: String },
}

impl DocumentAnalysis {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentAnalysis::Summarize => "summarize",
            DocumentAnalysis::ExtractKeywords => "extract-keywords",
            DocumentAnalysis::QAndA { .. } => "q-and-a",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Personality {
    #[default]
    Encouraging,
    Socratic,
    Playful,
    Concise,
}

impl Personality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Personality::Encouraging => "encouraging",
            Personality::Socratic => "socratic",
            Personality::Playful => "playful",
            Personality::Concise => "concise",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(EnumSetType, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::TrueFalse => "true-false",
            QuestionType::ShortAnswer => "short-answer",
        }
    }

    pub fn requires_options(&self) -> bool {
        !matches!(self, QuestionType::ShortAnswer)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "multiple-choice" | "mc" => Ok(QuestionType::MultipleChoice),
            "true-false" | "tf" => Ok(QuestionType::TrueFalse),
            "short-answer" => Ok(QuestionType::ShortAnswer),
            other => Err(format!("unknown question type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TutorOptions {
    pub topic: Option<String>,
    pub level: Level,
    pub personality: Personality,
    pub conversation_history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuizOptions {
    pub difficulty: Difficulty,
    pub question_count: usize,
    #[serde(with = "question_types_serde")]
    pub question_types: EnumSet<QuestionType>,
    pub custom_content: Option<String>,
}

impl Default for QuizOptions {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            question_count: DEFAULT_QUESTION_COUNT,
            question_types: default_question_types(),
            custom_content: None,
        }
    }
}

impl QuizOptions {
    /// Requested count clamped to `1..=MAX_QUESTION_COUNT`
    pub fn question_count(&self) -> usize {
        self.question_count.clamp(1, MAX_QUESTION_COUNT)
    }

    /// Requested types in declaration order; an empty set means the defaults
    pub fn question_types(&self) -> Vec<QuestionType> {
        let set = if self.question_types.is_empty() {
            default_question_types()
        } else {
            self.question_types
        };
        set.iter().collect()
    }

    /// Custom content when it carries any text
    pub fn custom_content(&self) -> Option<&str> {
        self.custom_content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

pub fn default_question_types() -> EnumSet<QuestionType> {
    QuestionType::MultipleChoice | QuestionType::TrueFalse
}

mod question_types_serde {
    use super::*;

    pub fn serialize<S>(set: &EnumSet<QuestionType>, s: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let v: Vec<&'static str> = set.iter().map(|t| t.as_str()).collect();
        v.serialize(s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<EnumSet<QuestionType>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = Vec::<String>::deserialize(d)?;
        let mut out = EnumSet::empty();
        for s in v {
            let t = QuestionType::from_str(&s).map_err(serde::de::Error::custom)?;
            out.insert(t);
        }
        Ok(out)
    }
}

/// A single orchestration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum AssistRequest {
    Analyze {
        input: String,
    },
    Enhance {
        input: String,
        #[serde(default)]
        tone: ToneStyle,
    },
    Handwriting {
        input: String,
        action: HandwritingAction,
    },
    DocumentAnalysis {
        input: String,
        analysis: DocumentAnalysis,
    },
    EducationalChat {
        input: String,
        #[serde(default)]
        options: TutorOptions,
    },
    /// `input` is the quiz topic
    QuizGeneration {
        input: String,
        #[serde(default)]
        options: QuizOptions,
    },
}

impl AssistRequest {
    pub fn analyze(prompt: impl Into<String>) -> Self {
        Self::Analyze {
            input: prompt.into(),
        }
    }

    pub fn enhance(prompt: impl Into<String>, tone: ToneStyle) -> Self {
        Self::Enhance {
            input: prompt.into(),
            tone,
        }
    }

    pub fn handwriting(text: impl Into<String>, action: HandwritingAction) -> Self {
        Self::Handwriting {
            input: text.into(),
            action,
        }
    }

    pub fn document(text: impl Into<String>, analysis: DocumentAnalysis) -> Self {
        Self::DocumentAnalysis {
            input: text.into(),
            analysis,
        }
    }

    pub fn educational_chat(message: impl Into<String>, options: TutorOptions) -> Self {
        Self::EducationalChat {
            input: message.into(),
            options,
        }
    }

    pub fn quiz(topic: impl Into<String>, options: QuizOptions) -> Self {
        Self::QuizGeneration {
            input: topic.into(),
            options,
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            AssistRequest::Analyze { .. } => Mode::Analyze,
            AssistRequest::Enhance { .. } => Mode::Enhance,
            AssistRequest::Handwriting { .. } => Mode::Handwriting,
            AssistRequest::DocumentAnalysis { .. } => Mode::DocumentAnalysis,
            AssistRequest::EducationalChat { .. } => Mode::EducationalChat,
            AssistRequest::QuizGeneration { .. } => Mode::QuizGeneration,
        }
    }

    pub fn input(&self) -> &str {
        match self {
            AssistRequest::Analyze { input }
            | AssistRequest::Enhance { input, .. }
            | AssistRequest::Handwriting { input, .. }
            | AssistRequest::DocumentAnalysis { input, .. }
            | AssistRequest::EducationalChat { input, .. }
            | AssistRequest::QuizGeneration { input, .. } => input,
        }
    }

    /// Deterministic cache/debounce key over mode, input and options.
    pub fn cache_key(&self) -> String {
        // Serializing plain enums/structs/strings cannot fail
        let canonical = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{}:{}", self.mode(), hex::encode(hasher.finalize()))
    }
}
