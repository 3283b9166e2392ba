//! Prompt templates and model parameters for every mode.
//!
//! `build_messages` is pure: the same request always produces the same
//! system and user messages.

use crate::request::{
    AssistRequest, ChatRole, ChatTurn, Difficulty, DocumentAnalysis, HandwritingAction, Level,
    Mode, Personality, QuizOptions, ToneStyle, TutorOptions,
};

/// Number of prior tutor turns replayed into the user message
const HISTORY_WINDOW: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a JSON object response
    pub json_output: bool,
}

/// Sampling parameters per mode: analytic modes run cool, generative ones warm.
pub fn model_params(mode: Mode) -> ModelParams {
    match mode {
        Mode::Analyze => ModelParams {
            temperature: 0.3,
            max_tokens: 1000,
            json_output: true,
        },
        Mode::Enhance => ModelParams {
            temperature: 0.7,
            max_tokens: 1000,
            json_output: false,
        },
        Mode::Handwriting => ModelParams {
            temperature: 0.7,
            max_tokens: 1000,
            json_output: false,
        },
        Mode::DocumentAnalysis => ModelParams {
            temperature: 0.3,
            max_tokens: 1500,
            json_output: false,
        },
        Mode::EducationalChat => ModelParams {
            temperature: 0.8,
            max_tokens: 1000,
            json_output: false,
        },
        Mode::QuizGeneration => ModelParams {
            temperature: 0.7,
            max_tokens: 2000,
            json_output: true,
        },
    }
}

pub fn build_messages(request: &AssistRequest) -> PromptPair {
    match request {
        AssistRequest::Analyze { input } => analyze_prompt(input),
        AssistRequest::Enhance { input, tone } => enhance_prompt(input, *tone),
        AssistRequest::Handwriting { input, action } => handwriting_prompt(input, *action),
        AssistRequest::DocumentAnalysis { input, analysis } => document_prompt(input, analysis),
        AssistRequest::EducationalChat { input, options } => tutor_prompt(input, options),
        AssistRequest::QuizGeneration { input, options } => quiz_prompt(input, options),
    }
}

fn analyze_prompt(input: &str) -> PromptPair {
    let system = r#"You are an expert prompt engineer who evaluates prompts written for large language models.
Assess the prompt for clarity, specificity, context, structure and expected output format.

Respond ONLY with a JSON object of this exact shape:
{
    "score": 0-100 integer overall quality,
    "strengths": ["string", ...],
    "weaknesses": ["string", ...],
    "suggestions": ["string", ...]
}

Give 2-4 concise items in each list. Do not add any text outside the JSON object."#
        .to_string();

    let user = format!("Analyze this prompt:\n\n\"\"\"\n{input}\n\"\"\"");
    PromptPair { system, user }
}

fn tone_directive(tone: ToneStyle) -> &'static str {
    match tone {
        ToneStyle::Formal => {
            "Use a formal, professional register with precise wording and no slang."
        }
        ToneStyle::Casual => "Use a relaxed, conversational register that still stays clear.",
        ToneStyle::Technical => {
            "Use a technical register: precise terminology, explicit constraints, and requests for concrete examples or specifications."
        }
        ToneStyle::Creative => {
            "Use an imaginative register that invites originality, vivid detail and unexpected angles."
        }
        ToneStyle::Academic => {
            "Use an academic register that asks for rigor, structured argument and references to established work."
        }
    }
}

fn enhance_prompt(input: &str, tone: ToneStyle) -> PromptPair {
    let system = format!(
        "You are an expert prompt engineer. Rewrite the user's prompt so a large language model \
will produce a better answer: add missing context, state the goal, specify the desired \
structure and length of the output, and remove ambiguity. Keep the user's original intent.\n\n\
Tone: {}. {}\n\n\
Return ONLY the improved prompt as plain text. Do not explain your changes and do not wrap \
the prompt in quotes.",
        tone.as_str(),
        tone_directive(tone)
    );
    let user = format!("Improve this prompt:\n\n{input}");
    PromptPair { system, user }
}

fn handwriting_prompt(input: &str, action: HandwritingAction) -> PromptPair {
    let (task, guidance) = match action {
        HandwritingAction::Continue => (
            "Continue the user's text naturally.",
            "Match the existing voice, tense and style. Write two to four sentences that follow on from the last sentence. Return the original text followed by your continuation.",
        ),
        HandwritingAction::Grammar => (
            "Correct the grammar, spelling and punctuation of the user's text.",
            "Preserve the meaning and wording wherever possible. Return only the corrected text.",
        ),
        HandwritingAction::Shorten => (
            "Shorten the user's text.",
            "Keep the key information and cut it to roughly half its length. Return only the shortened text.",
        ),
        HandwritingAction::Summarize => (
            "Summarize the user's text.",
            "Write a concise summary of two or three sentences that captures the main points. Return only the summary.",
        ),
    };

    let system = format!(
        "You are a careful writing assistant helping someone with their handwritten notes. \
{task} {guidance} Respond in plain text without headings or commentary."
    );
    let user = format!("Text ({}):\n\n{input}", action.as_str());
    PromptPair { system, user }
}

fn document_prompt(input: &str, analysis: &DocumentAnalysis) -> PromptPair {
    let (system, user) = match analysis {
        DocumentAnalysis::Summarize => (
            "You are a document analyst. Produce a structured summary of the document with these \
sections: an overview paragraph, a bulleted list of the key points, and a short conclusion. \
Use plain text with '•' bullets."
                .to_string(),
            format!("Summarize the following document:\n\n{input}"),
        ),
        DocumentAnalysis::ExtractKeywords => (
            "You are a document analyst. Extract the most important keywords and key phrases from \
the document. Group them under the headings 'Main Topics', 'Key Terms' and 'Named Entities', \
one item per '•' bullet. Use plain text."
                .to_string(),
            format!("Extract keywords from the following document:\n\n{input}"),
        ),
        DocumentAnalysis::QAndA { question } => (
            "You are a document analyst answering questions about a document. Answer using only \
information found in the document. If the document does not contain the answer, say so \
plainly. Quote short supporting passages where helpful. Use plain text."
                .to_string(),
            format!("Document:\n\n{input}\n\nQuestion: {question}"),
        ),
    };
    PromptPair { system, user }
}

fn level_directive(level: Level) -> &'static str {
    match level {
        Level::Beginner => {
            "The student is a beginner: use simple words, short steps and everyday analogies."
        }
        Level::Intermediate => {
            "The student is intermediate: assume the basics and focus on connecting ideas."
        }
        Level::Advanced => {
            "The student is advanced: be rigorous, use proper terminology and mention edge cases."
        }
    }
}

fn personality_directive(personality: Personality) -> &'static str {
    match personality {
        Personality::Encouraging => {
            "Be warm and encouraging, celebrate progress and keep the student motivated."
        }
        Personality::Socratic => {
            "Guide with questions rather than giving answers outright, one question at a time."
        }
        Personality::Playful => "Be playful and light-hearted, using fun examples where they help.",
        Personality::Concise => "Be brief and to the point, no more than a short paragraph.",
    }
}

fn render_history(history: &[ChatTurn]) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|turn| {
            let who = match turn.role {
                ChatRole::User => "Student",
                ChatRole::Assistant => "Tutor",
            };
            format!("{who}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tutor_prompt(input: &str, options: &TutorOptions) -> PromptPair {
    let topic = options
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("any subject the student asks about");

    let system = format!(
        "You are a friendly AI tutor. Subject: {topic}.\n{}\n{}\n\
Explain concepts step by step, check understanding, and end with a short follow-up question \
or practice suggestion. Respond in plain text.",
        level_directive(options.level),
        personality_directive(options.personality)
    );

    let user = if options.conversation_history.is_empty() {
        input.to_string()
    } else {
        format!(
            "Conversation so far:\n{}\n\nStudent: {input}",
            render_history(&options.conversation_history)
        )
    };
    PromptPair { system, user }
}

fn difficulty_directive(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "Easy: test recall of basic facts and definitions.",
        Difficulty::Medium => "Medium: test understanding and simple application.",
        Difficulty::Hard => "Hard: test analysis, multi-step reasoning and subtle distinctions.",
    }
}

fn quiz_prompt(topic: &str, options: &QuizOptions) -> PromptPair {
    let types = options
        .question_types()
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let count = options.question_count();

    let system = format!(
        r#"You are an expert educator who writes quiz questions.
Difficulty: {}
Allowed question types: {types}

Respond ONLY with a JSON object of this exact shape:
{{
    "questions": [
        {{
            "id": "q1",
            "type": "multiple-choice" | "true-false" | "short-answer",
            "question": "string",
            "options": ["string", ...],
            "correctAnswer": "string",
            "explanation": "string",
            "difficulty": "{}"
        }}
    ]
}}

Rules:
- Produce exactly {count} questions.
- "options" is required for multiple-choice (four options) and true-false (["True", "False"]) and must be omitted for short-answer.
- "correctAnswer" must match one of the options exactly when options are present.
- Do not add any text outside the JSON object."#,
        difficulty_directive(options.difficulty),
        options.difficulty.as_str(),
    );

    let user = match options.custom_content() {
        Some(content) => format!(
            "Create a {count}-question quiz about \"{topic}\" based strictly on the following content. \
Every question must be answerable from this content alone.\n\nContent:\n{content}"
        ),
        None => format!("Create a {count}-question quiz about \"{topic}\"."),
    };
    PromptPair { system, user }
}
