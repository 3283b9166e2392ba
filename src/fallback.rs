//! Offline response synthesis.
//!
//! Used whenever the provider cannot be reached, is not configured, or returns
//! something unusable. Every response has the same shape a real provider
//! response would have for the mode.

use std::collections::HashMap;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::request::{
    AssistRequest, Difficulty, DocumentAnalysis, HandwritingAction, Personality, QuestionType,
    QuizOptions, ToneStyle, TutorOptions,
};
use crate::response::{PromptAnalysis, QuizQuestion, Response};

/// Fallback scores never exceed this; only a real analysis can rate higher.
pub const MAX_FALLBACK_SCORE: u32 = 85;

/// Inputs longer than this get a canned paraphrase instead of an echo
const SUMMARY_WORD_THRESHOLD: usize = 50;
const ECHO_WORDS: usize = 20;

/// Pluggable offline responder.
pub trait FallbackStrategy: Send + Sync {
    fn synthesize(&self, request: &AssistRequest) -> Response;
}

/// Keyword heuristics over the request text.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicFallback;

impl HeuristicFallback {
    pub fn new() -> Self {
        Self
    }
}

impl FallbackStrategy for HeuristicFallback {
    fn synthesize(&self, request: &AssistRequest) -> Response {
        match request {
            AssistRequest::Analyze { input } => Response::analysis(input.clone(), analyze(input)),
            AssistRequest::Enhance { input, tone } => {
                Response::enhanced(input.clone(), enhance(input, *tone))
            }
            AssistRequest::Handwriting { input, action } => {
                Response::processed(input.clone(), handwriting(input, *action))
            }
            AssistRequest::DocumentAnalysis { input, analysis } => {
                Response::processed(input.clone(), document(input, analysis))
            }
            AssistRequest::EducationalChat { input, options } => tutor(input, options),
            AssistRequest::QuizGeneration { input, options } => {
                Response::quiz(input.clone(), quiz(input, options))
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Detectors
// ───────────────────────────────────────────────────────────────────────────────

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("static fallback pattern is valid"));
    };
}

pattern!(DETAIL_RE, r"(?i)step[- ]by[- ]step|\bdetailed\b|\bspecific\b|\bexamples?\b");
pattern!(CONTEXT_RE, r"(?i)\b(for|about)\b");
pattern!(FORMAT_RE, r"(?i)\b(list|table|bullets?|format|json|paragraphs?|outline|words)\b");

pattern!(HOW_TO_RE, r"(?i)^\s*how\b|\bhow to\b|\bsteps?\b|\bguide\b|\btutorial\b");
pattern!(CREATIVE_RE, r"(?i)\b(write|story|poem|creative|imagine|design|compose|invent)\b");
pattern!(ANALYTICAL_RE, r"(?i)\b(analy[sz]e|compare|evaluate|assess|pros and cons|review)\b");
pattern!(EXPLANATORY_RE, r"(?i)\b(explain|describe|what is|what are|why|define|overview)\b");

pattern!(
    MATH_RE,
    r"(?i)\b(math|maths|mathematics|algebra|geometry|calculus|equations?|fractions?|numbers?|arithmetic|multiply|multiplication|divide|division|trigonometry|percent)"
);
pattern!(
    SCIENCE_RE,
    r"(?i)\b(science|physics|chemistry|biology|atoms?|cells?|energy|photosynthesis|molecules?|planets?|gravity|experiment)"
);
pattern!(STORY_RE, r"(?i)\b(story|once upon|character|adventure|dragon|journey|hero)\b");
pattern!(WORK_RE, r"(?i)\b(meeting|project|deadline|team|plan|client|schedule)\b");

pattern!(SENTENCE_RE, r"[^.!?]+[.!?]*");
pattern!(EXTRA_SPACE_RE, r" {2,}");

/// Literal corrections applied by the grammar fallback, in order
static GRAMMAR_FIXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bi\b", "I"),
        (r"\bim\b", "I'm"),
        (r"\bive\b", "I've"),
        (r"\bdont\b", "don't"),
        (r"\bcant\b", "can't"),
        (r"\bwont\b", "won't"),
        (r"\bdoesnt\b", "doesn't"),
        (r"\bisnt\b", "isn't"),
        (r"\bits\b", "it's"),
        (r"\bteh\b", "the"),
        (r"\bthier\b", "their"),
        (r"\brecieve\b", "receive"),
        (r"\bdefinately\b", "definitely"),
    ]
    .into_iter()
    .map(|(re, fix)| (Regex::new(re).expect("static grammar pattern is valid"), fix))
    .collect()
});

const STOPWORDS: &[&str] = &[
    "about", "after", "also", "been", "before", "being", "could", "does", "each", "from", "have",
    "into", "just", "like", "more", "most", "much", "only", "other", "over", "same", "should",
    "some", "such", "than", "that", "their", "them", "then", "there", "these", "they", "this",
    "those", "through", "very", "were", "what", "when", "where", "which", "while", "will", "with",
    "would", "your",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicBucket {
    Math,
    Science,
    General,
}

impl TopicBucket {
    pub fn detect(text: &str) -> Self {
        if MATH_RE.is_match(text) {
            TopicBucket::Math
        } else if SCIENCE_RE.is_match(text) {
            TopicBucket::Science
        } else {
            TopicBucket::General
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TopicBucket::Math => "Mathematics",
            TopicBucket::Science => "Science",
            TopicBucket::General => "General Learning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptCategory {
    HowTo,
    Creative,
    Analytical,
    Explanatory,
    General,
}

impl PromptCategory {
    pub fn detect(prompt: &str) -> Self {
        if HOW_TO_RE.is_match(prompt) {
            PromptCategory::HowTo
        } else if CREATIVE_RE.is_match(prompt) {
            PromptCategory::Creative
        } else if ANALYTICAL_RE.is_match(prompt) {
            PromptCategory::Analytical
        } else if EXPLANATORY_RE.is_match(prompt) {
            PromptCategory::Explanatory
        } else {
            PromptCategory::General
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Text helpers
// ───────────────────────────────────────────────────────────────────────────────

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn sentences(text: &str) -> Vec<String> {
    SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .collect()
}

fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

fn with_terminal_punctuation(text: &str) -> String {
    let trimmed = text.trim_end();
    match trimmed.chars().last() {
        Some('.' | '!' | '?') | None => trimmed.to_string(),
        Some(_) => format!("{trimmed}."),
    }
}

fn capitalize_sentences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut capitalize_next = true;
    for c in text.chars() {
        if capitalize_next && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
            if matches!(c, '.' | '!' | '?') {
                capitalize_next = true;
            } else if !c.is_whitespace() {
                capitalize_next = false;
            }
        }
    }
    out
}

/// Most frequent non-trivial words, ties broken alphabetically
fn top_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in text.split(|c: char| !c.is_alphanumeric() && c != '-') {
        let word = word.trim_matches('-').to_lowercase();
        if word.chars().count() < 4 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        *counts.entry(word).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(w, _)| w).collect()
}

fn bullets(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        format!("• {empty}")
    } else {
        items
            .iter()
            .map(|i| format!("• {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Per-mode synthesis
// ───────────────────────────────────────────────────────────────────────────────

fn analyze(prompt: &str) -> PromptAnalysis {
    let words = word_count(prompt);
    let detailed = DETAIL_RE.is_match(prompt);
    let has_context = CONTEXT_RE.is_match(prompt);
    let has_format = FORMAT_RE.is_match(prompt);

    let mut score: u32 = 40;
    if words >= 5 {
        score += 10;
    }
    if words >= 15 {
        score += 10;
    }
    if words >= 30 {
        score += 5;
    }
    if detailed {
        score += 10;
    }
    if has_context {
        score += 5;
    }
    if has_format {
        score += 5;
    }
    score += rand::thread_rng().gen_range(0..=5);
    let score = score.min(MAX_FALLBACK_SCORE);

    let mut strengths = vec!["States a clear request the model can act on".to_string()];
    if words >= 15 {
        strengths.push("Provides a reasonable amount of detail".to_string());
    }
    if detailed {
        strengths.push("Asks for a detailed or step-by-step answer".to_string());
    }
    if has_context {
        strengths.push("Gives context about the subject or audience".to_string());
    }

    let mut weaknesses = Vec::new();
    if words < 15 {
        weaknesses.push("The prompt is brief and may lack context".to_string());
    }
    if !detailed {
        weaknesses.push("Does not ask for a specific level of detail".to_string());
    }
    if !has_format {
        weaknesses.push("Does not specify the desired output format".to_string());
    }
    if weaknesses.is_empty() {
        weaknesses.push("Success criteria could be stated more explicitly".to_string());
    }

    let mut suggestions = vec!["Describe the intended audience and purpose".to_string()];
    if !has_format {
        suggestions.push("Specify the output format (list, table, paragraphs, length)".to_string());
    }
    if !detailed {
        suggestions.push("Ask for examples or a step-by-step explanation".to_string());
    }
    suggestions.push("Add constraints such as tone, scope or word count".to_string());

    PromptAnalysis {
        score,
        strengths,
        weaknesses,
        suggestions,
    }
}

fn enhance(prompt: &str, tone: ToneStyle) -> String {
    let suffix = match PromptCategory::detect(prompt) {
        PromptCategory::HowTo => {
            "Provide a clear, numbered step-by-step guide, list any prerequisites, and point out common mistakes to avoid."
        }
        PromptCategory::Creative => {
            "Be imaginative and original, use vivid sensory detail, and give the piece a clear structure with a strong opening and ending."
        }
        PromptCategory::Analytical => {
            "Break the analysis into clear criteria, weigh the evidence on each side, and finish with a reasoned conclusion."
        }
        PromptCategory::Explanatory => {
            "Explain the core concepts clearly, build from fundamentals to more advanced ideas, and include concrete examples and real-world applications."
        }
        PromptCategory::General => {
            "Provide a thorough, well-structured response with relevant context and specific examples."
        }
    };

    let modifier = match tone {
        ToneStyle::Formal => "Use a formal, professional tone throughout.",
        ToneStyle::Casual => "Keep the tone friendly and conversational.",
        ToneStyle::Technical => {
            "Use precise technical terminology, include implementation details, and reference relevant algorithms, formulas or specifications where appropriate."
        }
        ToneStyle::Creative => "Feel free to use an engaging, imaginative voice.",
        ToneStyle::Academic => {
            "Adopt an academic tone with rigorous reasoning and references to established research."
        }
    };

    format!("{} {suffix} {modifier}", with_terminal_punctuation(prompt.trim()))
        .trim_start()
        .to_string()
}

fn handwriting(text: &str, action: HandwritingAction) -> String {
    match action {
        HandwritingAction::Continue => {
            let continuation = if STORY_RE.is_match(text) {
                "As the moment settled, a new possibility appeared on the horizon, and nothing would be quite the same again."
            } else if SCIENCE_RE.is_match(text) {
                "Further observation would help confirm this idea, and a simple experiment could test how the results change under different conditions."
            } else if WORK_RE.is_match(text) {
                "The next step is to agree on clear owners and deadlines so the team can move forward with confidence."
            } else {
                "Building on this thought, it is worth considering how these ideas connect and what they might lead to next."
            };
            let base = text.trim_end();
            if base.is_empty() {
                continuation.to_string()
            } else {
                format!("{} {continuation}", with_terminal_punctuation(base))
            }
        }
        HandwritingAction::Grammar => {
            let mut fixed = text.trim().to_string();
            for (re, replacement) in GRAMMAR_FIXES.iter() {
                fixed = re.replace_all(&fixed, *replacement).into_owned();
            }
            fixed = EXTRA_SPACE_RE.replace_all(&fixed, " ").into_owned();
            with_terminal_punctuation(&capitalize_sentences(&fixed))
        }
        HandwritingAction::Shorten => {
            let parts = sentences(text);
            if parts.len() > 1 {
                let keep = parts.len().div_ceil(2);
                parts[..keep].join(" ")
            } else {
                let words: Vec<&str> = text.split_whitespace().collect();
                if words.len() > 10 {
                    let keep = (words.len() * 3).div_ceil(5);
                    format!("{}...", words[..keep].join(" "))
                } else {
                    text.trim().to_string()
                }
            }
        }
        HandwritingAction::Summarize => {
            let words = word_count(text);
            if words > SUMMARY_WORD_THRESHOLD {
                let opening = sentences(text)
                    .into_iter()
                    .next()
                    .map(|s| first_words(&s, 15))
                    .unwrap_or_default();
                let keywords = top_keywords(text, 3);
                let focus = if keywords.is_empty() {
                    "its central idea".to_string()
                } else {
                    keywords.join(", ")
                };
                format!(
                    "Summary: The text opens with \"{opening}\" and develops its main points over {words} words, focusing on {focus}. The key takeaway is the central argument set out in the opening lines."
                )
            } else if words > ECHO_WORDS {
                format!("{}...", first_words(text, ECHO_WORDS))
            } else {
                text.trim().to_string()
            }
        }
    }
}

fn document(text: &str, analysis: &DocumentAnalysis) -> String {
    let words = word_count(text);
    let parts = sentences(text);
    let opening = parts
        .first()
        .map(|s| first_words(s, 20))
        .unwrap_or_else(|| first_words(text, 20));

    match analysis {
        DocumentAnalysis::Summarize => {
            let points: Vec<String> = top_keywords(text, 3)
                .into_iter()
                .map(|k| format!("Discusses \"{k}\""))
                .collect();
            format!(
                "📄 Document Summary\n\n\
Overview:\n• The document contains {words} words across {} sentences.\n• It opens with: \"{opening}\"\n\n\
Key Points:\n{}\n\n\
Conclusion:\n• The document presents its main ideas in the opening section and develops them throughout.",
                parts.len(),
                bullets(&points, "The document covers a single main idea")
            )
        }
        DocumentAnalysis::ExtractKeywords => {
            let keywords = top_keywords(text, 10);
            let (main, rest) = keywords.split_at(keywords.len().min(3));
            format!(
                "🔑 Extracted Keywords\n\n\
Main Topics:\n{}\n\n\
Key Terms:\n{}\n\n\
Document Length:\n• {words} words",
                bullets(main, "No distinctive topics found"),
                bullets(rest, "No additional terms found")
            )
        }
        DocumentAnalysis::QAndA { question } => format!(
            "❓ Question: {question}\n\n\
💡 Answer:\nBased on the document, the answer to \"{question}\" is found in its main content, which begins: \"{opening}\"\n\n\
📌 Relevant Details:\n• The document contains {words} words.\n• Review the passages that mention the key terms of your question for supporting detail."
        ),
    }
}

fn tutor(message: &str, options: &TutorOptions) -> Response {
    let probe = match options.topic.as_deref() {
        Some(topic) => format!("{topic} {message}"),
        None => message.to_string(),
    };
    let bucket = TopicBucket::detect(&probe);

    let (body, emoji) = match bucket {
        TopicBucket::Math => (
            "Great question! Math is all about spotting patterns. Let's break it down step by step: start with what you already know, write down each step, and check your answer by working backwards.",
            "🔢",
        ),
        TopicBucket::Science => (
            "What a curious question! Science starts with observation. Think about what you have noticed, form a simple hypothesis, and consider how you could test it with an experiment.",
            "🔬",
        ),
        TopicBucket::General => (
            "That's a great thing to be curious about! Let's explore it together: start with the main idea, connect it to something you already know, and build up from there.",
            "📚",
        ),
    };

    let closing = match options.personality {
        Personality::Encouraging => "You're doing great. What would you like to explore next?",
        Personality::Socratic => "What do you think the first step should be?",
        Personality::Playful => "Ready for the next level of this adventure?",
        Personality::Concise => "Ask a follow-up if you need more.",
    };

    Response::tutor(
        message,
        format!("{body} {closing}"),
        emoji,
        Some(bucket.label().to_string()),
    )
}

struct CannedQuestion {
    question: String,
    options: Option<Vec<String>>,
    correct_answer: String,
    explanation: String,
}

fn canned_question(bucket: TopicBucket, kind: QuestionType, topic: &str) -> CannedQuestion {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let true_false = || Some(strings(&["True", "False"]));

    match (bucket, kind) {
        (TopicBucket::Math, QuestionType::MultipleChoice) => CannedQuestion {
            question: "What is 7 × 8?".to_string(),
            options: Some(strings(&["54", "56", "64", "48"])),
            correct_answer: "56".to_string(),
            explanation: "7 multiplied by 8 equals 56.".to_string(),
        },
        (TopicBucket::Math, QuestionType::TrueFalse) => CannedQuestion {
            question: "The interior angles of a triangle add up to 180 degrees.".to_string(),
            options: true_false(),
            correct_answer: "True".to_string(),
            explanation: "In Euclidean geometry every triangle's angles sum to 180°.".to_string(),
        },
        (TopicBucket::Math, QuestionType::ShortAnswer) => CannedQuestion {
            question: "What is the value of 3² + 4²?".to_string(),
            options: None,
            correct_answer: "25".to_string(),
            explanation: "9 + 16 = 25.".to_string(),
        },
        (TopicBucket::Science, QuestionType::MultipleChoice) => CannedQuestion {
            question: "Which gas do plants absorb from the air during photosynthesis?".to_string(),
            options: Some(strings(&["Oxygen", "Carbon dioxide", "Nitrogen", "Hydrogen"])),
            correct_answer: "Carbon dioxide".to_string(),
            explanation: "Plants take in carbon dioxide and release oxygen.".to_string(),
        },
        (TopicBucket::Science, QuestionType::TrueFalse) => CannedQuestion {
            question: "Sound travels faster in a vacuum than in air.".to_string(),
            options: true_false(),
            correct_answer: "False".to_string(),
            explanation: "Sound needs a medium; it cannot travel through a vacuum.".to_string(),
        },
        (TopicBucket::Science, QuestionType::ShortAnswer) => CannedQuestion {
            question: "What is the chemical formula for water?".to_string(),
            options: None,
            correct_answer: "H2O".to_string(),
            explanation: "Each water molecule has two hydrogen atoms and one oxygen atom."
                .to_string(),
        },
        (TopicBucket::General, QuestionType::MultipleChoice) => CannedQuestion {
            question: format!("Which of the following best describes the study of {topic}?"),
            options: Some(vec![
                format!("Understanding the core principles of {topic}"),
                "Memorizing unrelated facts".to_string(),
                "Avoiding practice and examples".to_string(),
                "None of the above".to_string(),
            ]),
            correct_answer: format!("Understanding the core principles of {topic}"),
            explanation: format!("Learning {topic} starts with its core principles."),
        },
        (TopicBucket::General, QuestionType::TrueFalse) => CannedQuestion {
            question: format!(
                "Understanding the fundamentals of {topic} makes advanced ideas easier to learn."
            ),
            options: true_false(),
            correct_answer: "True".to_string(),
            explanation: "Advanced topics build on fundamentals.".to_string(),
        },
        (TopicBucket::General, QuestionType::ShortAnswer) => CannedQuestion {
            question: format!("Name one key concept related to {topic}."),
            options: None,
            correct_answer: format!("Any core concept of {topic}"),
            explanation: "Answers will vary; any central concept is acceptable.".to_string(),
        },
    }
}

fn quiz(topic: &str, options: &QuizOptions) -> Vec<QuizQuestion> {
    let topic = match topic.trim() {
        "" => "this topic",
        t => t,
    };
    let probe = match options.custom_content() {
        Some(content) => format!("{topic} {content}"),
        None => topic.to_string(),
    };
    let bucket = TopicBucket::detect(&probe);
    let types = options.question_types();
    let difficulty: Difficulty = options.difficulty;

    (0..options.question_count())
        .map(|i| {
            let kind = types[i % types.len()];
            let canned = canned_question(bucket, kind, topic);
            QuizQuestion {
                id: format!("q{}", i + 1),
                kind,
                question: canned.question,
                options: canned.options,
                correct_answer: canned.correct_answer,
                explanation: canned.explanation,
                difficulty,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ChatRole, ChatTurn, Level, Mode};
    use crate::response::{allowed_fields, required_fields};

    const SAMPLE_INPUTS: &[&str] = &[
        "",
        " ",
        "test",
        "i think its fine",
        "Explain machine learning",
        "How to bake bread step-by-step for beginners",
        "Write a poem about the sea",
        "Compare Rust and Go for backend services",
        "math fractions are hard",
        "Photosynthesis converts light energy into chemical energy. Plants use it. It matters.",
        "ünïcödé 😀 text with symbols !!! ??? ...",
        "a b c d e f g h i j k l m n o p q r s t u v w x y z a b c d e f g h i j k l m n o p q r s t u v w x y z",
    ];

    fn requests_for(input: &str) -> Vec<AssistRequest> {
        vec![
            AssistRequest::analyze(input),
            AssistRequest::enhance(input, ToneStyle::default()),
            AssistRequest::handwriting(input, HandwritingAction::Continue),
            AssistRequest::handwriting(input, HandwritingAction::Grammar),
            AssistRequest::handwriting(input, HandwritingAction::Shorten),
            AssistRequest::handwriting(input, HandwritingAction::Summarize),
            AssistRequest::document(input, DocumentAnalysis::Summarize),
            AssistRequest::document(input, DocumentAnalysis::ExtractKeywords),
            AssistRequest::document(
                input,
                DocumentAnalysis::QAndA {
                    question: "What is this about?".to_string(),
                },
            ),
            AssistRequest::educational_chat(input, TutorOptions::default()),
            AssistRequest::quiz(input, QuizOptions::default()),
        ]
    }

    #[test]
    fn test_shape_invariant_for_every_mode_and_input() {
        let fallback = HeuristicFallback::new();
        for input in SAMPLE_INPUTS {
            for request in requests_for(input) {
                let mode = request.mode();
                let response = fallback.synthesize(&request);
                assert!(response.satisfies_shape(mode), "{mode} shape for {input:?}");
                assert_eq!(response.text, *input);

                let value = serde_json::to_value(&response).unwrap();
                let keys: Vec<&str> = value
                    .as_object()
                    .unwrap()
                    .keys()
                    .map(String::as_str)
                    .filter(|k| *k != "text")
                    .collect();
                for required in required_fields(mode) {
                    assert!(keys.contains(required), "{mode} missing {required}");
                }
                for key in &keys {
                    assert!(allowed_fields(mode).contains(key), "{mode} leaked {key}");
                }
            }
        }
    }

    #[test]
    fn test_analyze_score_capped_and_lists_non_empty() {
        let fallback = HeuristicFallback::new();
        let long = "Write a detailed, step-by-step guide for beginners about baking sourdough bread at home, formatted as a numbered list with examples, tips, and a short summary paragraph at the end for quick reference by busy readers";
        for input in SAMPLE_INPUTS.iter().copied().chain([long]) {
            for _ in 0..25 {
                let response = fallback.synthesize(&AssistRequest::analyze(input));
                let analysis = response.analysis_result().unwrap();
                assert!(analysis.score <= MAX_FALLBACK_SCORE);
                assert!(!analysis.strengths.is_empty());
                assert!(!analysis.weaknesses.is_empty());
                assert!(!analysis.suggestions.is_empty());
            }
        }
        let rich = fallback.synthesize(&AssistRequest::analyze(long));
        assert_eq!(rich.analysis_result().unwrap().score, MAX_FALLBACK_SCORE);
    }

    #[test]
    fn test_quiz_count_and_question_shape() {
        let fallback = HeuristicFallback::new();
        for count in 1..=12 {
            for types in [
                QuestionType::MultipleChoice.into(),
                QuestionType::ShortAnswer.into(),
                QuestionType::MultipleChoice | QuestionType::TrueFalse | QuestionType::ShortAnswer,
            ] {
                let options = QuizOptions {
                    question_count: count,
                    question_types: types,
                    difficulty: Difficulty::Hard,
                    custom_content: None,
                };
                let response = fallback.synthesize(&AssistRequest::quiz("algebra", options));
                let questions = response.questions().unwrap();
                assert_eq!(questions.len(), count);
                for q in questions {
                    assert!(q.is_well_formed());
                    assert_eq!(q.options.is_some(), q.kind != QuestionType::ShortAnswer);
                    assert!(types.contains(q.kind));
                    assert_eq!(q.difficulty, Difficulty::Hard);
                }
                let mut ids: Vec<&str> = questions.iter().map(|q| q.id.as_str()).collect();
                ids.dedup();
                assert_eq!(ids.len(), count);
            }
        }
    }

    #[test]
    fn test_quiz_topic_buckets() {
        let fallback = HeuristicFallback::new();
        let single_mc = QuizOptions {
            question_count: 1,
            question_types: QuestionType::MultipleChoice.into(),
            ..QuizOptions::default()
        };
        let math = fallback.synthesize(&AssistRequest::quiz("fractions", single_mc.clone()));
        assert_eq!(math.questions().unwrap()[0].correct_answer, "56");

        let science = fallback.synthesize(&AssistRequest::quiz("biology", single_mc.clone()));
        assert_eq!(science.questions().unwrap()[0].correct_answer, "Carbon dioxide");

        let general = fallback.synthesize(&AssistRequest::quiz("medieval history", single_mc.clone()));
        assert!(general.questions().unwrap()[0].question.contains("medieval history"));

        let grounded = fallback.synthesize(&AssistRequest::quiz(
            "chapter 3",
            QuizOptions {
                custom_content: Some("Atoms are made of protons, neutrons and electrons.".to_string()),
                ..single_mc
            },
        ));
        assert_eq!(grounded.questions().unwrap()[0].correct_answer, "Carbon dioxide");
    }

    #[test]
    fn test_enhance_explanatory_technical() {
        let response = HeuristicFallback::new().synthesize(&AssistRequest::enhance(
            "Explain machine learning",
            ToneStyle::Technical,
        ));
        let enhanced = response.enhanced_prompt().unwrap();
        assert!(enhanced.starts_with("Explain machine learning."));
        assert!(enhanced.contains("build from fundamentals to more advanced ideas"));
        assert!(enhanced.contains("precise technical terminology"));
    }

    #[test]
    fn test_prompt_categories() {
        assert_eq!(PromptCategory::detect("How do I start?"), PromptCategory::HowTo);
        assert_eq!(PromptCategory::detect("Write a haiku"), PromptCategory::Creative);
        assert_eq!(PromptCategory::detect("Evaluate this plan"), PromptCategory::Analytical);
        assert_eq!(PromptCategory::detect("Describe a cell"), PromptCategory::Explanatory);
        assert_eq!(PromptCategory::detect("pizza"), PromptCategory::General);
    }

    #[test]
    fn test_grammar_replacements_and_capitalization() {
        let out = handwriting("i think its fine.  i dont know why", HandwritingAction::Grammar);
        assert_eq!(out, "I think it's fine. I don't know why.");
    }

    #[test]
    fn test_shorten_keeps_first_half_of_sentences() {
        let out = handwriting(
            "First point. Second point. Third point. Fourth point.",
            HandwritingAction::Shorten,
        );
        assert_eq!(out, "First point. Second point.");

        let out = handwriting("one two three four five six seven eight nine ten", HandwritingAction::Shorten);
        assert_eq!(out, "one two three four five six seven eight nine ten");

        let out = handwriting(
            "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen",
            HandwritingAction::Shorten,
        );
        assert_eq!(out, "one two three four five six seven eight nine...");
    }

    #[test]
    fn test_summarize_paraphrases_only_long_text() {
        let short = "A short note about the weather.";
        assert_eq!(handwriting(short, HandwritingAction::Summarize), short);

        let long = "The project meeting covered budget planning. ".repeat(10);
        let out = handwriting(&long, HandwritingAction::Summarize);
        assert!(out.starts_with("Summary:"));
        assert!(out.contains("60 words"));
    }

    #[test]
    fn test_continue_is_topic_aware() {
        let out = handwriting("Once upon a time a dragon slept", HandwritingAction::Continue);
        assert!(out.starts_with("Once upon a time a dragon slept."));
        assert!(out.contains("new possibility"));

        let out = handwriting("Our team meeting ran long", HandwritingAction::Continue);
        assert!(out.contains("owners and deadlines"));
    }

    #[test]
    fn test_qa_embeds_question() {
        let response = HeuristicFallback::new().synthesize(&AssistRequest::document(
            "short doc",
            DocumentAnalysis::QAndA {
                question: "What is this about?".to_string(),
            },
        ));
        let text = response.processed_text().unwrap();
        assert!(text.contains("What is this about?"));
        assert!(text.contains("short doc"));
    }

    #[test]
    fn test_keywords_rank_by_frequency() {
        let text = "Rust ownership makes memory safety practical. Ownership rules and borrowing rules keep memory safe. Ownership!";
        let keywords = top_keywords(text, 3);
        assert_eq!(keywords[0], "ownership");
        assert!(keywords.contains(&"memory".to_string()));
        assert!(keywords.contains(&"rules".to_string()));
    }

    #[test]
    fn test_tutor_topic_detection_and_personality() {
        let fallback = HeuristicFallback::new();
        let math = fallback.synthesize(&AssistRequest::educational_chat(
            "How do I add fractions?",
            TutorOptions::default(),
        ));
        let value = serde_json::to_value(&math).unwrap();
        assert_eq!(value["emoji"], "🔢");
        assert_eq!(value["detectedTopic"], "Mathematics");

        let science = fallback.synthesize(&AssistRequest::educational_chat(
            "Why is that?",
            TutorOptions {
                topic: Some("physics".to_string()),
                level: Level::Advanced,
                personality: Personality::Socratic,
                conversation_history: vec![ChatTurn {
                    role: ChatRole::Assistant,
                    content: "Hi!".to_string(),
                }],
            },
        ));
        let value = serde_json::to_value(&science).unwrap();
        assert_eq!(value["detectedTopic"], "Science");
        assert!(value["response"].as_str().unwrap().ends_with("What do you think the first step should be?"));

        let general = fallback.synthesize(&AssistRequest::educational_chat("hello", TutorOptions::default()));
        assert!(general.satisfies_shape(Mode::EducationalChat));
        assert_eq!(serde_json::to_value(&general).unwrap()["emoji"], "📚");
    }
}
