//! Prompt idea generator.
//!
//! One provider call per invocation. Results are never cached or debounced.

use serde::{Deserialize, Serialize};

use crate::error::{AssistError, Result};
use crate::gateway::{LlmGateway, extract_json};
use crate::prompts::{ModelParams, PromptPair};

pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const MAX_RESULTS: usize = 10;

const GENERATOR_PARAMS: ModelParams = ModelParams {
    temperature: 0.8,
    max_tokens: 1500,
    json_output: true,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPrompt {
    pub title: String,
    pub prompt: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "general".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PromptList {
    Wrapped { prompts: Vec<GeneratedPrompt> },
    Bare(Vec<GeneratedPrompt>),
}

pub struct PromptGenerator {
    gateway: Option<LlmGateway>,
}

impl PromptGenerator {
    /// Without a gateway every call returns the local templates.
    pub fn new(gateway: Option<LlmGateway>) -> Self {
        Self { gateway }
    }

    pub async fn generate(
        &self,
        topic: &str,
        use_case: &str,
        max_results: Option<usize>,
    ) -> Vec<GeneratedPrompt> {
        let count = max_results
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS);

        let Some(gateway) = &self.gateway else {
            tracing::debug!("No provider configured, using local prompt templates");
            return local_prompts(topic, use_case, count);
        };

        match self.fetch(gateway, topic, use_case, count).await {
            Ok(prompts) => prompts,
            Err(e) => {
                tracing::warn!(error = %e, "Prompt generation failed, using local templates");
                local_prompts(topic, use_case, count)
            }
        }
    }

    async fn fetch(
        &self,
        gateway: &LlmGateway,
        topic: &str,
        use_case: &str,
        count: usize,
    ) -> Result<Vec<GeneratedPrompt>> {
        let pair = PromptPair {
            system: format!(
                "You are an expert prompt engineer. Generate exactly {count} high-quality, \
                 ready-to-use prompts. Respond with JSON only, in the form \
                 {{\"prompts\": [{{\"title\": \"...\", \"prompt\": \"...\", \"category\": \"...\"}}]}}."
            ),
            user: format!(
                "Topic: {}\nUse case: {}",
                topic.trim(),
                use_case_or_default(use_case)
            ),
        };

        let raw = gateway.complete(&pair, &GENERATOR_PARAMS).await?;
        let list: PromptList = serde_json::from_str(extract_json(&raw)?)?;
        let prompts: Vec<GeneratedPrompt> = match list {
            PromptList::Wrapped { prompts } | PromptList::Bare(prompts) => prompts,
        }
        .into_iter()
        .filter(|p| !p.title.trim().is_empty() && !p.prompt.trim().is_empty())
        .take(count)
        .collect();

        if prompts.is_empty() {
            return Err(AssistError::MalformedResponse(
                "prompt list was empty".to_string(),
            ));
        }
        Ok(prompts)
    }
}

fn use_case_or_default(use_case: &str) -> &str {
    match use_case.trim() {
        "" => "general use",
        u => u,
    }
}

/// Deterministic templated prompts for `topic`
pub fn local_prompts(topic: &str, use_case: &str, count: usize) -> Vec<GeneratedPrompt> {
    let topic = match topic.trim() {
        "" => "your topic",
        t => t,
    };
    let use_case = use_case_or_default(use_case);

    let templates: [(&str, String, &str); MAX_RESULTS] = [
        (
            "Step-by-step guide",
            format!("Create a detailed step-by-step guide to {topic} for {use_case}, including prerequisites and common pitfalls."),
            "how-to",
        ),
        (
            "Beginner explanation",
            format!("Explain {topic} to a complete beginner using simple language, analogies and one concrete example."),
            "explanatory",
        ),
        (
            "Pros and cons",
            format!("Analyze the main advantages and disadvantages of {topic} in the context of {use_case}, and finish with a recommendation."),
            "analytical",
        ),
        (
            "Creative scenario",
            format!("Write a short, vivid scenario that shows {topic} in action for {use_case}."),
            "creative",
        ),
        (
            "Expert interview",
            format!("Act as a leading expert in {topic}. List the five questions beginners ask most and answer each concisely."),
            "general",
        ),
        (
            "Common mistakes",
            format!("List the most common mistakes people make with {topic} and explain how to avoid each one."),
            "how-to",
        ),
        (
            "Real-world examples",
            format!("Give three real-world examples of {topic} being applied to {use_case}, with the outcome of each."),
            "explanatory",
        ),
        (
            "Comparison",
            format!("Compare {topic} with its closest alternatives in a table covering cost, complexity and typical use."),
            "analytical",
        ),
        (
            "Checklist",
            format!("Produce a practical checklist for getting started with {topic} for {use_case}."),
            "how-to",
        ),
        (
            "Future outlook",
            format!("Describe how {topic} is likely to evolve over the next five years and what that means for {use_case}."),
            "analytical",
        ),
    ];

    templates
        .into_iter()
        .take(count)
        .map(|(title, prompt, category)| GeneratedPrompt {
            title: title.to_string(),
            prompt,
            category: category.to_string(),
        })
        .collect()
}
