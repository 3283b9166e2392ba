use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::cache::{CacheStats, ResponseCache};
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::{AssistError, Result};
use crate::fallback::{FallbackStrategy, HeuristicFallback};
use crate::gateway::LlmGateway;
use crate::generator::{GeneratedPrompt, PromptGenerator};
use crate::request::{
    AssistRequest, DocumentAnalysis, HandwritingAction, QuizOptions, ToneStyle, TutorOptions,
};
use crate::response::Response;
use crate::transport::{GroqTransport, Transport};

/// Entry point for every assist mode: cache, debounce, provider, fallback.
pub struct AssistService {
    cache: Arc<ResponseCache>,
    debouncer: Arc<Debouncer<Response>>,
    gateway: Option<Arc<LlmGateway>>,
    fallback: Arc<dyn FallbackStrategy>,
    generator: PromptGenerator,
    sweep_interval: Duration,
}

impl AssistService {
    /// Build the service from configuration. A missing or placeholder key is
    /// not an error; every request is then answered by the fallback.
    pub fn new(cfg: &Config) -> Self {
        let transport = match GroqTransport::new(cfg) {
            Ok(transport) => Some(Arc::new(transport) as Arc<dyn Transport>),
            Err(AssistError::ConfigurationMissing) => {
                tracing::warn!("GROQ_API_KEY not configured - responses will be synthesized offline");
                None
            }
            Err(e) => {
                tracing::error!("Failed to create Groq transport: {} - using offline fallback", e);
                None
            }
        };
        Self::with_parts(cfg, transport, Arc::new(HeuristicFallback::new()))
    }

    /// Assemble the service around an explicit transport and fallback.
    pub fn with_parts(
        cfg: &Config,
        transport: Option<Arc<dyn Transport>>,
        fallback: Arc<dyn FallbackStrategy>,
    ) -> Self {
        let gateway = transport
            .as_ref()
            .map(|tx| Arc::new(LlmGateway::new(Arc::clone(tx), cfg.groq.model.clone())));
        let generator = PromptGenerator::new(
            transport.map(|tx| LlmGateway::new(tx, cfg.groq.generator_model.clone())),
        );

        tracing::info!(
            online = gateway.is_some(),
            model = %cfg.groq.model,
            cache_ttl_secs = cfg.cache_ttl().as_secs(),
            debounce_ms = cfg.debounce_delay().as_millis() as u64,
            "Assist service initialized"
        );

        Self {
            cache: Arc::new(ResponseCache::new(cfg.cache_ttl())),
            debouncer: Arc::new(Debouncer::new(cfg.debounce_delay())),
            gateway,
            fallback,
            generator,
            sweep_interval: cfg.sweep_interval(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.gateway.is_some()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Periodically evict expired cache entries in the background.
    pub fn spawn_cache_sweeper(&self) -> JoinHandle<()> {
        self.cache.spawn_sweeper(self.sweep_interval)
    }

    /// Serve `request` from cache, or schedule it behind the debouncer.
    ///
    /// The only error is [`AssistError::Superseded`]; provider failures are
    /// absorbed by the fallback.
    pub async fn execute(&self, request: AssistRequest) -> Result<Response> {
        let key = request.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let cache = Arc::clone(&self.cache);
        let gateway = self.gateway.clone();
        let fallback = Arc::clone(&self.fallback);
        let task_key = key.clone();

        self.debouncer
            .schedule(key, move || {
                async move { resolve(request, task_key, cache, gateway, fallback).await }.boxed()
            })
            .await
    }

    pub async fn analyze_prompt(&self, prompt: &str) -> Result<Response> {
        self.execute(AssistRequest::analyze(prompt)).await
    }

    pub async fn enhance_prompt(&self, prompt: &str, tone: Option<ToneStyle>) -> Result<Response> {
        self.execute(AssistRequest::enhance(prompt, tone.unwrap_or_default()))
            .await
    }

    pub async fn process_handwriting(
        &self,
        text: &str,
        action: HandwritingAction,
    ) -> Result<Response> {
        self.execute(AssistRequest::handwriting(text, action)).await
    }

    pub async fn analyze_document(
        &self,
        text: &str,
        analysis: DocumentAnalysis,
    ) -> Result<Response> {
        self.execute(AssistRequest::document(text, analysis)).await
    }

    pub async fn process_educational_chat(
        &self,
        message: &str,
        options: TutorOptions,
    ) -> Result<Response> {
        self.execute(AssistRequest::educational_chat(message, options))
            .await
    }

    /// Quiz about `topic`. The question count is clamped to
    /// [`MAX_QUESTION_COUNT`](crate::request::MAX_QUESTION_COUNT) (20), so
    /// larger requests get 20 questions and 0 gets one.
    pub async fn generate_quiz(&self, topic: &str, options: QuizOptions) -> Result<Response> {
        self.execute(AssistRequest::quiz(topic, options)).await
    }

    /// Prompt ideas for `topic`; never cached or debounced.
    pub async fn generate_prompts(
        &self,
        topic: &str,
        use_case: &str,
        max_results: Option<usize>,
    ) -> Vec<GeneratedPrompt> {
        self.generator.generate(topic, use_case, max_results).await
    }
}

async fn resolve(
    request: AssistRequest,
    key: String,
    cache: Arc<ResponseCache>,
    gateway: Option<Arc<LlmGateway>>,
    fallback: Arc<dyn FallbackStrategy>,
) -> Result<Response> {
    let mode = request.mode();

    let Some(gateway) = gateway else {
        tracing::warn!(mode = %mode, "No provider configured, using fallback response");
        let response = fallback.synthesize(&request);
        cache.put(key, response.clone());
        return Ok(response);
    };

    match gateway.run(&request).await {
        Ok(response) => {
            cache.put(key, response.clone());
            Ok(response)
        }
        Err(e) if e.is_recoverable() => {
            tracing::warn!(mode = %mode, error = %e, "Provider call failed, using fallback response");
            Ok(fallback.synthesize(&request))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PLACEHOLDER_API_KEY;
    use crate::models::GroqResponse;
    use crate::request::{MAX_QUESTION_COUNT, Mode};
    use crate::transport::MockTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts syntheses and delegates to the heuristics
    #[derive(Default)]
    struct CountingFallback {
        calls: AtomicUsize,
    }

    impl FallbackStrategy for CountingFallback {
        fn synthesize(&self, request: &AssistRequest) -> Response {
            self.calls.fetch_add(1, Ordering::SeqCst);
            HeuristicFallback.synthesize(request)
        }
    }

    fn test_config() -> Config {
        let mut cfg = Config::default();
        cfg.groq.api_key = PLACEHOLDER_API_KEY.to_string();
        cfg.debounce.delay_ms = 300;
        cfg
    }

    fn online(mock: MockTransport, fallback: Arc<CountingFallback>) -> AssistService {
        AssistService::with_parts(
            &test_config(),
            Some(Arc::new(mock) as Arc<dyn Transport>),
            fallback,
        )
    }

    const ANALYSIS_JSON: &str = r#"{"score": 72, "strengths": ["clear goal"], "weaknesses": ["no audience"], "suggestions": ["name the audience"]}"#;

    #[tokio::test(start_paused = true)]
    async fn test_second_identical_call_hits_cache() {
        let mut mock = MockTransport::new();
        mock.expect_chat()
            .times(1)
            .returning(|_| Ok(GroqResponse::from_content(ANALYSIS_JSON)));
        let fallback = Arc::new(CountingFallback::default());
        let service = online(mock, Arc::clone(&fallback));

        let first = service.analyze_prompt("Write a haiku").await.unwrap();
        let second = service.analyze_prompt("Write a haiku").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.analysis_result().unwrap().score, 72);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
        let stats = service.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_falls_back_without_caching() {
        let mut mock = MockTransport::new();
        mock.expect_chat()
            .times(2)
            .returning(|_| Err(AssistError::Transport("timed out (after 3 attempts)".to_string())));
        let fallback = Arc::new(CountingFallback::default());
        let service = online(mock, Arc::clone(&fallback));

        for _ in 0..2 {
            let response = service
                .enhance_prompt("Explain machine learning", Some(ToneStyle::Technical))
                .await
                .unwrap();
            assert!(response.satisfies_shape(Mode::Enhance));
        }
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.cache_stats().size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_json_falls_back() {
        let mut mock = MockTransport::new();
        mock.expect_chat()
            .times(1)
            .returning(|_| Ok(GroqResponse::from_content("Looks good to me!")));
        let fallback = Arc::new(CountingFallback::default());
        let service = online(mock, Arc::clone(&fallback));

        let response = service.generate_quiz("fractions", QuizOptions::default()).await.unwrap();
        assert_eq!(response.questions().unwrap().len(), 5);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_credentials_fallback_is_cached() {
        let fallback = Arc::new(CountingFallback::default());
        let service = AssistService::with_parts(&test_config(), None, fallback.clone());
        assert!(!service.is_online());

        let question = DocumentAnalysis::QAndA {
            question: "What is this about?".to_string(),
        };
        let first = service.analyze_document("short doc", question.clone()).await.unwrap();
        let second = service.analyze_document("short doc", question).await.unwrap();

        assert!(first.processed_text().unwrap().contains("What is this about?"));
        assert_eq!(first, second);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_placeholder_key_builds_offline_service() {
        let service = AssistService::new(&test_config());
        assert!(!service.is_online());

        let response = service
            .process_handwriting("i dont know", HandwritingAction::Grammar)
            .await
            .unwrap();
        assert_eq!(response.processed_text(), Some("I don't know."));

        let chat = service
            .process_educational_chat("What is gravity?", TutorOptions::default())
            .await
            .unwrap();
        assert!(chat.satisfies_shape(Mode::EducationalChat));

        let prompts = service.generate_prompts("chess", "", None).await;
        assert_eq!(prompts.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiz_count_is_capped() {
        let service = AssistService::new(&test_config());
        for (requested, expected) in [(0, 1), (7, 7), (20, 20), (50, MAX_QUESTION_COUNT)] {
            let options = QuizOptions {
                question_count: requested,
                ..QuizOptions::default()
            };
            let response = service.generate_quiz("geometry", options).await.unwrap();
            assert_eq!(response.questions().unwrap().len(), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_identical_calls_reach_provider_once() {
        let mut mock = MockTransport::new();
        mock.expect_chat()
            .times(1)
            .returning(|_| Ok(GroqResponse::from_content("A much better prompt.")));
        let service = Arc::new(online(mock, Arc::new(CountingFallback::default())));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.enhance_prompt("make it better", None).await
            }));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let mut superseded = 0;
        let mut answered = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(response) => answered.push(response),
                Err(AssistError::Superseded) => superseded += 1,
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert_eq!(superseded, 2);
        assert_eq!(answered.len(), 1);
        assert_eq!(answered[0].enhanced_prompt(), Some("A much better prompt."));
    }
}
