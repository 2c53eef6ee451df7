//! Vision-model OCR engine: the production [`OcrEngine`].
//!
//! A session resolves the provider once, then sends each page PNG with the
//! language-bound transcription prompt from [`crate::prompts`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from vision APIs are transient. Exponential backoff
//! (`retry_backoff_ms * 2^attempt`) with the 500 ms default gives
//! 500 ms → 1 s → 2 s over three retries. A single delay never exceeds
//! [`MAX_BACKOFF_MS`]. Each attempt is bounded by `recognition_timeout_secs`.

use crate::config::MonitorConfig;
use crate::error::DocumentError;
use crate::pipeline::encode;
use crate::pipeline::ocr::{OcrEngine, OcrSession};
use crate::pipeline::render::PageImage;
use crate::prompts::transcription_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Default model when a provider is named without one.
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Longest sleep between two recognition attempts.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// [`OcrEngine`] that transcribes pages with a vision language model.
#[derive(Clone)]
pub struct VisionOcrEngine {
    config: MonitorConfig,
}

impl VisionOcrEngine {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl OcrEngine for VisionOcrEngine {
    fn language(&self) -> &str {
        &self.config.language
    }

    async fn start(&self) -> Result<Box<dyn OcrSession>, DocumentError> {
        let provider = resolve_provider(&self.config)?;
        debug!("Vision OCR provider ready for {}", self.config.language);
        Ok(Box::new(VisionSession {
            provider: Some(provider),
            system_prompt: transcription_prompt(&self.config.language),
            options: build_options(&self.config),
            max_retries: self.config.max_retries,
            retry_backoff_ms: self.config.retry_backoff_ms,
            timeout_secs: self.config.recognition_timeout_secs,
        }))
    }
}

struct VisionSession {
    /// `None` once terminated.
    provider: Option<Arc<dyn LLMProvider>>,
    system_prompt: String,
    options: CompletionOptions,
    max_retries: u32,
    retry_backoff_ms: u64,
    timeout_secs: u64,
}

#[async_trait]
impl OcrSession for VisionSession {
    async fn recognize(&mut self, page: &PageImage) -> Result<String, DocumentError> {
        let page_num = page.page_num;
        let provider = self
            .provider
            .clone()
            .ok_or_else(|| DocumentError::RecognitionFailed {
                page: page_num,
                detail: "engine already terminated".into(),
            })?;

        let image = encode::encode_page_file(&page.path).await?;
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images("", vec![image]),
        ];

        let start = Instant::now();
        let mut last_err: Option<DocumentError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Page {}: retry {}/{} after {}ms",
                    page_num, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let call = provider.chat(&messages, Some(&self.options));
            match timeout(Duration::from_secs(self.timeout_secs), call).await {
                Ok(Ok(response)) => {
                    debug!(
                        "Page {}: {} input tokens, {} output tokens, {:?}",
                        page_num,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, e);
                    last_err = Some(DocumentError::RecognitionFailed {
                        page: page_num,
                        detail: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(
                        "Page {}: attempt {} timed out after {}s",
                        page_num,
                        attempt + 1,
                        self.timeout_secs
                    );
                    last_err = Some(DocumentError::RecognitionTimeout {
                        page: page_num,
                        secs: self.timeout_secs,
                    });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| DocumentError::RecognitionFailed {
            page: page_num,
            detail: "Unknown error".into(),
        }))
    }

    async fn terminate(&mut self) {
        if self.provider.take().is_some() {
            debug!("Vision OCR provider released");
        }
    }
}

/// Build `CompletionOptions` from the monitor config.
fn build_options(config: &MonitorConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, DocumentError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DocumentError::EngineStartFailed(format!("provider '{provider_name}': {e}"))
    })
}

/// Resolve the vision provider, from most-specific to least-specific:
///
/// 1. Pre-built provider (`config.provider`)
/// 2. Named provider + model (`config.provider_name`)
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is set
/// 5. Full auto-detection (`ProviderFactory::from_env`)
fn resolve_provider(config: &MonitorConfig) -> Result<Arc<dyn LLMProvider>, DocumentError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) = ProviderFactory::from_env().map_err(|e| {
        DocumentError::EngineStartFailed(format!(
            "no vision provider could be auto-detected from environment \
             (set OPENAI_API_KEY, ANTHROPIC_API_KEY, or --provider): {e}"
        ))
    })?;

    Ok(llm_provider)
}

/// Delay before retry number `attempt` (1-based).
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_delay_ms(500, 1), 500);
        assert_eq!(backoff_delay_ms(500, 2), 1000);
        assert_eq!(backoff_delay_ms(500, 3), 2000);
        assert_eq!(backoff_delay_ms(500, 40), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(u64::MAX, 64), MAX_BACKOFF_MS);
    }

    #[test]
    fn build_options_defaults() {
        let config = MonitorConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn engine_reports_configured_language() {
        let config = MonitorConfig::builder().language("jpn_vert").build().unwrap();
        assert_eq!(VisionOcrEngine::new(&config).language(), "jpn_vert");
    }
}
