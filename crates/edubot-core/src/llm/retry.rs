//! Bounded retry around a generative model
//!
//! The upstream service does not expose a typed error taxonomy, so
//! transient failures are recognised from the error text. That inspection
//! lives in [`classify_failure`] and nowhere else.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use crate::config::RetryConfig;
use crate::error::{Error, Result};

use super::client::{GenerativeModel, MediaInput};

/// Substrings that mark an upstream failure as worth retrying
const TRANSIENT_MARKERS: [&str; 5] = ["503", "overloaded", "unavailable", "timeout", "timed out"];

/// Whether a failed call may succeed if repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Fatal,
}

/// Classify a model failure as transient or fatal
///
/// Heuristic: an error is transient when its description (including its
/// source chain) mentions overload, unavailability or a timeout.
pub fn classify_failure(err: &Error) -> FailureClass {
    match err {
        Error::GenerativeFatal(_) | Error::ConfigError(_) | Error::InvalidInput(_) => {
            FailureClass::Fatal
        }
        Error::GenerativeTransient { .. } | Error::GenerativeTimeout(_) => FailureClass::Transient,
        Error::NetworkError(e) if e.is_timeout() || e.is_connect() => FailureClass::Transient,
        other => {
            let description = describe(other).to_lowercase();
            if TRANSIENT_MARKERS
                .iter()
                .any(|marker| description.contains(marker))
            {
                FailureClass::Transient
            } else {
                FailureClass::Fatal
            }
        }
    }
}

fn describe(err: &Error) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}

/// Backoff schedule for one `ask` call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_jitter: Duration,
    pub total_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            multiplier: config.multiplier.max(1.0),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_jitter: Duration::from_millis(config.max_jitter_ms),
            total_timeout: Duration::from_secs(config.total_timeout_secs),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (0-based), without jitter, capped
    pub fn base_delay(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry as i32);
        let scaled = self.initial_delay.as_secs_f64() * factor;
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// Wait before retry number `retry` with the given jitter (clamped to `max_jitter`)
    pub fn delay_for(&self, retry: u32, jitter: Duration) -> Duration {
        self.base_delay(retry) + jitter.min(self.max_jitter)
    }

    fn random_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// Generative model wrapped with retry, backoff and an overall deadline
///
/// Every `ask` call gets its own attempt budget and timer; nothing is shared
/// between concurrent calls.
#[derive(Clone)]
pub struct GenerativeFallbackClient {
    model: Arc<dyn GenerativeModel>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for GenerativeFallbackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeFallbackClient")
            .field("model", &self.model.model_name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl GenerativeFallbackClient {
    pub fn new(model: Arc<dyn GenerativeModel>, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn model(&self) -> &Arc<dyn GenerativeModel> {
        &self.model
    }

    /// Ask the model, retrying transient failures
    ///
    /// Fails with `GenerativeFatal` on the first non-transient error,
    /// `GenerativeTransient` once the attempt budget is spent, and
    /// `GenerativeTimeout` when the overall deadline passes first.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        self.ask_inner(prompt, None).await
    }

    /// [`ask`](Self::ask) with an image or audio attachment
    pub async fn ask_with_media(&self, prompt: &str, media: &MediaInput) -> Result<String> {
        self.ask_inner(prompt, Some(media)).await
    }

    async fn ask_inner(&self, prompt: &str, media: Option<&MediaInput>) -> Result<String> {
        let deadline = self.policy.total_timeout;
        match timeout(deadline, self.run_attempts(prompt, media)).await {
            Ok(result) => result,
            Err(_) => {
                error!(timeout_secs = deadline.as_secs(), "Generative call timed out");
                Err(Error::GenerativeTimeout(deadline.as_secs()))
            }
        }
    }

    /// Like [`ask`](Self::ask) but logs and swallows the failure
    pub async fn ask_optional(&self, prompt: &str) -> Option<String> {
        match self.ask(prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(code = e.code(), error = %e, "Generative fallback produced no answer");
                None
            }
        }
    }

    async fn run_attempts(&self, prompt: &str, media: Option<&MediaInput>) -> Result<String> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, model = self.model.model_name(), "Calling generative model");

            let outcome = match media {
                Some(media) => self.model.generate_with_media(prompt, media).await,
                None => self.model.generate(prompt).await,
            };
            let err = match outcome {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            match classify_failure(&err) {
                FailureClass::Fatal => {
                    error!(attempt = attempts, error = %err, "Non-transient generative error");
                    return Err(match err {
                        Error::GenerativeFatal(msg) => Error::GenerativeFatal(msg),
                        other => Error::GenerativeFatal(other.to_string()),
                    });
                }
                FailureClass::Transient if attempts < self.policy.max_attempts => {
                    let wait = self
                        .policy
                        .delay_for(attempts - 1, self.policy.random_jitter());
                    warn!(
                        attempt = attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "Transient generative error, retrying after backoff"
                    );
                    sleep(wait).await;
                }
                FailureClass::Transient => {
                    error!(attempts = attempts, error = %err, "Generative retries exhausted");
                    return Err(Error::GenerativeTransient {
                        attempts,
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Model that replays a script of results and records call times
    struct ScriptedModel {
        script: Mutex<Vec<Result<String>>>,
        fallback: fn() -> Result<String>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedModel {
        fn always(fallback: fn() -> Result<String>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(Vec::new()),
                fallback,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn scripted(mut script: Vec<Result<String>>, fallback: fn() -> Result<String>) -> Arc<Self> {
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
                fallback,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.lock().unwrap().push(Instant::now());
            let next = self.script.lock().unwrap().pop();
            next.unwrap_or_else(|| (self.fallback)())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn overloaded() -> Result<String> {
        Err(Error::LlmError("Server error (503 Service Unavailable): model overloaded".to_string()))
    }

    fn bad_request() -> Result<String> {
        Err(Error::LlmError("Bad request: invalid argument".to_string()))
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(classify_failure(&overloaded().unwrap_err()), FailureClass::Transient);
        assert_eq!(
            classify_failure(&Error::LlmError("The service is UNAVAILABLE".to_string())),
            FailureClass::Transient
        );
        assert_eq!(
            classify_failure(&Error::Other("request timed out".to_string())),
            FailureClass::Transient
        );
        assert_eq!(classify_failure(&bad_request().unwrap_err()), FailureClass::Fatal);
        assert_eq!(
            classify_failure(&Error::GenerativeFatal("unavailable".to_string())),
            FailureClass::Fatal
        );
    }

    #[test]
    fn test_base_delays_grow_to_cap() {
        let policy = RetryPolicy::default();
        let delays: Vec<Duration> = (0..8).map(|i| policy.base_delay(i)).collect();

        assert_eq!(delays[0], Duration::from_secs(1));
        assert_eq!(delays[1], Duration::from_millis(1500));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*delays.last().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_delay_for_clamps_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(0, Duration::from_millis(200)),
            Duration::from_millis(1200)
        );
        assert_eq!(
            policy.delay_for(10, Duration::from_secs(3)),
            Duration::from_millis(5500)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_exhaust_attempts() {
        let model = ScriptedModel::always(overloaded);
        let client = GenerativeFallbackClient::new(model.clone(), RetryPolicy::default());

        let result = client.ask("prompt").await;
        match result {
            Err(Error::GenerativeTransient { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhausted retries, got {:?}", other),
        }

        let calls = model.call_times();
        assert_eq!(calls.len(), 3);

        let policy = client.policy();
        let waits: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
        for (retry, wait) in waits.iter().enumerate() {
            let base = policy.base_delay(retry as u32);
            assert!(*wait >= base, "wait {:?} below base {:?}", wait, base);
            assert!(
                *wait <= base + policy.max_jitter + Duration::from_millis(5),
                "wait {:?} above cap",
                wait
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let model = ScriptedModel::always(bad_request);
        let client = GenerativeFallbackClient::new(model.clone(), RetryPolicy::default());

        let result = client.ask("prompt").await;
        assert!(matches!(result, Err(Error::GenerativeFatal(_))));
        assert_eq!(model.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_error() {
        let model = ScriptedModel::scripted(
            vec![overloaded(), Ok("الإجابة".to_string())],
            bad_request,
        );
        let client = GenerativeFallbackClient::new(model.clone(), RetryPolicy::default());

        assert_eq!(client.ask("prompt").await.unwrap(), "الإجابة");
        assert_eq!(model.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_supersedes_attempt_budget() {
        let model = ScriptedModel::always(overloaded);
        let policy = RetryPolicy {
            max_attempts: 10,
            total_timeout: Duration::from_secs(2),
            ..RetryPolicy::default()
        };
        let client = GenerativeFallbackClient::new(model.clone(), policy);

        let result = client.ask("prompt").await;
        assert!(matches!(result, Err(Error::GenerativeTimeout(2))));
        assert!(model.call_times().len() < 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ask_optional_swallows_errors() {
        let client =
            GenerativeFallbackClient::new(ScriptedModel::always(bad_request), RetryPolicy::default());
        assert!(client.ask_optional("prompt").await.is_none());
    }
}
