//! Conversation session: the orchestrator for one full turn cycle
//!
//! The session owns the ordered turn log and keeps its invariant: the
//! persisted log is the single source of truth, and every model call sees
//! only the context slice of its own channel. Input flows in through
//! `submit` (or the trigger channel), gets routed to the weather skill or
//! the chat model, and comes back out through the observer as committed
//! turns and streamed partial replies. Network and skill errors never
//! escape `submit`; they are rendered into the conversation.

pub mod log;
pub mod trigger;
pub mod turn;

pub use log::ConversationLog;
pub use trigger::{PendingTrigger, TriggerAction};
pub use turn::{Channel, Rendered, Role, Turn};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::sync::broadcast;

use crate::config::SidechatConfig;
use crate::config::api_keys;
use crate::config::constants::{prompts, storage_keys};
use crate::llm::{ChatMessage, ChatProvider, ChatRequest, ChatStreamEvent, TransportError, ZhipuProvider};
use crate::skills::translation::TranslationClient;
use crate::skills::weather::{
    self, Classification, IntentClassifier, MojiWeatherClient, WeatherError, WeatherSource,
};
use crate::storage::{KeyValueStore, StoreChange, get_string};

const MISSING_KEY_NOTICE: &str = "API key not set. Run `sidechat key <KEY>` to configure one.";
const CLASSIFICATION_FAILED_MESSAGE: &str =
    "Sorry, the intent analysis failed. Retry later or phrase the query more clearly.";
const BUSY_NOTICE: &str = "A reply is still in progress; the trigger was dropped.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no API credential configured")]
    MissingCredential,
    #[error("a turn is already in flight")]
    Busy,
}

/// View-side collaborator. All methods default to no-ops so a front-end
/// implements only what it renders.
pub trait SessionObserver: Send + Sync {
    /// A turn was committed to the log (also fired for each turn during
    /// history replay)
    fn turn_added(&self, turn: &Turn) {
        let _ = turn;
    }

    /// Accumulated text of the in-progress assistant reply. Replaces what
    /// was delivered before; it is not an increment.
    fn partial_reply(&self, accumulated: &str) {
        let _ = accumulated;
    }

    /// The in-progress reply failed. The message replaces the partial text;
    /// no turn is committed.
    fn reply_failed(&self, message: &str) {
        let _ = message;
    }

    /// Out-of-log system notice (e.g. missing credential)
    fn notice(&self, message: &str) {
        let _ = message;
    }
}

/// Builds a provider from the credential in effect for this call
pub type ProviderFactory = Box<dyn Fn(&str) -> Arc<dyn ChatProvider> + Send + Sync>;

/// Releases the in-flight flag when a turn cycle ends, on every path
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ConversationSession {
    config: SidechatConfig,
    store: Arc<dyn KeyValueStore>,
    observer: Arc<dyn SessionObserver>,
    classifier: IntentClassifier,
    weather_source: Arc<dyn WeatherSource>,
    translator: Arc<TranslationClient>,
    provider_factory: ProviderFactory,
    log: Mutex<ConversationLog>,
    in_flight: AtomicBool,
}

impl ConversationSession {
    pub fn new(
        config: SidechatConfig,
        store: Arc<dyn KeyValueStore>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let classifier = IntentClassifier::new(
            config.chat.model.clone(),
            config.weather.default_city.clone(),
        );
        let weather_source: Arc<dyn WeatherSource> =
            Arc::new(MojiWeatherClient::with_endpoint(config.weather.endpoint.clone()));
        let translator = Arc::new(TranslationClient::from_config(&config.translation));

        let chat_config = config.chat.clone();
        let provider_factory: ProviderFactory = Box::new(move |key| {
            Arc::new(ZhipuProvider::from_config(key.to_string(), &chat_config))
                as Arc<dyn ChatProvider>
        });

        Self {
            config,
            store,
            observer,
            classifier,
            weather_source,
            translator,
            provider_factory,
            log: Mutex::new(ConversationLog::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Replace the provider factory (scripted providers in tests)
    pub fn with_provider_factory(mut self, factory: ProviderFactory) -> Self {
        self.provider_factory = factory;
        self
    }

    /// Replace the forecast source (fakes in tests)
    pub fn with_weather_source(mut self, source: Arc<dyn WeatherSource>) -> Self {
        self.weather_source = source;
        self
    }

    /// Store change notifications, for watching the trigger channel
    pub fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange> {
        self.store.subscribe()
    }

    /// Snapshot of the in-memory log
    pub async fn turns(&self) -> Vec<Turn> {
        self.log.lock().await.turns().to_vec()
    }

    /// Restore the log from storage, replay it to the observer, then
    /// consume any pending trigger left by an external writer.
    pub async fn load_history(&self) {
        let restored = match self.store.get(storage_keys::CONVERSATION_LOG).await {
            Ok(Some(value)) => match serde_json::from_value::<ConversationLog>(value) {
                Ok(log) => log,
                Err(e) => {
                    tracing::warn!("persisted log unreadable, starting empty: {}", e);
                    ConversationLog::new()
                }
            },
            Ok(None) => ConversationLog::new(),
            Err(e) => {
                tracing::warn!("failed to read persisted log: {}", e);
                ConversationLog::new()
            }
        };

        {
            let mut log = self.log.lock().await;
            *log = restored;
            for turn in log.turns() {
                self.observer.turn_added(turn);
            }
        }

        self.consume_pending_trigger().await;
    }

    /// Discard all turns and the persisted log key
    pub async fn clear(&self) {
        self.log.lock().await.clear();
        if let Err(e) = self.store.remove(storage_keys::CONVERSATION_LOG).await {
            tracing::warn!("failed to remove persisted log: {}", e);
        }
    }

    /// Run one full turn cycle. Trimmed-empty input is a no-op. Returns
    /// `Busy` while another cycle is in flight; every other failure is
    /// rendered into the conversation instead of returned.
    pub async fn submit(&self, text: &str) -> Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let _guard = self.acquire_flight()?;
        if weather::contains_weather_keyword(text) {
            self.weather_turn(text).await;
        } else {
            self.chat_turn(text).await;
        }
        Ok(())
    }

    /// Read and clear the pending trigger, then inject it. Called on load
    /// and whenever the store reports a trigger write.
    pub async fn consume_pending_trigger(&self) {
        let pending = match trigger::take_pending(self.store.as_ref()).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!("failed to read pending trigger: {}", e);
                None
            }
        };
        let Some(pending) = pending else {
            return;
        };
        tracing::debug!("consuming pending trigger ({:?})", pending.action);

        match pending.action {
            TriggerAction::Explain => {
                let prompt = format!("{}\"{}\"", prompts::EXPLAIN_PROMPT_PREFIX, pending.text);
                if self.submit(&prompt).await.is_err() {
                    self.observer.notice(BUSY_NOTICE);
                }
            }
            TriggerAction::Translate => self.translate_turn(&pending.text).await,
        }
    }

    fn acquire_flight(&self) -> Result<FlightGuard<'_>, SessionError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SessionError::Busy)?;
        Ok(FlightGuard(&self.in_flight))
    }

    /// Credential lookup, store value first, config value last
    async fn resolve_credential(&self) -> Result<String, SessionError> {
        let stored = match get_string(self.store.as_ref(), storage_keys::API_KEY).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("failed to read stored credential: {}", e);
                None
            }
        };
        api_keys::resolve_api_key(stored.as_deref(), self.config.chat.api_key.as_deref())
            .ok_or(SessionError::MissingCredential)
    }

    async fn chat_turn(&self, text: &str) {
        self.append_and_persist(Turn::user(text, Channel::Chat)).await;

        let provider = match self.resolve_credential().await {
            Ok(key) => (self.provider_factory)(&key),
            Err(_) => {
                self.observer.notice(MISSING_KEY_NOTICE);
                return;
            }
        };

        let messages = if self.config.chat.multi_turn {
            self.log.lock().await.chat_context()
        } else {
            vec![ChatMessage::user(text)]
        };
        let mut request = ChatRequest::new(self.config.chat.model.clone(), messages);
        request.stream = self.config.chat.streaming;

        let reply = if self.config.chat.streaming {
            self.stream_reply(provider.as_ref(), request).await
        } else {
            provider.generate(request).await.map(|response| response.content)
        };

        match reply {
            Ok(content) => {
                self.append_and_persist(Turn::assistant_text(content, Channel::Chat))
                    .await;
            }
            Err(e) => {
                // Nothing is persisted for the failed reply; the user turn
                // stays as a dangling question and a resubmit retries it
                self.observer.reply_failed(&format!("Error: {}", e));
            }
        }
    }

    async fn stream_reply(
        &self,
        provider: &dyn ChatProvider,
        request: ChatRequest,
    ) -> Result<String, TransportError> {
        let mut stream = provider.stream(request).await?;
        let mut accumulated = String::new();
        let mut finished = None;

        while let Some(event) = stream.next().await {
            match event? {
                ChatStreamEvent::Token { delta } => {
                    accumulated.push_str(&delta);
                    self.observer.partial_reply(&accumulated);
                }
                ChatStreamEvent::Completed { response } => {
                    finished = Some(response.content);
                }
            }
        }
        Ok(finished.unwrap_or(accumulated))
    }

    async fn weather_turn(&self, text: &str) {
        // History is captured before the current turn lands so the
        // classifier sees it as prior context only
        let history = self.log.lock().await.weather_context();
        self.append_and_persist(Turn::user(text, Channel::Weather)).await;

        let provider = match self.resolve_credential().await {
            Ok(key) => Some((self.provider_factory)(&key)),
            Err(_) => None,
        };

        let classification = self
            .classifier
            .classify(provider.as_deref(), text, &history)
            .await;

        match classification {
            Classification::Intent(intent) => {
                match weather::lookup(self.weather_source.as_ref(), &intent).await {
                    Ok(summary) => {
                        self.append_and_persist(Turn::assistant_card(summary)).await;
                    }
                    Err(WeatherError::NotFound { place }) => {
                        let message = format!(
                            "Sorry, no forecast was found for {}. Check the place name and try again.",
                            place
                        );
                        self.append_and_persist(Turn::assistant_text(message, Channel::Weather))
                            .await;
                    }
                    Err(e) => {
                        let message = format!("Failed to fetch the forecast: {}", e);
                        self.append_and_persist(Turn::assistant_text(message, Channel::Weather))
                            .await;
                    }
                }
            }
            Classification::Failed | Classification::NotWeather => {
                // NotWeather cannot normally happen past the pre-filter;
                // treat a classifier disagreement the same as a failure
                self.append_and_persist(Turn::system(
                    CLASSIFICATION_FAILED_MESSAGE,
                    Channel::Weather,
                ))
                .await;
            }
        }
    }

    async fn translate_turn(&self, text: &str) {
        let Ok(_guard) = self.acquire_flight() else {
            self.observer.notice(BUSY_NOTICE);
            return;
        };

        self.append_and_persist(Turn::user(text, Channel::Chat)).await;
        match self.translator.translate(text).await {
            Ok(translated) => {
                self.append_and_persist(Turn::assistant_text(translated, Channel::Chat))
                    .await;
            }
            Err(e) => {
                self.observer.reply_failed(&format!("Error: {}", e));
            }
        }
    }

    /// Append a turn, notify the observer, and persist the whole log.
    /// Persistence is best-effort: failures are logged, never surfaced.
    async fn append_and_persist(&self, turn: Turn) {
        let snapshot = {
            let mut log = self.log.lock().await;
            log.push(turn.clone());
            serde_json::to_value(&*log)
        };
        self.observer.turn_added(&turn);

        match snapshot {
            Ok(value) => {
                if let Err(e) = self.store.set(storage_keys::CONVERSATION_LOG, value).await {
                    tracing::warn!("failed to persist conversation log: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!("failed to serialize conversation log: {}", e);
            }
        }
    }
}
