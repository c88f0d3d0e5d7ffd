//! Session turn-cycle integration tests, driven through scripted fakes

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use common::{
    FakeWeatherSource, INTENT_BEIJING_TODAY, INTENT_BEIJING_TOMORROW, RecordingObserver,
    ScriptedProvider, StreamScript, ViewEvent, forecast_series,
};
use sidechat_core::config::SidechatConfig;
use sidechat_core::config::constants::storage_keys;
use sidechat_core::llm::{
    ChatProvider, ChatRequest, ChatResponse, ChatStream, ChatStreamEvent, MessageRole,
    TransportError,
};
use sidechat_core::session::{Channel, ConversationSession, Rendered, Role, SessionError};
use sidechat_core::storage::{KeyValueStore, MemoryStore};

struct Harness {
    session: Arc<ConversationSession>,
    provider: Arc<ScriptedProvider>,
    weather: Arc<FakeWeatherSource>,
    observer: Arc<RecordingObserver>,
    store: Arc<MemoryStore>,
}

async fn harness_with(config: SidechatConfig, weather: Arc<FakeWeatherSource>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    store
        .set(storage_keys::API_KEY, json!("test-key"))
        .await
        .expect("seed credential");
    harness_on_store(config, weather, store).await
}

async fn harness_on_store(
    config: SidechatConfig,
    weather: Arc<FakeWeatherSource>,
    store: Arc<MemoryStore>,
) -> Harness {
    let provider = ScriptedProvider::new();
    let observer = RecordingObserver::new();
    let factory_provider = provider.clone();
    let session = ConversationSession::new(config, store.clone(), observer.clone())
        .with_provider_factory(Box::new(move |_key| {
            factory_provider.clone() as Arc<dyn ChatProvider>
        }))
        .with_weather_source(weather.clone());

    Harness {
        session: Arc::new(session),
        provider,
        weather,
        observer,
        store,
    }
}

async fn harness() -> Harness {
    harness_with(SidechatConfig::default(), FakeWeatherSource::empty()).await
}

#[tokio::test]
async fn empty_and_whitespace_submits_are_noops() {
    let h = harness().await;

    h.session.submit("").await.expect("submit");
    h.session.submit("   \n\t ").await.expect("submit");

    assert!(h.session.turns().await.is_empty());
    assert!(h.provider.requests().is_empty());
    assert!(h.observer.events().is_empty());
    assert_eq!(
        h.store
            .get(storage_keys::CONVERSATION_LOG)
            .await
            .expect("store"),
        None
    );
}

#[tokio::test]
async fn chat_turn_streams_accumulated_text_and_persists() {
    let h = harness().await;
    h.provider
        .push_stream(StreamScript::Deltas(vec!["Hel", "lo ", "there"]));

    h.session.submit("hi").await.expect("submit");

    assert_eq!(
        h.observer.partials(),
        vec!["Hel".to_string(), "Hello ".to_string(), "Hello there".to_string()]
    );

    let turns = h.session.turns().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].channel, Channel::Chat);
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, Rendered::Text("Hello there".to_string()));

    let persisted = h
        .store
        .get(storage_keys::CONVERSATION_LOG)
        .await
        .expect("store")
        .expect("log persisted");
    assert_eq!(persisted.as_array().map(|a| a.len()), Some(2));
}

#[tokio::test]
async fn weather_then_chat_keeps_context_slices_apart() {
    let h = harness_with(
        SidechatConfig::default(),
        FakeWeatherSource::with_place("北京", forecast_series()),
    )
    .await;

    h.provider.push_generate(Ok(INTENT_BEIJING_TODAY));
    h.session
        .submit("Beijing weather today")
        .await
        .expect("submit weather");

    let turns = h.session.turns().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].channel, Channel::Weather);
    assert_eq!(turns[1].channel, Channel::Weather);
    assert!(matches!(turns[1].content, Rendered::WeatherCard(_)));

    h.provider.push_stream(StreamScript::Deltas(vec!["hi!"]));
    h.session.submit("hello").await.expect("submit chat");

    // The chat call must see only the chat-channel slice
    let requests = h.provider.requests();
    let chat_request = requests.last().expect("chat request");
    assert_eq!(chat_request.messages.len(), 1);
    assert_eq!(chat_request.messages[0].role, MessageRole::User);
    assert_eq!(chat_request.messages[0].content, "hello");

    let turns = h.session.turns().await;
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[2].channel, Channel::Chat);
    assert_eq!(turns[3].channel, Channel::Chat);
}

#[tokio::test]
async fn followup_classification_sees_weather_history() {
    let h = harness_with(
        SidechatConfig::default(),
        FakeWeatherSource::with_place("北京", forecast_series()),
    )
    .await;

    h.provider.push_generate(Ok(INTENT_BEIJING_TODAY));
    h.session.submit("北京天气").await.expect("submit");

    h.provider.push_generate(Ok(INTENT_BEIJING_TOMORROW));
    h.session.submit("明天天气呢").await.expect("submit");

    let requests = h.provider.requests();
    assert_eq!(requests.len(), 2);
    let followup_prompt = &requests[1].messages[0];
    assert_eq!(followup_prompt.role, MessageRole::System);
    assert!(
        followup_prompt.content.contains("北京天气"),
        "classifier context should carry the earlier weather turn"
    );

    // Both lookups hit the same city thanks to the scripted carry-over
    let calls = h.weather.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, place)| place == "北京"));
}

#[tokio::test]
async fn transport_failure_keeps_only_the_user_turn() {
    let h = harness().await;
    h.provider
        .push_stream(StreamScript::FailAfter(vec!["par", "tial"]));

    h.session.submit("doomed question").await.expect("submit");

    let turns = h.session.turns().await;
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::User);

    let events = h.observer.events();
    assert!(matches!(events.last(), Some(ViewEvent::Failed(message)) if message.contains("connection reset")));

    // The dangling user turn is persisted; the failed reply is not
    let persisted = h
        .store
        .get(storage_keys::CONVERSATION_LOG)
        .await
        .expect("store")
        .expect("log persisted");
    assert_eq!(persisted.as_array().map(|a| a.len()), Some(1));
}

#[tokio::test]
async fn missing_credential_renders_notice_without_network() {
    // Store without a seeded api_key
    let h = harness_on_store(
        SidechatConfig::default(),
        FakeWeatherSource::empty(),
        Arc::new(MemoryStore::new()),
    )
    .await;

    h.session.submit("hello").await.expect("submit");

    assert!(h.provider.requests().is_empty());
    let events = h.observer.events();
    assert!(matches!(events.last(), Some(ViewEvent::Notice(_))));

    // The user turn is still visible and persisted
    assert_eq!(h.session.turns().await.len(), 1);
}

#[tokio::test]
async fn missing_credential_weather_uses_offline_matcher() {
    let h = harness_on_store(
        SidechatConfig::default(),
        FakeWeatherSource::with_place("深圳", forecast_series()),
        Arc::new(MemoryStore::new()),
    )
    .await;

    h.session.submit("深圳明天天气").await.expect("submit");

    // No model call happened, yet the lookup resolved through the table
    assert!(h.provider.requests().is_empty());
    let calls = h.weather.calls();
    assert_eq!(calls, vec![("广东".to_string(), "深圳".to_string())]);

    let turns = h.session.turns().await;
    assert!(matches!(turns.last().map(|t| &t.content), Some(Rendered::WeatherCard(_))));
}

#[tokio::test]
async fn classification_failure_is_a_distinct_system_turn() {
    let h = harness_with(
        SidechatConfig::default(),
        FakeWeatherSource::with_place("北京", forecast_series()),
    )
    .await;
    h.provider
        .push_generate(Ok("I could not determine the location."));

    h.session.submit("天气如何呢").await.expect("submit");

    let turns = h.session.turns().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role, Role::System);
    assert_eq!(turns[1].channel, Channel::Weather);
    assert!(turns[1].content.as_text().contains("intent analysis failed"));

    // A failed classification must not fall through to a lookup
    assert!(h.weather.calls().is_empty());
}

#[tokio::test]
async fn lookup_miss_renders_apology_as_assistant_turn() {
    let h = harness_with(SidechatConfig::default(), FakeWeatherSource::empty()).await;
    h.provider.push_generate(Ok(INTENT_BEIJING_TODAY));

    h.session.submit("北京天气").await.expect("submit");

    let turns = h.session.turns().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role, Role::Assistant);
    assert!(turns[1].content.as_text().contains("no forecast was found"));
}

#[tokio::test]
async fn non_streaming_mode_commits_whole_reply() {
    let mut config = SidechatConfig::default();
    config.chat.streaming = false;

    let h = harness_with(config, FakeWeatherSource::empty()).await;
    h.provider.push_generate(Ok("the whole answer at once"));

    h.session.submit("hi").await.expect("submit");

    assert!(h.observer.partials().is_empty());
    let turns = h.session.turns().await;
    assert_eq!(
        turns[1].content,
        Rendered::Text("the whole answer at once".to_string())
    );
}

#[tokio::test]
async fn single_turn_mode_sends_only_current_message() {
    let mut config = SidechatConfig::default();
    config.chat.multi_turn = false;

    let h = harness_with(config, FakeWeatherSource::empty()).await;
    h.provider.push_stream(StreamScript::Deltas(vec!["one"]));
    h.provider.push_stream(StreamScript::Deltas(vec!["two"]));

    h.session.submit("first question").await.expect("submit");
    h.session.submit("second question").await.expect("submit");

    let requests = h.provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages.len(), 1);
    assert_eq!(requests[1].messages[0].content, "second question");
}

#[tokio::test]
async fn multi_turn_mode_sends_full_chat_slice() {
    let h = harness().await;
    h.provider.push_stream(StreamScript::Deltas(vec!["one"]));
    h.provider.push_stream(StreamScript::Deltas(vec!["two"]));

    h.session.submit("first question").await.expect("submit");
    h.session.submit("second question").await.expect("submit");

    let requests = h.provider.requests();
    // user, assistant, user
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].messages[1].role, MessageRole::Assistant);
    assert_eq!(requests[1].messages[2].content, "second question");
}

/// Provider whose stream stays open until the test closes the channel
struct BlockingProvider {
    deltas: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

#[async_trait]
impl ChatProvider for BlockingProvider {
    fn name(&self) -> &str {
        "blocking"
    }

    async fn generate(&self, _request: ChatRequest) -> Result<ChatResponse, TransportError> {
        Ok(ChatResponse {
            content: String::new(),
        })
    }

    async fn stream(&self, _request: ChatRequest) -> Result<ChatStream, TransportError> {
        let receiver = self.deltas.lock().expect("lock").take();
        let stream = async_stream::try_stream! {
            let mut accumulated = String::new();
            if let Some(mut receiver) = receiver {
                while let Some(delta) = receiver.recv().await {
                    accumulated.push_str(&delta);
                    yield ChatStreamEvent::Token { delta };
                }
            }
            yield ChatStreamEvent::Completed {
                response: ChatResponse { content: accumulated },
            };
        };
        Ok(Box::pin(stream))
    }
}

#[tokio::test]
async fn overlapping_submit_is_rejected_while_in_flight() {
    let (tx, rx) = mpsc::unbounded_channel();
    let blocking = Arc::new(BlockingProvider {
        deltas: Mutex::new(Some(rx)),
    });

    let store = Arc::new(MemoryStore::new());
    store
        .set(storage_keys::API_KEY, json!("test-key"))
        .await
        .expect("seed credential");
    let observer = RecordingObserver::new();
    let session = Arc::new(
        ConversationSession::new(SidechatConfig::default(), store, observer.clone())
            .with_provider_factory(Box::new(move |_key| {
                blocking.clone() as Arc<dyn ChatProvider>
            })),
    );

    let in_flight = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("slow question").await })
    };

    // Let the first submit reach the stream before poking at the guard
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let second = session.submit("impatient question").await;
    assert!(matches!(second, Err(SessionError::Busy)));

    tx.send("done".to_string()).expect("send delta");
    drop(tx);
    in_flight
        .await
        .expect("join")
        .expect("first submit succeeds");

    // Once the stream finished, the guard is released again
    let turns = session.turns().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns.last().map(|t| t.role), Some(Role::Assistant));
    session.submit("").await.expect("still usable");
}
