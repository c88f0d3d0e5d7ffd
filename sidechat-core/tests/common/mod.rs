//! Shared fakes for session integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sidechat_core::llm::{
    ChatProvider, ChatRequest, ChatResponse, ChatStream, ChatStreamEvent, TransportError,
};
use sidechat_core::session::{SessionObserver, Turn};
use sidechat_core::skills::weather::{DayForecast, WeatherError, WeatherReport, WeatherSource};

/// Everything the session told the view, in order
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Turn(Turn),
    Partial(String),
    Failed(String),
    Notice(String),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().expect("observer lock").clone()
    }

    pub fn partials(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ViewEvent::Partial(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl SessionObserver for RecordingObserver {
    fn turn_added(&self, turn: &Turn) {
        self.events
            .lock()
            .expect("observer lock")
            .push(ViewEvent::Turn(turn.clone()));
    }

    fn partial_reply(&self, accumulated: &str) {
        self.events
            .lock()
            .expect("observer lock")
            .push(ViewEvent::Partial(accumulated.to_string()));
    }

    fn reply_failed(&self, message: &str) {
        self.events
            .lock()
            .expect("observer lock")
            .push(ViewEvent::Failed(message.to_string()));
    }

    fn notice(&self, message: &str) {
        self.events
            .lock()
            .expect("observer lock")
            .push(ViewEvent::Notice(message.to_string()));
    }
}

/// One scripted streamed reply
#[derive(Debug, Clone)]
pub enum StreamScript {
    /// Emit these deltas, then complete
    Deltas(Vec<&'static str>),
    /// Emit these deltas, then fail with a network error
    FailAfter(Vec<&'static str>),
}

/// Provider that replays scripted replies and records every request
#[derive(Default)]
pub struct ScriptedProvider {
    generate_replies: Mutex<VecDeque<Result<String, String>>>,
    stream_scripts: Mutex<VecDeque<StreamScript>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_generate(&self, reply: Result<&str, &str>) {
        self.generate_replies
            .lock()
            .expect("script lock")
            .push_back(reply.map(|s| s.to_string()).map_err(|s| s.to_string()));
    }

    pub fn push_stream(&self, script: StreamScript) {
        self.stream_scripts
            .lock()
            .expect("script lock")
            .push_back(script);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("request lock").clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse, TransportError> {
        self.requests.lock().expect("request lock").push(request);
        let reply = self
            .generate_replies
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(Ok(String::new()));
        reply
            .map(|content| ChatResponse { content })
            .map_err(TransportError::Network)
    }

    async fn stream(&self, request: ChatRequest) -> Result<ChatStream, TransportError> {
        self.requests.lock().expect("request lock").push(request);
        let script = self
            .stream_scripts
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(StreamScript::Deltas(Vec::new()));

        let mut items: Vec<Result<ChatStreamEvent, TransportError>> = Vec::new();
        match script {
            StreamScript::Deltas(deltas) => {
                let full: String = deltas.concat();
                for delta in deltas {
                    items.push(Ok(ChatStreamEvent::Token {
                        delta: delta.to_string(),
                    }));
                }
                items.push(Ok(ChatStreamEvent::Completed {
                    response: ChatResponse { content: full },
                }));
            }
            StreamScript::FailAfter(deltas) => {
                for delta in deltas {
                    items.push(Ok(ChatStreamEvent::Token {
                        delta: delta.to_string(),
                    }));
                }
                items.push(Err(TransportError::Network("connection reset".to_string())));
            }
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// Forecast source answering from a fixed place -> series map
#[derive(Default)]
pub struct FakeWeatherSource {
    reports: HashMap<String, Vec<DayForecast>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeWeatherSource {
    pub fn with_place(place: &str, data: Vec<DayForecast>) -> Arc<Self> {
        let mut reports = HashMap::new();
        reports.insert(place.to_string(), data);
        Arc::new(Self {
            reports,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("call lock").clone()
    }
}

#[async_trait]
impl WeatherSource for FakeWeatherSource {
    async fn fetch(&self, province: &str, place: &str) -> Result<WeatherReport, WeatherError> {
        self.calls
            .lock()
            .expect("call lock")
            .push((province.to_string(), place.to_string()));
        match self.reports.get(place) {
            Some(data) => Ok(WeatherReport {
                code: 200,
                place: place.to_string(),
                data: data.clone(),
            }),
            None => Ok(WeatherReport {
                code: 200,
                place: String::new(),
                data: Vec::new(),
            }),
        }
    }
}

/// A seven-day series starting on 周三
pub fn forecast_series() -> Vec<DayForecast> {
    ["周三", "周四", "周五", "周六", "周日", "周一", "周二"]
        .iter()
        .map(|weekday| DayForecast {
            weekday: weekday.to_string(),
            date: "08月06日".to_string(),
            daytime_condition: "晴".to_string(),
            night_condition: "多云".to_string(),
            daytime_temp: "30℃".to_string(),
            night_temp: "22℃".to_string(),
            daytime_icon: String::new(),
            night_icon: String::new(),
        })
        .collect()
}

pub const INTENT_BEIJING_TODAY: &str = r#"{"province":"北京","city":"北京","district":null,"timeType":"today","intent":"weather in Beijing today"}"#;
pub const INTENT_BEIJING_TOMORROW: &str = r#"{"province":"北京","city":"北京","district":null,"timeType":"tomorrow","intent":"weather in Beijing tomorrow"}"#;
