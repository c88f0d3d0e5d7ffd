//! Weather intent extraction
//!
//! Three stages, cheapest first. A lexical pre-filter rejects everything
//! without a weather keyword before any network traffic. Recognized
//! candidates go to the classifier model, which must answer with a strict
//! single-line JSON object; a malformed answer goes through a recovery
//! ladder (brace-substring re-parse, then labeled-field extraction) before
//! being declared a failure. When the model cannot be reached at all, a
//! deterministic city-table matcher takes over and always produces an
//! intent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::constants::{defaults, prompts, weather};
use crate::llm::{ChatMessage, ChatProvider, ChatRequest};

/// Which day(s) the user asked about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeType {
    #[default]
    Today,
    Tomorrow,
    Week,
}

impl TimeType {
    fn parse(value: &str) -> Self {
        match value {
            "tomorrow" => TimeType::Tomorrow,
            "week" => TimeType::Week,
            _ => TimeType::Today,
        }
    }
}

/// Structured location/time intent extracted from free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredIntent {
    pub province: String,
    pub city: String,
    pub district: Option<String>,
    pub time_type: TimeType,
    pub description: String,
}

/// Classifier outcome. `Failed` is a definite, user-visible failure mode,
/// distinct from "this is not a weather query".
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    NotWeather,
    Intent(StructuredIntent),
    Failed,
}

/// Lexical pre-filter; no keyword means no classifier call at all
pub fn contains_weather_keyword(text: &str) -> bool {
    let lowered = text.to_lowercase();
    weather::KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Fixed city table for the offline matcher: recognized aliases in the
/// user's text, the administrative province, and the canonical city name
/// sent to the forecast endpoint.
static CITY_TABLE: &[(&[&str], &str, &str)] = &[
    (&["北京", "beijing"], "北京", "北京"),
    (&["上海", "shanghai"], "上海", "上海"),
    (&["广州", "guangzhou"], "广东", "广州"),
    (&["深圳", "shenzhen"], "广东", "深圳"),
    (&["杭州", "hangzhou"], "浙江", "杭州"),
    (&["南京", "nanjing"], "江苏", "南京"),
    (&["苏州", "suzhou"], "江苏", "苏州"),
    (&["成都", "chengdu"], "四川", "成都"),
    (&["重庆", "chongqing"], "重庆", "重庆"),
    (&["武汉", "wuhan"], "湖北", "武汉"),
    (&["西安", "xi'an", "xian"], "陕西", "西安"),
    (&["天津", "tianjin"], "天津", "天津"),
    (&["郑州", "zhengzhou"], "河南", "郑州"),
    (&["长沙", "changsha"], "湖南", "长沙"),
    (&["青岛", "qingdao"], "山东", "青岛"),
    (&["沈阳", "shenyang"], "辽宁", "沈阳"),
    (&["哈尔滨", "harbin"], "黑龙江", "哈尔滨"),
    (&["昆明", "kunming"], "云南", "昆明"),
    (&["厦门", "xiamen"], "福建", "厦门"),
    (&["大连", "dalian"], "辽宁", "大连"),
];

pub struct IntentClassifier {
    model: String,
    default_city: String,
}

impl IntentClassifier {
    pub fn new(model: impl Into<String>, default_city: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            default_city: default_city.into(),
        }
    }

    /// Classify `text`. `weather_history` is the weather-channel context
    /// slice, used to resolve elliptical follow-ups. `provider` is `None`
    /// when no credential is available; the offline matcher is used then.
    pub async fn classify(
        &self,
        provider: Option<&dyn ChatProvider>,
        text: &str,
        weather_history: &[(String, String)],
    ) -> Classification {
        if !contains_weather_keyword(text) {
            return Classification::NotWeather;
        }

        let Some(provider) = provider else {
            tracing::warn!("no credential for intent model, using offline matcher");
            return Classification::Intent(self.fallback_classify(text));
        };

        let mut request = ChatRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(build_intent_prompt(weather_history)),
                ChatMessage::user(text),
            ],
        );
        request.temperature = Some(defaults::INTENT_TEMPERATURE);
        request.max_tokens = Some(defaults::INTENT_MAX_TOKENS);

        match provider.generate(request).await {
            Ok(response) => match parse_intent(&response.content) {
                Some(intent) => Classification::Intent(intent),
                None => {
                    tracing::warn!("intent model answer unparseable: {}", response.content);
                    Classification::Failed
                }
            },
            Err(e) => {
                tracing::warn!("intent model unreachable ({}), using offline matcher", e);
                Classification::Intent(self.fallback_classify(text))
            }
        }
    }

    /// Deterministic matcher: fixed city table plus substring time rules.
    /// Never fails; an unrecognized city becomes the configured default.
    pub fn fallback_classify(&self, text: &str) -> StructuredIntent {
        let lowered = text.to_lowercase();
        let matched = CITY_TABLE.iter().find(|(aliases, _, _)| {
            aliases.iter().any(|alias| lowered.contains(alias))
        });

        let (province, city) = match matched {
            Some((_, province, city)) => (province.to_string(), city.to_string()),
            None => {
                let city = self.default_city.clone();
                let province = CITY_TABLE
                    .iter()
                    .find(|(_, _, table_city)| *table_city == city)
                    .map(|(_, province, _)| province.to_string())
                    .unwrap_or_else(|| city.clone());
                (province, city)
            }
        };

        let time_type = if weather::TOMORROW_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            TimeType::Tomorrow
        } else if weather::WEEK_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            TimeType::Week
        } else {
            TimeType::Today
        };

        StructuredIntent {
            province,
            city,
            district: None,
            time_type,
            description: "offline keyword match".to_string(),
        }
    }
}

/// System prompt with the weather-channel history appended as numbered
/// context lines
fn build_intent_prompt(weather_history: &[(String, String)]) -> String {
    let mut prompt = String::from(prompts::INTENT_SYSTEM_PROMPT);
    if weather_history.is_empty() {
        prompt.push_str("(none)\n");
    } else {
        for (index, (role, content)) in weather_history.iter().enumerate() {
            prompt.push_str(&format!("{}. {}: {}\n", index + 1, role, content));
        }
    }
    prompt
}

/// Parse the model's answer into an intent. Tries the strict form first,
/// then the recovery ladder. `None` means classification failed.
fn parse_intent(content: &str) -> Option<StructuredIntent> {
    let trimmed = content.trim();

    if let Some(intent) = parse_intent_json(trimmed) {
        return Some(intent);
    }

    // Recovery (a): the largest brace-delimited substring, for answers
    // wrapped in prose or code fences
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Some(intent) = parse_intent_json(&trimmed[start..=end]) {
                tracing::debug!("intent recovered from brace substring");
                return Some(intent);
            }
        }
    }

    // Recovery (b): pull labeled quoted fields out of a truncated answer
    if let Some(intent) = extract_labeled_fields(trimmed) {
        tracing::debug!("intent recovered from labeled fields");
        return Some(intent);
    }

    None
}

fn parse_intent_json(text: &str) -> Option<StructuredIntent> {
    let payload: Value = serde_json::from_str(text).ok()?;
    let city = non_null_string(payload.get("city"))?;
    let province = non_null_string(payload.get("province")).unwrap_or_else(|| city.clone());

    Some(StructuredIntent {
        province,
        city,
        district: non_null_string(payload.get("district")),
        time_type: payload
            .get("timeType")
            .and_then(|v| v.as_str())
            .map(TimeType::parse)
            .unwrap_or_default(),
        description: non_null_string(payload.get("intent")).unwrap_or_default(),
    })
}

fn non_null_string(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    if text.is_empty() || text == "null" {
        return None;
    }
    Some(text.to_string())
}

static FIELD_PATTERNS: Lazy<[(&'static str, Regex); 4]> = Lazy::new(|| {
    let field = |name: &str| {
        Regex::new(&format!(r#""{}"\s*:\s*"([^"]+)""#, name)).expect("static field pattern")
    };
    [
        ("province", field("province")),
        ("city", field("city")),
        ("district", field("district")),
        ("timeType", field("timeType")),
    ]
});

fn extract_labeled_fields(text: &str) -> Option<StructuredIntent> {
    let capture = |name: &str| {
        FIELD_PATTERNS
            .iter()
            .find(|(field, _)| *field == name)
            .and_then(|(_, pattern)| pattern.captures(text))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|value| value != "null")
    };

    let city = capture("city")?;
    let province = capture("province").unwrap_or_else(|| city.clone());

    Some(StructuredIntent {
        province,
        city,
        district: capture("district"),
        time_type: capture("timeType")
            .map(|value| TimeType::parse(&value))
            .unwrap_or_default(),
        description: "recovered from partial answer".to_string(),
    })
}
