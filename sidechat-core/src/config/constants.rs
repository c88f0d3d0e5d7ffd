//! Centralized constants for sidechat
//!
//! Endpoint URLs, model ids, prompt text, keyword tables, and defaults live
//! here so the rest of the codebase never hardcodes them.

/// External endpoint URLs
pub mod urls {
    /// OpenAI-compatible chat completions endpoint (Zhipu GLM open platform)
    pub const CHAT_COMPLETIONS_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
    /// Seven-day forecast endpoint (Moji data relay)
    pub const WEATHER_API_URL: &str = "https://api.mymzf.com/api/tqybmoji";
    /// Chinese-to-English translation endpoint
    pub const TRANSLATION_API_URL: &str = "https://api.mymzf.com/api/sgtranslate";
}

/// Model ID constants
pub mod models {
    pub mod zhipu {
        pub const DEFAULT_MODEL: &str = "glm-4.5-flash";
        pub const SUPPORTED_MODELS: &[&str] = &["glm-4.5-flash", "glm-4.5", "glm-4-flash"];
    }
}

/// Message role string constants used on the wire
pub mod message_roles {
    pub const SYSTEM: &str = "system";
    pub const USER: &str = "user";
    pub const ASSISTANT: &str = "assistant";
}

/// Keys under which state is persisted in the key-value store
pub mod storage_keys {
    /// User-supplied bearer token
    pub const API_KEY: &str = "api_key";
    /// The full ordered conversation log
    pub const CONVERSATION_LOG: &str = "conversation_log";
    /// One-shot trigger record written by an external process
    pub const PENDING_TRIGGER: &str = "pending_trigger";
}

/// Environment variable names checked for the API credential
pub mod env_vars {
    pub const PRIMARY_API_KEY: &str = "SIDECHAT_API_KEY";
    /// Legacy name, kept for users migrating from the Zhipu-specific setup
    pub const FALLBACK_API_KEY: &str = "ZHIPU_API_KEY";
}

/// Default values for configuration fields
pub mod defaults {
    /// Config file searched in the working directory, then the user config dir
    pub const CONFIG_FILE_NAME: &str = "sidechat.toml";
    /// Persisted store file under the user data dir
    pub const STORE_FILE_NAME: &str = "sidechat-store.json";
    /// Directory name used under the platform config/data dirs
    pub const APP_DIR_NAME: &str = "sidechat";

    pub const DEFAULT_PROVIDER: &str = "zhipu";
    /// City used by the offline intent matcher when no city is recognized
    pub const DEFAULT_CITY: &str = "北京";

    pub const REQUEST_TIMEOUT_SECS: u64 = 120;
    pub const FIRST_CHUNK_TIMEOUT_SECS: u64 = 60;
    pub const CHUNK_TIMEOUT_SECS: u64 = 30;

    /// Max tokens requested from the intent-classification call; sized so the
    /// single-line JSON answer is not truncated mid-object
    pub const INTENT_MAX_TOKENS: u32 = 500;
    pub const INTENT_TEMPERATURE: f32 = 0.1;

    /// Days shown in a week summary
    pub const WEEK_SUMMARY_DAYS: usize = 7;
    /// Days previewed after the selected day in a single-day summary
    pub const UPCOMING_PREVIEW_DAYS: usize = 4;
}

/// Lexical tables for the weather skill
pub mod weather {
    /// Pre-filter keyword set. Input containing none of these is not a
    /// weather query and never reaches the classifier model.
    pub const KEYWORDS: &[&str] = &[
        "天气", "气温", "温度", "预报", "晴", "雨", "雪", "风", "云",
        "weather", "temperature", "forecast", "sunny", "rain", "snow", "wind", "cloud",
    ];

    /// Substrings mapping free text to a time type in the offline matcher
    pub const TOMORROW_MARKERS: &[&str] = &["明天", "明日", "后天", "tomorrow"];
    pub const WEEK_MARKERS: &[&str] = &["一周", "7天", "七天", "未来几天", "week", "7 days"];

    /// Weekday labels as returned by the weather endpoint, indexed by
    /// `chrono::Weekday::num_days_from_sunday`
    pub const WEEKDAY_LABELS: &[&str] = &["周日", "周一", "周二", "周三", "周四", "周五", "周六"];
}

/// Prompt text embedded in model calls
pub mod prompts {
    /// Wrapper applied to text injected by the explain trigger action
    pub const EXPLAIN_PROMPT_PREFIX: &str = "Explain or translate the following passage:\n\n";

    /// System prompt for the weather intent classifier. The conversation
    /// history block is appended by the caller; the model must answer with a
    /// single-line JSON object and nothing else.
    pub const INTENT_SYSTEM_PROMPT: &str = r#"Analyze the user's weather query and extract structured information. If the user uses an elliptical follow-up (such as "what about tomorrow?"), infer the full intent from the conversation history provided below.

Answer strictly with one single-line JSON object and no additional content:
{"province":"...","city":"...","district":"... or null","timeType":"today/tomorrow/week","intent":"short description"}

Rules:
- province and city must be real Chinese administrative division names
- district is extracted when present, otherwise null
- timeType mapping: "today"/"now" -> today; "tomorrow" -> tomorrow; "week"/"7 days"/"coming days" -> week; default -> today
- when the province or city cannot be determined, use null

Examples:
Input: "北京今天天气怎么样"
Output: {"province":"北京","city":"北京","district":null,"timeType":"today","intent":"weather in Beijing today"}

Input: "上海明天会下雨吗"
Output: {"province":"上海","city":"上海","district":null,"timeType":"tomorrow","intent":"rain in Shanghai tomorrow"}

Input: "深圳未来一周的天气预报"
Output: {"province":"广东","city":"深圳","district":null,"timeType":"week","intent":"weekly forecast for Shenzhen"}

Input: "海淀区今天天气"
Output: {"province":"北京","city":"北京","district":"海淀区","timeType":"today","intent":"weather in Haidian today"}

Conversation history (may be empty):
"#;
}
