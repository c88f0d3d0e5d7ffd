//! Weather skill: intent extraction and forecast lookup
//!
//! `intent` turns free text into a structured location/time intent, with a
//! keyword pre-filter in front and an offline matcher behind it. `lookup`
//! resolves the intent against the forecast endpoint and picks the requested
//! day(s) out of the returned series.

pub mod intent;
pub mod lookup;

pub use intent::{
    Classification, IntentClassifier, StructuredIntent, TimeType, contains_weather_keyword,
};
pub use lookup::{
    DayForecast, ForecastScope, MojiWeatherClient, WeatherError, WeatherReport, WeatherSource,
    WeatherSummary, lookup,
};
