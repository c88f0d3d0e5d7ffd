//! Forecast lookup against the weather endpoint
//!
//! The endpoint answers `GET ?sheng=<province>&place=<place>` with a series
//! of seven or more day entries ordered by day. Lookup queries by district
//! when the intent carries one, retrying once at city level before giving
//! up, then selects the requested day(s) from the series.

use async_trait::async_trait;
use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::intent::{StructuredIntent, TimeType};
use crate::config::constants::{defaults, urls, weather};

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather network error: {0}")]
    Network(String),
    #[error("weather response invalid: {0}")]
    InvalidResponse(String),
    #[error("no forecast found for {place}")]
    NotFound { place: String },
}

/// One day of the forecast series, field names as on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    /// Weekday label, e.g. "周三"
    #[serde(rename = "week1")]
    pub weekday: String,
    /// Date label, e.g. "08月06日"
    #[serde(rename = "week2")]
    pub date: String,
    /// Daytime condition, e.g. "多云"
    #[serde(rename = "wea1")]
    pub daytime_condition: String,
    /// Night condition
    #[serde(rename = "wea2")]
    pub night_condition: String,
    /// Daytime temperature, e.g. "31℃"
    #[serde(rename = "wendu1")]
    pub daytime_temp: String,
    /// Night temperature
    #[serde(rename = "wendu2")]
    pub night_temp: String,
    /// Daytime condition icon URL
    #[serde(rename = "img1")]
    pub daytime_icon: String,
    /// Night condition icon URL
    #[serde(rename = "img2")]
    pub night_icon: String,
}

/// Raw endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherReport {
    pub code: i64,
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub data: Vec<DayForecast>,
}

impl WeatherReport {
    fn has_data(&self) -> bool {
        self.code == 200 && !self.data.is_empty()
    }
}

/// Structured answer attached to a weather turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    /// Resolved place name as reported by the endpoint
    pub location: String,
    pub scope: ForecastScope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForecastScope {
    /// One selected day plus a short preview of the following days
    Day {
        selected: DayForecast,
        upcoming: Vec<DayForecast>,
    },
    /// The first week of the series, in original order
    Week(Vec<DayForecast>),
}

impl WeatherSummary {
    /// One-line form used as classifier context and plain-text rendering
    /// fallback
    pub fn context_line(&self) -> String {
        match &self.scope {
            ForecastScope::Day { selected, .. } => format!(
                "{} {}: {} {}, {} / {}",
                self.location,
                selected.weekday,
                selected.daytime_condition,
                selected.daytime_temp,
                selected.night_condition,
                selected.night_temp
            ),
            ForecastScope::Week(days) => {
                format!("{}: {}-day forecast", self.location, days.len())
            }
        }
    }
}

/// Forecast data source seam; implemented by the HTTP client and by test
/// fakes
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, province: &str, place: &str) -> Result<WeatherReport, WeatherError>;
}

pub struct MojiWeatherClient {
    http_client: HttpClient,
    endpoint: String,
}

impl MojiWeatherClient {
    pub fn new() -> Self {
        Self::with_endpoint(urls::WEATHER_API_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for MojiWeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherSource for MojiWeatherClient {
    async fn fetch(&self, province: &str, place: &str) -> Result<WeatherReport, WeatherError> {
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("sheng", province), ("place", place)])
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| WeatherError::InvalidResponse(e.to_string()))
    }
}

/// Resolve an intent to a summary. Queries by district when present; an
/// empty or failed district answer is retried once with the city alone.
pub async fn lookup(
    source: &dyn WeatherSource,
    intent: &StructuredIntent,
) -> Result<WeatherSummary, WeatherError> {
    let today = Local::now().date_naive();
    lookup_on(source, intent, today).await
}

/// As `lookup`, with an injectable notion of "today" for day selection
pub async fn lookup_on(
    source: &dyn WeatherSource,
    intent: &StructuredIntent,
    today: NaiveDate,
) -> Result<WeatherSummary, WeatherError> {
    let primary_place = intent.district.as_deref().unwrap_or(&intent.city);

    let report = match source.fetch(&intent.province, primary_place).await {
        Ok(report) if report.has_data() => report,
        first_attempt => {
            if intent.district.is_none() {
                return match first_attempt {
                    Ok(_) => Err(WeatherError::NotFound {
                        place: primary_place.to_string(),
                    }),
                    Err(e) => Err(e),
                };
            }
            tracing::debug!(
                "district lookup for {} empty, retrying with city {}",
                primary_place,
                intent.city
            );
            let retry = source.fetch(&intent.province, &intent.city).await?;
            if !retry.has_data() {
                return Err(WeatherError::NotFound {
                    place: primary_place.to_string(),
                });
            }
            retry
        }
    };

    let location = if report.place.is_empty() {
        primary_place.to_string()
    } else {
        report.place.clone()
    };
    Ok(select_summary(location, report.data, intent.time_type, today))
}

/// Pick the requested day(s) out of the series
fn select_summary(
    location: String,
    data: Vec<DayForecast>,
    time_type: TimeType,
    today: NaiveDate,
) -> WeatherSummary {
    let scope = match time_type {
        TimeType::Week => {
            let days: Vec<DayForecast> = data
                .iter()
                .take(defaults::WEEK_SUMMARY_DAYS)
                .cloned()
                .collect();
            ForecastScope::Week(days)
        }
        TimeType::Today | TimeType::Tomorrow => {
            let index = if time_type == TimeType::Tomorrow {
                let tomorrow = today
                    .checked_add_days(Days::new(1))
                    .map(|d| d.weekday())
                    .unwrap_or(today.weekday().succ());
                find_by_weekday(&data, tomorrow).unwrap_or_else(|| 1.min(data.len() - 1))
            } else {
                find_by_weekday(&data, today.weekday()).unwrap_or(0)
            };
            let selected = data[index].clone();
            let upcoming: Vec<DayForecast> = data
                .iter()
                .skip(1)
                .take(defaults::UPCOMING_PREVIEW_DAYS)
                .cloned()
                .collect();
            ForecastScope::Day { selected, upcoming }
        }
    };
    WeatherSummary { location, scope }
}

fn find_by_weekday(data: &[DayForecast], weekday: Weekday) -> Option<usize> {
    let label = weekday_label(weekday);
    data.iter().position(|day| day.weekday == label)
}

/// Weekday label as used by the endpoint
pub fn weekday_label(weekday: Weekday) -> &'static str {
    weather::WEEKDAY_LABELS[weekday.num_days_from_sunday() as usize]
}
