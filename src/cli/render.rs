//! Terminal rendering of session output
//!
//! The observer here is the view collaborator: it pattern-matches turn
//! content (plain text vs weather card) instead of the session knowing
//! anything about terminals.

use console::style;
use std::io::{self, Write};
use std::sync::Mutex;

use sidechat_core::session::{Rendered, Role, SessionObserver, Turn};
use sidechat_core::skills::weather::{ForecastScope, WeatherSummary};

pub struct ConsoleObserver {
    /// Chars of the in-progress reply already printed; nonzero means a
    /// streamed reply is on screen and its committed turn needs no reprint
    streamed_chars: Mutex<usize>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self {
            streamed_chars: Mutex::new(0),
        }
    }

    fn assistant_prefix() -> String {
        format!("{}", style("sidechat:").green().bold())
    }
}

impl SessionObserver for ConsoleObserver {
    fn turn_added(&self, turn: &Turn) {
        let mut streamed = self.streamed_chars.lock().expect("render lock");
        match turn.role {
            Role::User => {
                println!("{} {}", style("you:").cyan().bold(), turn.content.as_text());
            }
            Role::Assistant => {
                if *streamed > 0 {
                    // Already on screen from the partial updates
                    println!();
                    *streamed = 0;
                    return;
                }
                match &turn.content {
                    Rendered::Text(text) => {
                        println!("{} {}", Self::assistant_prefix(), text);
                    }
                    Rendered::WeatherCard(summary) => print_weather_card(summary),
                }
            }
            Role::System => {
                println!("{} {}", style("system:").yellow().bold(), turn.content.as_text());
            }
        }
    }

    fn partial_reply(&self, accumulated: &str) {
        let mut streamed = self.streamed_chars.lock().expect("render lock");
        if *streamed == 0 {
            print!("{} ", Self::assistant_prefix());
        }
        let suffix: String = accumulated.chars().skip(*streamed).collect();
        print!("{}", suffix);
        io::stdout().flush().ok();
        *streamed = accumulated.chars().count();
    }

    fn reply_failed(&self, message: &str) {
        let mut streamed = self.streamed_chars.lock().expect("render lock");
        if *streamed > 0 {
            println!();
            *streamed = 0;
        }
        println!("{}", style(message).red());
    }

    fn notice(&self, message: &str) {
        println!("{}", style(message).yellow());
    }
}

fn print_weather_card(summary: &WeatherSummary) {
    match &summary.scope {
        ForecastScope::Day { selected, upcoming } => {
            println!(
                "{} {} {}",
                style(&summary.location).green().bold(),
                selected.weekday,
                selected.date
            );
            println!(
                "  {} {} {}",
                style("day:").dim(),
                selected.daytime_condition,
                selected.daytime_temp
            );
            println!(
                "  {} {} {}",
                style("night:").dim(),
                selected.night_condition,
                selected.night_temp
            );
            if !upcoming.is_empty() {
                let preview: Vec<String> = upcoming
                    .iter()
                    .map(|day| {
                        format!("{} {} {}", day.weekday, day.daytime_condition, day.daytime_temp)
                    })
                    .collect();
                println!("  {} {}", style("next:").dim(), preview.join(" | "));
            }
        }
        ForecastScope::Week(days) => {
            println!(
                "{} {}",
                style(&summary.location).green().bold(),
                style(format!("{}-day forecast", days.len())).dim()
            );
            for day in days {
                println!(
                    "  {} {}  {} {} / {} {}",
                    day.weekday,
                    day.date,
                    day.daytime_condition,
                    day.daytime_temp,
                    day.night_condition,
                    day.night_temp
                );
            }
        }
    }
}
