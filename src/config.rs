use std::env;

use chrono_tz::Tz;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub backend_url: String,
    pub backend_token: String,
    pub backend_timeout_secs: u64,
    pub timezone: Tz,
    pub slot_duration_minutes: i64,
    pub booking_source: String,
    pub calendar_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            backend_url: env::var("BACKEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            backend_token: env::var("BACKEND_TOKEN").unwrap_or_default(),
            backend_timeout_secs: env::var("BACKEND_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            timezone: env::var("TEACHER_TIMEZONE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(chrono_tz::America::Sao_Paulo),
            slot_duration_minutes: env::var("SLOT_DURATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|m: &i64| *m > 0)
                .unwrap_or(60),
            booking_source: env::var("BOOKING_SOURCE").unwrap_or_else(|_| "PROFESSOR".to_string()),
            calendar_name: env::var("CALENDAR_NAME").unwrap_or_else(|_| "Agenda".to_string()),
        }
    }
}
