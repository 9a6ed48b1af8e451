//! Per-user plan and daily quota counters.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

/// Which daily counter an operation consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    Preview,
    Upload,
}

impl QuotaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Upload => "upload",
        }
    }

    /// Field names of the (day, count) pair in the account document.
    pub fn fields(&self) -> (&'static str, &'static str) {
        match self {
            Self::Preview => ("preview_day", "preview_count"),
            Self::Upload => ("upload_day", "upload_count"),
        }
    }
}

/// Quota view of a user record. The user record itself (credentials, profile,
/// billing) is owned elsewhere; this service only reads the plan and keeps
/// the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub user_id: String,
    #[serde(default)]
    pub plan: Plan,
    /// Offset of the user's local midnight from UTC, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub preview_day: Option<String>,
    #[serde(default)]
    pub preview_count: u32,
    #[serde(default)]
    pub upload_day: Option<String>,
    #[serde(default)]
    pub upload_count: u32,
}

impl Account {
    /// A free account with untouched counters, used when no record exists yet.
    pub fn new_free(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            plan: Plan::Free,
            utc_offset_minutes: 0,
            preview_day: None,
            preview_count: 0,
            upload_day: None,
            upload_count: 0,
        }
    }

    pub fn is_paying(&self) -> bool {
        self.plan != Plan::Free
    }

    /// The calendar day in the user's local time.
    pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
        match FixedOffset::east_opt(self.utc_offset_minutes * 60) {
            Some(offset) => now.with_timezone(&offset).date_naive(),
            None => now.date_naive(),
        }
    }

    /// Counter value for `day`; a counter stamped with an older day has reset.
    pub fn used_on(&self, kind: QuotaKind, day: NaiveDate) -> u32 {
        let (stamp, count) = match kind {
            QuotaKind::Preview => (&self.preview_day, self.preview_count),
            QuotaKind::Upload => (&self.upload_day, self.upload_count),
        };
        match stamp {
            Some(stamp) if *stamp == format_day(day) => count,
            _ => 0,
        }
    }
}

pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
