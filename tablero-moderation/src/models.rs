use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{reports, sanctions};

// --- Report ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = reports)]
pub struct Report {
    pub id: i64,
    pub reporter_id: i64,
    pub reported_id: i64,
    pub match_id: i64,
    pub reason: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reports)]
pub struct NewReport<'a> {
    pub reporter_id: i64,
    pub reported_id: i64,
    pub match_id: i64,
    pub reason: &'a str,
    pub status: &'static str,
    pub created_at: NaiveDateTime,
}

// --- Sanction ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanctionKind {
    Temporary,
    Permanent,
}

impl SanctionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SanctionKind::Temporary => "temporary",
            SanctionKind::Permanent => "permanent",
        }
    }
}

impl std::fmt::Display for SanctionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = sanctions)]
pub struct Sanction {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub reason: String,
    pub starts_at: NaiveDateTime,
    pub ends_at: Option<NaiveDateTime>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Sanction {
    /// An active row whose end has passed no longer bans anyone, even before
    /// the sweep flips its flag.
    pub fn is_in_effect(&self, now: NaiveDateTime) -> bool {
        self.is_active && self.ends_at.map_or(true, |end| end > now)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sanctions)]
pub struct NewSanction<'a> {
    pub user_id: i64,
    pub kind: &'static str,
    pub reason: &'a str,
    pub starts_at: NaiveDateTime,
    pub ends_at: Option<NaiveDateTime>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}
