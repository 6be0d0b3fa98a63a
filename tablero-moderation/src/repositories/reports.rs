use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use metrics::counter;
use tablero_shared::persistence::ContextFactory;
use tablero_shared::validation;
use tablero_shared::RepositoryError;

use crate::error::ModerationError;
use crate::models::{NewReport, Report, ReportStatus};
use crate::schema::reports;

const REPOSITORY: &str = "reports";

fn storage(operation: &'static str) -> impl FnOnce(diesel::result::Error) -> ModerationError {
    move |e| RepositoryError::storage(REPOSITORY, operation)(e).into()
}

/// Player reports filed after a match. Rows are never deleted; review happens
/// in the back-office workflow.
pub struct ReportRepository {
    contexts: Arc<dyn ContextFactory>,
}

impl ReportRepository {
    pub fn new(contexts: Arc<dyn ContextFactory>) -> Self {
        Self { contexts }
    }

    pub fn add_report(
        &self,
        reporter_id: i64,
        reported_id: i64,
        match_id: i64,
        reason: &str,
    ) -> Result<Report, ModerationError> {
        validation::positive_id("reporter_id", reporter_id)?;
        validation::positive_id("reported_id", reported_id)?;
        validation::positive_id("match_id", match_id)?;
        let reason = validation::reason("reason", reason)?;
        if reporter_id == reported_id {
            return Err(ModerationError::CannotReportSelf(reporter_id));
        }

        let mut conn = self.contexts.create()?;
        let new_report = NewReport {
            reporter_id,
            reported_id,
            match_id,
            reason,
            status: ReportStatus::Pending.as_str(),
            created_at: Utc::now().naive_utc(),
        };

        let report = diesel::insert_into(reports::table)
            .values(&new_report)
            .get_result::<Report>(&mut conn)
            .map_err(storage("add_report"))?;

        counter!("reports_filed_total").increment(1);
        tracing::info!(
            report_id = report.id,
            reporter_id,
            reported_id,
            match_id,
            "report filed"
        );
        Ok(report)
    }

    /// All reports against `reported_id`, whatever their status.
    pub fn count_reports_for_user(&self, reported_id: i64) -> Result<i64, ModerationError> {
        let mut conn = self.contexts.create()?;
        reports::table
            .filter(reports::reported_id.eq(reported_id))
            .count()
            .get_result(&mut conn)
            .map_err(storage("count_reports_for_user"))
    }

    pub fn reports_for_user(&self, reported_id: i64) -> Result<Vec<Report>, ModerationError> {
        let mut conn = self.contexts.create()?;
        reports::table
            .filter(reports::reported_id.eq(reported_id))
            .order((reports::created_at.desc(), reports::id.desc()))
            .load::<Report>(&mut conn)
            .map_err(storage("reports_for_user"))
    }
}
