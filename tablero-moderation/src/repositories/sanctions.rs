use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use metrics::counter;
use tablero_shared::persistence::ContextFactory;
use tablero_shared::validation;
use tablero_shared::RepositoryError;

use crate::error::ModerationError;
use crate::models::{NewSanction, Sanction, SanctionKind};
use crate::schema::sanctions;

const REPOSITORY: &str = "sanctions";

fn storage(operation: &'static str) -> impl FnOnce(diesel::result::Error) -> ModerationError {
    move |e| RepositoryError::storage(REPOSITORY, operation)(e).into()
}

pub struct SanctionRepository {
    contexts: Arc<dyn ContextFactory>,
}

impl SanctionRepository {
    pub fn new(contexts: Arc<dyn ContextFactory>) -> Self {
        Self { contexts }
    }

    /// Bans `user_id` until `until_utc`, or indefinitely when `permanent`.
    ///
    /// `until_utc` is stored as given. A permanent ban with an end, or a
    /// temporary one without, is logged but not corrected.
    pub fn apply_ban(
        &self,
        user_id: i64,
        permanent: bool,
        until_utc: Option<DateTime<Utc>>,
        reason: &str,
    ) -> Result<Sanction, ModerationError> {
        validation::positive_id("user_id", user_id)?;
        let reason = validation::reason("reason", reason)?;

        let kind = if permanent { SanctionKind::Permanent } else { SanctionKind::Temporary };
        if permanent == until_utc.is_some() {
            tracing::warn!(user_id, %kind, until = ?until_utc, "ban kind and end timestamp disagree");
        }

        let mut conn = self.contexts.create()?;
        let now = Utc::now().naive_utc();
        let new_sanction = NewSanction {
            user_id,
            kind: kind.as_str(),
            reason,
            starts_at: now,
            ends_at: until_utc.map(|t| t.naive_utc()),
            is_active: true,
            created_at: now,
        };

        let sanction = diesel::insert_into(sanctions::table)
            .values(&new_sanction)
            .get_result::<Sanction>(&mut conn)
            .map_err(storage("apply_ban"))?;

        counter!("sanctions_applied_total", "kind" => kind.as_str()).increment(1);
        tracing::info!(
            sanction_id = sanction.id,
            user_id,
            %kind,
            ends_at = ?sanction.ends_at,
            "ban applied"
        );
        Ok(sanction)
    }

    pub fn has_active_ban(&self, user_id: i64) -> Result<bool, ModerationError> {
        self.has_active_ban_at(user_id, Utc::now())
    }

    /// True iff an active sanction for `user_id` has no end or ends after `now`.
    pub fn has_active_ban_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<bool, ModerationError> {
        let mut conn = self.contexts.create()?;
        let active = sanctions::table
            .filter(sanctions::user_id.eq(user_id))
            .filter(sanctions::is_active.eq(true))
            .load::<Sanction>(&mut conn)
            .map_err(storage("has_active_ban"))?;

        let now = now.naive_utc();
        Ok(active.iter().any(|s| s.is_in_effect(now)))
    }

    /// Sanction history for `user_id`, newest first.
    pub fn sanctions_for_user(&self, user_id: i64) -> Result<Vec<Sanction>, ModerationError> {
        let mut conn = self.contexts.create()?;
        sanctions::table
            .filter(sanctions::user_id.eq(user_id))
            .order((sanctions::created_at.desc(), sanctions::id.desc()))
            .load::<Sanction>(&mut conn)
            .map_err(storage("sanctions_for_user"))
    }

    pub fn lift_sanction(&self, sanction_id: i64) -> Result<Sanction, ModerationError> {
        let mut conn = self.contexts.create()?;
        let sanction = diesel::update(sanctions::table.find(sanction_id))
            .set(sanctions::is_active.eq(false))
            .get_result::<Sanction>(&mut conn)
            .optional()
            .map_err(storage("lift_sanction"))?
            .ok_or(ModerationError::SanctionNotFound(sanction_id))?;

        tracing::info!(sanction_id, user_id = sanction.user_id, "sanction lifted");
        Ok(sanction)
    }

    /// Clears the active flag of every sanction that ended at or before `now`.
    pub fn expire_sanctions(&self, now: DateTime<Utc>) -> Result<usize, ModerationError> {
        let mut conn = self.contexts.create()?;
        let expired = diesel::update(
            sanctions::table
                .filter(sanctions::is_active.eq(true))
                .filter(sanctions::ends_at.le(now.naive_utc())),
        )
        .set(sanctions::is_active.eq(false))
        .execute(&mut conn)
        .map_err(storage("expire_sanctions"))?;

        if expired > 0 {
            counter!("sanctions_expired_total").increment(expired as u64);
            tracing::info!(expired, "expired sanctions deactivated");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::repositories::test_support;

    fn repo() -> SanctionRepository {
        let pool = test_support::pool();
        SanctionRepository::new(test_support::contexts(&pool))
    }

    #[test]
    fn expired_temporary_ban_is_not_active() {
        let repo = repo();
        repo.apply_ban(5, false, Some(Utc::now() - Duration::seconds(1)), "griefing").unwrap();

        assert!(!repo.has_active_ban(5).unwrap());
    }

    #[test]
    fn running_temporary_ban_is_active() {
        let repo = repo();
        repo.apply_ban(5, false, Some(Utc::now() + Duration::hours(1)), "griefing").unwrap();

        assert!(repo.has_active_ban(5).unwrap());
        assert!(!repo.has_active_ban(6).unwrap());
    }

    #[test]
    fn permanent_ban_is_active() {
        let repo = repo();
        let sanction = repo.apply_ban(5, true, None, "cheating").unwrap();

        assert_eq!(sanction.kind, "permanent");
        assert_eq!(sanction.ends_at, None);
        assert!(sanction.is_active);
        assert!(repo.has_active_ban(5).unwrap());
        assert!(repo.has_active_ban_at(5, Utc::now() + Duration::days(3650)).unwrap());
    }

    #[test]
    fn inconsistent_arguments_are_stored_as_given() {
        let repo = repo();
        let until = Utc::now() + Duration::hours(2);

        let sanction = repo.apply_ban(5, true, Some(until), "cheating").unwrap();

        assert_eq!(sanction.kind, "permanent");
        assert!(sanction.ends_at.is_some());
        assert!(!repo.has_active_ban_at(5, until + Duration::seconds(1)).unwrap());
    }

    #[test]
    fn lifted_ban_is_not_active() {
        let repo = repo();
        let sanction = repo.apply_ban(5, true, None, "cheating").unwrap();

        let lifted = repo.lift_sanction(sanction.id).unwrap();
        assert!(!lifted.is_active);
        assert!(!repo.has_active_ban(5).unwrap());
        assert!(matches!(repo.lift_sanction(404), Err(ModerationError::SanctionNotFound(404))));
    }

    #[test]
    fn sweep_only_flips_expired_rows() {
        let repo = repo();
        let now = Utc::now();
        repo.apply_ban(1, false, Some(now - Duration::minutes(5)), "spam").unwrap();
        repo.apply_ban(2, false, Some(now + Duration::hours(1)), "spam").unwrap();
        repo.apply_ban(3, true, None, "cheating").unwrap();

        assert_eq!(repo.expire_sanctions(now).unwrap(), 1);
        assert_eq!(repo.expire_sanctions(now).unwrap(), 0);

        let history = repo.sanctions_for_user(1).unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].is_active);
        assert!(repo.sanctions_for_user(2).unwrap()[0].is_active);
        assert!(repo.sanctions_for_user(3).unwrap()[0].is_active);
    }

    #[test]
    fn repeated_bans_keep_every_reason() {
        let repo = repo();
        repo.apply_ban(5, false, Some(Utc::now() + Duration::hours(1)), "griefing").unwrap();
        repo.apply_ban(5, true, None, "cheating").unwrap();

        let reasons: Vec<String> = repo
            .sanctions_for_user(5)
            .unwrap()
            .into_iter()
            .map(|s| s.reason)
            .collect();
        assert_eq!(reasons, vec!["cheating", "griefing"]);
        assert!(repo.has_active_ban(5).unwrap());
    }

    #[test]
    fn invalid_reason_is_rejected() {
        let repo = repo();
        assert!(matches!(repo.apply_ban(5, true, None, ""), Err(ModerationError::Validation(_))));
        assert!(repo.sanctions_for_user(5).unwrap().is_empty());
    }
}
