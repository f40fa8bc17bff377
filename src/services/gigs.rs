use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::Deps;
use crate::auth::Identity;
use crate::auth::authorization::{ensure_admin, ensure_owner};
use crate::cache::{self, keys};
use crate::effects::Effect;
use crate::error::{AppError, AppResult};
use crate::models::MAX_PAGE;
use crate::models::activities::{ActivityKind, NewActivity};
use crate::models::gigs::{
    self, CreateGig, GigChanges, GigPage, GigResponse, GigStatus, NewGig, UpdateGig,
};

pub const MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Result of one expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: u64,
    pub purged_activities: u64,
}

/// Gig state machine and the caches that mirror it.
#[derive(Clone)]
pub struct GigLifecycle {
    deps: Deps,
    report_flag_threshold: i32,
}

impl GigLifecycle {
    pub fn new(deps: Deps, report_flag_threshold: i32) -> Self {
        Self {
            deps,
            report_flag_threshold,
        }
    }

    pub async fn create(&self, owner: &Identity, input: CreateGig) -> AppResult<GigResponse> {
        let new_gig = validate_new_gig(owner.id, input, Utc::now())?;
        let gig = self.deps.store.insert_gig(new_gig).await?;
        info!(gig_id = %gig.id, owner = %owner.id, "Gig created");

        let response = GigResponse::from(gig.clone());
        let cache = self.deps.cache.as_ref();

        // Only extend an owner listing that is already cached.
        let owner_key = keys::user_gigs(owner.id);
        if let Some(mut listing) = cache::get_json::<Vec<GigResponse>>(cache, &owner_key).await {
            listing.insert(0, response.clone());
            if !cache::set_json(cache, &owner_key, &listing, self.deps.ttl.gig_list_ttl).await {
                cache::forget(cache, &owner_key).await;
            }
        }
        cache::invalidate_tracked(cache, keys::GIG_LIST_KEYS).await;

        if owner.activity_public {
            self.deps
                .effects
                .run(vec![Effect::RecordActivity(NewActivity {
                    kind: ActivityKind::Posted,
                    actor_id: owner.id,
                    actor_name: owner.name.clone(),
                    gig_id: gig.id,
                    gig_title: gig.title.clone(),
                })])
                .await;
        }

        Ok(response)
    }

    pub async fn edit(
        &self,
        gig_id: Uuid,
        requester: &Identity,
        input: UpdateGig,
    ) -> AppResult<GigResponse> {
        let gig = self.load(gig_id).await?;
        ensure_owner(requester, gig.created_by, "edit this gig")?;

        let (changes, transition) = validate_edit(&gig, input)?;

        if let Some(to) = transition {
            if !self.deps.store.transition_gig(gig_id, to).await? {
                return Err(AppError::conflict(format!(
                    "Gig is no longer active and cannot become {}",
                    to.as_str()
                )));
            }
            info!(%gig_id, to = to.as_str(), "Gig status changed by owner");
        }

        let written = if changes.is_empty() {
            self.deps.store.find_gig(gig_id).await
        } else {
            self.deps.store.update_gig(gig_id, changes).await
        };

        // A status transition above is already committed, even if the field write failed.
        self.deps.invalidate_gig(gig_id, gig.created_by).await;
        let updated = written?.ok_or_else(|| AppError::not_found("Gig", gig_id))?;
        Ok(GigResponse::from(updated))
    }

    pub async fn expire_sweep(&self) -> AppResult<SweepReport> {
        self.expire_sweep_at(Utc::now()).await
    }

    /// Expire every active gig past its deadline at `now` and purge stale activity.
    pub async fn expire_sweep_at(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let expired = self.deps.store.expire_overdue(now).await?;
        if expired > 0 {
            cache::invalidate_tracked(self.deps.cache.as_ref(), keys::GIG_LIST_KEYS).await;
        }

        let purged_activities = self.deps.store.purge_activities(now).await?;
        if purged_activities > 0 {
            cache::forget(self.deps.cache.as_ref(), keys::ACTIVITY_RECENT).await;
        }

        if expired > 0 || purged_activities > 0 {
            info!(expired, purged_activities, "Expiry sweep finished");
        } else {
            debug!("Expiry sweep found nothing to do");
        }
        Ok(SweepReport {
            expired,
            purged_activities,
        })
    }

    pub async fn delete(&self, gig_id: Uuid, requester: &Identity) -> AppResult<()> {
        let gig = self.load(gig_id).await?;
        ensure_owner(requester, gig.created_by, "delete this gig")?;
        self.remove(gig).await
    }

    /// Moderation path: any gig, admin role required.
    pub async fn admin_delete(&self, gig_id: Uuid, requester: &Identity) -> AppResult<()> {
        ensure_admin(requester)?;
        let gig = self.load(gig_id).await?;
        self.remove(gig).await?;
        info!(%gig_id, admin = %requester.id, "Gig removed by admin");
        Ok(())
    }

    async fn remove(&self, gig: gigs::Model) -> AppResult<()> {
        if !self.deps.store.delete_gig(gig.id).await? {
            return Err(AppError::not_found("Gig", gig.id));
        }
        info!(gig_id = %gig.id, "Gig deleted");
        self.deps.invalidate_gig(gig.id, gig.created_by).await;
        Ok(())
    }

    pub async fn toggle_contact_visibility(
        &self,
        gig_id: Uuid,
        requester: &Identity,
        display: bool,
    ) -> AppResult<GigResponse> {
        let gig = self.load(gig_id).await?;
        ensure_owner(requester, gig.created_by, "change contact visibility")?;

        let changes = GigChanges {
            display_contact_links: Some(display),
            ..GigChanges::default()
        };
        let updated = self
            .deps
            .store
            .update_gig(gig_id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("Gig", gig_id))?;

        cache::forget(self.deps.cache.as_ref(), &keys::gig(gig_id)).await;
        Ok(GigResponse::from(updated))
    }

    /// One page of open gigs, newest first. `page` is 1-based.
    pub async fn read_listing(&self, page: u64, page_size: u64) -> AppResult<GigPage> {
        let page = page.clamp(1, MAX_PAGE);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let key = keys::gig_list(page, page_size);
        let cache = self.deps.cache.as_ref();

        if let Some(cached) = cache::get_json::<GigPage>(cache, &key).await {
            debug!(key, "Gig listing cache hit");
            return Ok(cached);
        }

        let (items, total) = self
            .deps
            .store
            .open_gigs(Utc::now(), page, page_size)
            .await?;
        let listing = GigPage {
            items: items.into_iter().map(GigResponse::from).collect(),
            page,
            page_size,
            total,
        };

        cache::set_tracked(
            cache,
            keys::GIG_LIST_KEYS,
            &key,
            &listing,
            self.deps.ttl.gig_list_ttl,
        )
        .await;
        Ok(listing)
    }

    pub async fn read_gig(&self, gig_id: Uuid) -> AppResult<GigResponse> {
        let key = keys::gig(gig_id);
        let cache = self.deps.cache.as_ref();
        if let Some(cached) = cache::get_json::<GigResponse>(cache, &key).await {
            return Ok(cached);
        }

        let gig = GigResponse::from(self.load(gig_id).await?);
        cache::set_json(cache, &key, &gig, self.deps.ttl.gig_ttl).await;
        Ok(gig)
    }

    pub async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<GigResponse>> {
        let key = keys::user_gigs(owner_id);
        let cache = self.deps.cache.as_ref();
        if let Some(cached) = cache::get_json::<Vec<GigResponse>>(cache, &key).await {
            return Ok(cached);
        }

        let gigs: Vec<GigResponse> = self
            .deps
            .store
            .gigs_by_owner(owner_id)
            .await?
            .into_iter()
            .map(GigResponse::from)
            .collect();
        cache::set_json(cache, &key, &gigs, self.deps.ttl.gig_list_ttl).await;
        Ok(gigs)
    }

    pub async fn report(&self, gig_id: Uuid, reporter: &Identity) -> AppResult<GigResponse> {
        let gig = self.load(gig_id).await?;
        if gig.created_by == reporter.id {
            return Err(AppError::validation("You cannot report your own gig"));
        }

        let reported = self
            .deps
            .store
            .report_gig(gig_id, self.report_flag_threshold)
            .await?
            .ok_or_else(|| AppError::not_found("Gig", gig_id))?;

        if reported.is_flagged && !gig.is_flagged {
            info!(%gig_id, reports = reported.report_count, "Gig flagged for moderation");
        }
        cache::forget(self.deps.cache.as_ref(), &keys::gig(gig_id)).await;
        Ok(GigResponse::from(reported))
    }

    async fn load(&self, gig_id: Uuid) -> AppResult<gigs::Model> {
        self.deps
            .store
            .find_gig(gig_id)
            .await?
            .ok_or_else(|| AppError::not_found("Gig", gig_id))
    }
}

fn required_text(value: Option<String>, field: &str) -> AppResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(format!("{field} is required"))),
    }
}

fn clean_skills(skills: Vec<String>) -> AppResult<Vec<String>> {
    let skills: Vec<String> = skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if skills.is_empty() {
        return Err(AppError::validation("At least one skill is required"));
    }
    Ok(skills)
}

fn check_budget(budget: f64) -> AppResult<f64> {
    if budget.is_finite() && budget >= 0.0 {
        Ok(budget)
    } else {
        Err(AppError::validation("budget must be a non-negative number"))
    }
}

fn validate_new_gig(owner_id: Uuid, input: CreateGig, now: DateTime<Utc>) -> AppResult<NewGig> {
    let title = required_text(input.title, "title")?;
    let description = required_text(input.description, "description")?;
    let skills_required = clean_skills(input.skills_required)?;
    let budget = check_budget(
        input
            .budget
            .ok_or_else(|| AppError::validation("budget is required"))?,
    )?;
    let contact = input
        .contact
        .ok_or_else(|| AppError::validation("contact is required"))?;
    let expires_at = input
        .expires_at
        .ok_or_else(|| AppError::validation("expires_at is required"))?;
    if expires_at <= now {
        return Err(AppError::validation("expires_at must be in the future"));
    }

    Ok(NewGig {
        title,
        description,
        created_by: owner_id,
        skills_required,
        contact,
        display_contact_links: input.display_contact_links,
        budget,
        expires_at,
    })
}

/// Split an owner edit into field changes and an optional status transition.
fn validate_edit(
    gig: &gigs::Model,
    input: UpdateGig,
) -> AppResult<(GigChanges, Option<GigStatus>)> {
    let transition = match input.status {
        None => None,
        Some(to) if to == gig.status => None,
        Some(GigStatus::Completed) => {
            return Err(AppError::conflict("A gig is completed by accepting a ping"));
        }
        Some(to) if gig.status.can_transition_to(to) => Some(to),
        Some(to) => {
            return Err(AppError::conflict(format!(
                "Cannot move a gig from {} to {}",
                gig.status.as_str(),
                to.as_str()
            )));
        }
    };

    let changes = GigChanges {
        title: input
            .title
            .map(|t| required_text(Some(t), "title"))
            .transpose()?,
        description: input
            .description
            .map(|d| required_text(Some(d), "description"))
            .transpose()?,
        budget: input.budget.map(check_budget).transpose()?,
        expires_at: input.expires_at,
        skills_required: input.skills_required.map(clean_skills).transpose()?,
        contact: input.contact,
        display_contact_links: None,
    };
    Ok((changes, transition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_input(now: DateTime<Utc>) -> CreateGig {
        CreateGig {
            title: Some("  Logo design ".to_string()),
            description: Some("A new logo".to_string()),
            skills_required: vec!["figma".to_string(), "  ".to_string()],
            budget: Some(150.0),
            contact: Some(Default::default()),
            display_contact_links: false,
            expires_at: Some(now + Duration::days(3)),
        }
    }

    #[test]
    fn new_gig_is_trimmed_and_blank_skills_dropped() {
        let now = Utc::now();
        let gig = validate_new_gig(Uuid::new_v4(), create_input(now), now).unwrap();
        assert_eq!(gig.title, "Logo design");
        assert_eq!(gig.skills_required, vec!["figma".to_string()]);
    }

    #[test]
    fn new_gig_rejects_bad_fields() {
        let now = Utc::now();
        let owner = Uuid::new_v4();

        let mut input = create_input(now);
        input.budget = Some(f64::NAN);
        assert!(matches!(validate_new_gig(owner, input, now), Err(AppError::Validation(_))));

        let mut input = create_input(now);
        input.expires_at = Some(now - Duration::minutes(1));
        assert!(matches!(validate_new_gig(owner, input, now), Err(AppError::Validation(_))));

        let mut input = create_input(now);
        input.skills_required = vec![" ".to_string()];
        assert!(matches!(validate_new_gig(owner, input, now), Err(AppError::Validation(_))));

        let mut input = create_input(now);
        input.contact = None;
        assert!(matches!(validate_new_gig(owner, input, now), Err(AppError::Validation(_))));
    }
}
