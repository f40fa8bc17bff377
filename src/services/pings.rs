use chrono::Utc;
use futures_util::future::{join, try_join_all};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::Deps;
use crate::auth::Identity;
use crate::auth::authorization::ensure_owner_or_admin;
use crate::cache::keys;
use crate::effects::Effect;
use crate::error::{AppError, AppResult};
use crate::models::activities::{ActivityKind, NewActivity};
use crate::models::gigs::{GigResponse, GigStatus};
use crate::models::pings::{
    self, AcceptOutcome, NewPing, PingStatus, PingWithApplicant, SubmitPing,
};
use crate::models::users::PublicProfile;
use crate::notify::templates;
use crate::store::StoreError;

/// Committed acceptance, as returned to the gig owner.
#[derive(Debug, Clone, Serialize)]
pub struct Acceptance {
    pub ping: pings::Model,
    pub gig: GigResponse,
    /// Rival pings removed by the acceptance.
    pub discarded: u64,
}

/// Applications against gigs.
#[derive(Clone)]
pub struct PingManager {
    deps: Deps,
}

impl PingManager {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    pub async fn submit(&self, applicant: &Identity, input: SubmitPing) -> AppResult<pings::Model> {
        let message = input.message.trim().to_string();
        if message.is_empty() {
            return Err(AppError::validation("message is required"));
        }

        let store = &self.deps.store;
        let gig = store
            .find_gig(input.gig_id)
            .await?
            .ok_or_else(|| AppError::not_found("Gig", input.gig_id))?;

        let (poster, applicant_user) =
            join(store.find_user(gig.created_by), store.find_user(applicant.id)).await;
        let poster = poster?.ok_or_else(|| AppError::not_found("User", gig.created_by))?;
        let applicant_user =
            applicant_user?.ok_or_else(|| AppError::not_found("User", applicant.id))?;

        if gig.status != GigStatus::Active || gig.expires_at <= Utc::now() {
            return Err(AppError::conflict("This gig is no longer accepting pings"));
        }
        if gig.created_by == applicant.id {
            return Err(AppError::validation("You cannot ping your own gig"));
        }
        if store.ping_exists(gig.id, applicant.id).await? {
            return Err(AppError::conflict("You have already pinged this gig"));
        }

        let ping = store
            .insert_ping(NewPing {
                gig_id: gig.id,
                applicant_id: applicant.id,
                poster_id: gig.created_by,
                message,
                portfolio_link: non_blank(input.portfolio_link),
                portfolio_description: non_blank(input.portfolio_description),
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => AppError::conflict("You have already pinged this gig"),
                other => AppError::from(other),
            })?;
        info!(ping_id = %ping.id, gig_id = %gig.id, applicant = %applicant.id, "Ping submitted");

        let applicant_name = applicant_user.public_name();
        let mut effects = vec![Effect::Notify {
            to: poster.email.clone(),
            email: templates::new_ping(
                &poster.public_name(),
                &applicant_name,
                &gig.title,
                &ping.message,
            ),
            marker: Some(keys::ping_notified(gig.id, applicant.id)),
        }];
        if applicant_user.activity_public {
            effects.push(Effect::RecordActivity(NewActivity {
                kind: ActivityKind::Pings,
                actor_id: applicant.id,
                actor_name: applicant_name,
                gig_id: gig.id,
                gig_title: gig.title.clone(),
            }));
        }
        self.deps.effects.run(effects).await;

        Ok(ping)
    }

    pub async fn accept(
        &self,
        ping_id: Uuid,
        gig_id: Uuid,
        requester: &Identity,
    ) -> AppResult<Acceptance> {
        let store = &self.deps.store;
        store
            .find_ping(ping_id)
            .await?
            .filter(|p| p.gig_id == gig_id)
            .ok_or_else(|| AppError::not_found("Ping", ping_id))?;
        let gig = store
            .find_gig(gig_id)
            .await?
            .ok_or_else(|| AppError::not_found("Gig", gig_id))?;
        ensure_owner_or_admin(requester, gig.created_by, "accept pings on this gig")?;

        let (ping, gig, discarded) = match store.accept_ping(ping_id, gig_id).await? {
            AcceptOutcome::Accepted {
                ping,
                gig,
                discarded,
            } => (ping, gig, discarded),
            AcceptOutcome::GigNotActive => {
                return Err(AppError::conflict("This gig is no longer active"));
            }
            AcceptOutcome::Missing => return Err(AppError::not_found("Ping", ping_id)),
        };
        info!(%ping_id, %gig_id, applicant = %ping.applicant_id, discarded, "Ping accepted");

        self.deps.invalidate_gig(gig_id, gig.created_by).await;

        let (applicant, poster) =
            join(store.find_user(ping.applicant_id), store.find_user(gig.created_by)).await;
        match applicant {
            Ok(Some(applicant)) => {
                let poster_name = match poster {
                    Ok(Some(poster)) => poster.public_name(),
                    _ => "The gig owner".to_string(),
                };
                let email =
                    templates::ping_accepted(&applicant.public_name(), &poster_name, &gig.title);
                self.deps
                    .effects
                    .run(vec![Effect::Notify {
                        to: applicant.email,
                        email,
                        marker: Some(keys::accept_notified(ping_id)),
                    }])
                    .await;
            }
            Ok(None) => warn!(%ping_id, "Accepted applicant no longer exists, skipping email"),
            Err(e) => warn!(%ping_id, error = %e, "Applicant lookup failed, skipping email"),
        }

        Ok(Acceptance {
            ping,
            gig: GigResponse::from(gig),
            discarded,
        })
    }

    /// Owner or admin rejection, or the applicant withdrawing their own ping.
    pub async fn reject(&self, ping_id: Uuid, requester: &Identity) -> AppResult<()> {
        let store = &self.deps.store;
        let ping = store
            .find_ping(ping_id)
            .await?
            .ok_or_else(|| AppError::not_found("Ping", ping_id))?;

        let (applicant, gig) =
            join(store.find_user(ping.applicant_id), store.find_gig(ping.gig_id)).await;
        let applicant =
            applicant?.ok_or_else(|| AppError::not_found("User", ping.applicant_id))?;
        let gig = gig?.ok_or_else(|| AppError::not_found("Gig", ping.gig_id))?;

        let withdrawal = requester.id == ping.applicant_id;
        if !withdrawal {
            ensure_owner_or_admin(requester, gig.created_by, "reject pings on this gig")?;
        }
        if ping.status == PingStatus::Accepted {
            return Err(AppError::conflict("An accepted ping cannot be removed"));
        }

        if !store.delete_ping(ping_id).await? {
            return Err(AppError::not_found("Ping", ping_id));
        }
        info!(%ping_id, gig_id = %gig.id, withdrawal, "Ping removed");

        if !withdrawal {
            self.deps
                .effects
                .run(vec![Effect::Notify {
                    to: applicant.email.clone(),
                    email: templates::ping_rejected(&applicant.public_name(), &gig.title),
                    marker: None,
                }])
                .await;
        }
        Ok(())
    }

    pub async fn check_pinged(&self, applicant_id: Uuid, gig_id: Uuid) -> AppResult<bool> {
        Ok(self.deps.store.ping_exists(gig_id, applicant_id).await?)
    }

    pub async fn fetch_for_gig(
        &self,
        gig_id: Uuid,
        requester: &Identity,
    ) -> AppResult<Vec<PingWithApplicant>> {
        let store = &self.deps.store;
        let gig = store
            .find_gig(gig_id)
            .await?
            .ok_or_else(|| AppError::not_found("Gig", gig_id))?;
        ensure_owner_or_admin(requester, gig.created_by, "view pings on this gig")?;

        let pings = store.pings_for_gig(gig_id).await?;
        let applicants =
            try_join_all(pings.iter().map(|p| store.find_user(p.applicant_id))).await?;

        Ok(pings
            .into_iter()
            .zip(applicants)
            .map(|(ping, applicant)| PingWithApplicant {
                ping,
                applicant: applicant.as_ref().map(PublicProfile::from),
            })
            .collect())
    }

    pub async fn list_mine(&self, applicant: &Identity) -> AppResult<Vec<pings::Model>> {
        Ok(self.deps.store.pings_by_applicant(applicant.id).await?)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
