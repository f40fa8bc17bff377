use tracing::info;
use uuid::Uuid;

use super::Deps;
use crate::auth::Identity;
use crate::auth::authorization::ensure_owner;
use crate::cache::{self, keys};
use crate::error::{AppError, AppResult};
use crate::models::users::{CompleteProfile, Roles, UpdateProfile, UserResponse};

/// Self-service profile reads and edits.
#[derive(Clone)]
pub struct Profiles {
    deps: Deps,
}

impl Profiles {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    pub async fn fetch(&self, user_id: Uuid) -> AppResult<UserResponse> {
        let key = keys::user(user_id);
        let cache = self.deps.cache.as_ref();
        if let Some(cached) = cache::get_json::<UserResponse>(cache, &key).await {
            return Ok(cached);
        }

        let user = self
            .deps
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))?;
        let user = UserResponse::from(user);
        cache::set_json(cache, &key, &user, self.deps.ttl.user_ttl).await;
        Ok(user)
    }

    pub async fn edit(
        &self,
        user_id: Uuid,
        requester: &Identity,
        mut input: UpdateProfile,
    ) -> AppResult<UserResponse> {
        ensure_owner(requester, user_id, "edit this profile")?;
        check_role(input.role)?;
        input.username = clean_username(input.username)?;
        input.skills = input.skills.map(|skills| {
            skills
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let user = self
            .deps
            .store
            .update_profile(user_id, input)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))?;
        cache::forget(self.deps.cache.as_ref(), &keys::user(user_id)).await;
        info!(%user_id, "Profile updated");
        Ok(UserResponse::from(user))
    }

    /// First-login onboarding: username, role, display details.
    pub async fn complete(
        &self,
        requester: &Identity,
        mut input: CompleteProfile,
    ) -> AppResult<UserResponse> {
        check_role(input.role)?;
        input.username = clean_username(input.username)?;

        let user = self
            .deps
            .store
            .complete_profile(requester.id, input)
            .await?
            .ok_or_else(|| AppError::not_found("User", requester.id))?;
        cache::forget(self.deps.cache.as_ref(), &keys::user(requester.id)).await;
        Ok(UserResponse::from(user))
    }
}

fn check_role(role: Option<Roles>) -> AppResult<()> {
    match role {
        Some(Roles::Admin) => Err(AppError::forbidden("The admin role cannot be self-assigned")),
        _ => Ok(()),
    }
}

fn clean_username(username: Option<String>) -> AppResult<Option<String>> {
    match username.map(|u| u.trim().to_string()) {
        Some(u) if u.is_empty() => Err(AppError::validation("username cannot be blank")),
        Some(u) if !u.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') => Err(
            AppError::validation("username may only contain letters, digits, '_' and '-'"),
        ),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_trimmed_and_checked() {
        assert_eq!(
            clean_username(Some(" dev_sam ".to_string())).unwrap().as_deref(),
            Some("dev_sam")
        );
        assert!(clean_username(Some("  ".to_string())).is_err());
        assert!(clean_username(Some("sam smith".to_string())).is_err());
        assert_eq!(clean_username(None).unwrap(), None);
    }

    #[test]
    fn admin_role_is_not_self_service() {
        assert!(check_role(Some(Roles::Admin)).is_err());
        assert!(check_role(Some(Roles::Freelancer)).is_ok());
        assert!(check_role(None).is_ok());
    }
}
