use uuid::Uuid;

use crate::auth::Identity;
use crate::error::{AppError, AppResult};

/// Strict ownership: the requester must be the resource owner.
pub fn ensure_owner(identity: &Identity, owner_id: Uuid, action: &str) -> AppResult<()> {
    if identity.id == owner_id {
        Ok(())
    } else {
        Err(AppError::forbidden(format!("Only the owner can {action}")))
    }
}

/// Ownership, or the `admin` role.
pub fn ensure_owner_or_admin(identity: &Identity, owner_id: Uuid, action: &str) -> AppResult<()> {
    if identity.id == owner_id || identity.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Only the owner or an admin can {action}"
        )))
    }
}

pub fn ensure_admin(identity: &Identity) -> AppResult<()> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Admin access required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::Roles;

    fn identity(role: Roles) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "someone@x.com".to_string(),
            name: "someone".to_string(),
            role,
            activity_public: true,
        }
    }

    #[test]
    fn owner_check_is_plain_equality() {
        let me = identity(Roles::Client);
        assert!(ensure_owner(&me, me.id, "edit this gig").is_ok());
        assert!(matches!(
            ensure_owner(&me, Uuid::new_v4(), "edit this gig"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admins_pass_the_override_check_only() {
        let admin = identity(Roles::Admin);
        let other = Uuid::new_v4();
        assert!(ensure_owner_or_admin(&admin, other, "delete this gig").is_ok());
        assert!(ensure_owner(&admin, other, "edit this gig").is_err());
        assert!(ensure_admin(&admin).is_ok());
        assert!(ensure_admin(&identity(Roles::Freelancer)).is_err());
    }
}
