pub mod authorization;
pub mod jwks;
pub mod jwt;
pub mod middleware;

use serde::Serialize;
use uuid::Uuid;

use crate::models::users::{self, Roles};

/// The verified caller, as seen by the services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Roles,
    pub activity_public: bool,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Roles::Admin
    }
}

impl From<&users::Model> for Identity {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.public_name(),
            role: user.role,
            activity_public: user.activity_public,
        }
    }
}
