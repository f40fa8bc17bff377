use tracing::info;

use super::Deps;
use crate::auth::Identity;
use crate::error::{AppError, AppResult};
use crate::models::feedback::{self, NewFeedback, SubmitFeedback};

pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Clone)]
pub struct FeedbackDesk {
    deps: Deps,
}

impl FeedbackDesk {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Accepts feedback from signed-in users and anonymous visitors alike.
    pub async fn submit(
        &self,
        sender: Option<&Identity>,
        input: SubmitFeedback,
    ) -> AppResult<feedback::Model> {
        let message = input.message.trim().to_string();
        if message.is_empty() {
            return Err(AppError::validation("message is required"));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::validation(format!(
                "message must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }
        if let Some(rating) = input.rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::validation("rating must be between 1 and 5"));
            }
        }

        let email = match sender {
            Some(identity) => Some(identity.email.clone()),
            None => input
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
        };

        let entry = self
            .deps
            .store
            .insert_feedback(NewFeedback {
                user_id: sender.map(|s| s.id),
                email,
                message,
                rating: input.rating,
            })
            .await?;
        info!(feedback_id = %entry.id, anonymous = sender.is_none(), "Feedback received");
        Ok(entry)
    }
}
