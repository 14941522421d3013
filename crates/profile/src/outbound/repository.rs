use app_core::error::AppError;
use async_trait::async_trait;

use crate::domain::entity::profile::{CreateOutcome, Profile, ProfileChanges};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Looks up the profile owned by the given identity-provider `uid`.
    async fn find_by_external_uid(&self, external_uid: &str) -> Result<Option<Profile>, AppError>;

    /// Inserts a new profile with `changes` applied.
    ///
    /// Returns [`CreateOutcome::AlreadyExists`] when a concurrent request
    /// created the profile first.
    async fn create(&self, external_uid: &str, changes: &ProfileChanges) -> Result<CreateOutcome, AppError>;

    /// Applies `changes` to an existing profile and refreshes `updated_at`.
    ///
    /// Fails with `NotFound` when the profile disappeared in the meantime.
    async fn update(&self, id: i32, changes: &ProfileChanges) -> Result<Profile, AppError>;

    async fn delete(&self, id: i32) -> Result<(), AppError>;
}
