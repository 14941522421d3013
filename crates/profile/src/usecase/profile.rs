use std::sync::Arc;

use app_core::error::AppError;
use async_trait::async_trait;
use validator::Validate;

use crate::domain::entity::profile::{CreateOutcome, Profile, ProfileChanges};
use crate::domain::inout::prelude::*;
use crate::outbound::repository::ProfileRepository;

const PROFILE_NOT_FOUND_MSG: &str = "Profile not found";
const PROFILE_VANISHED_MSG: &str = "The profile could not be loaded after a concurrent create";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileUseCase: Send + Sync {
    async fn get_profile(&self, input: GetProfileInput) -> Result<GetProfileOutput, AppError>;
    async fn update_profile(&self, input: UpdateProfileInput) -> Result<UpdateProfileOutput, AppError>;
    async fn delete_profile(&self, input: DeleteProfileInput) -> Result<DeleteProfileOutput, AppError>;
}

#[derive(Clone)]
pub struct ProfileService {
    repo: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    pub fn new(repo: Arc<dyn ProfileRepository>) -> Self {
        Self { repo }
    }

    /// Re-reads the row that won a concurrent insert.
    async fn winner_of_race(&self, external_uid: &str) -> Result<Profile, AppError> {
        self.repo.find_by_external_uid(external_uid).await?.ok_or_else(|| {
            tracing::error!(external_uid, "Profile reported as existing but not found");
            AppError::Database(PROFILE_VANISHED_MSG.to_string())
        })
    }
}

#[async_trait]
impl ProfileUseCase for ProfileService {
    async fn get_profile(&self, input: GetProfileInput) -> Result<GetProfileOutput, AppError> {
        if let Some(profile) = self.repo.find_by_external_uid(&input.external_uid).await? {
            return Ok(GetProfileOutput { profile, created: false });
        }

        tracing::info!(external_uid = %input.external_uid, "Creating profile on first access");

        match self.repo.create(&input.external_uid, &ProfileChanges::default()).await? {
            CreateOutcome::Created(profile) => Ok(GetProfileOutput { profile, created: true }),
            CreateOutcome::AlreadyExists => {
                let profile = self.winner_of_race(&input.external_uid).await?;
                Ok(GetProfileOutput { profile, created: false })
            },
        }
    }

    async fn update_profile(&self, input: UpdateProfileInput) -> Result<UpdateProfileOutput, AppError> {
        input.validate()?;

        let changes = input.changes();
        if changes.is_empty() {
            return Err(AppError::BadRequest("No data provided for update".to_string()));
        }

        let existing = match self.repo.find_by_external_uid(&input.external_uid).await? {
            Some(profile) => profile,
            None => match self.repo.create(&input.external_uid, &changes).await? {
                CreateOutcome::Created(profile) => {
                    tracing::info!(external_uid = %input.external_uid, "Profile created by update");
                    return Ok(UpdateProfileOutput { profile });
                },
                CreateOutcome::AlreadyExists => self.winner_of_race(&input.external_uid).await?,
            },
        };

        let profile = self.repo.update(existing.id, &changes).await?;

        tracing::info!(external_uid = %input.external_uid, "Profile updated");

        Ok(UpdateProfileOutput { profile })
    }

    async fn delete_profile(&self, input: DeleteProfileInput) -> Result<DeleteProfileOutput, AppError> {
        let Some(profile) = self.repo.find_by_external_uid(&input.external_uid).await? else {
            tracing::warn!(external_uid = %input.external_uid, "No profile to delete");
            return Err(AppError::NotFound(PROFILE_NOT_FOUND_MSG.to_string()));
        };

        self.repo.delete(profile.id).await?;

        tracing::info!(external_uid = %input.external_uid, "Profile deleted");

        Ok(DeleteProfileOutput { success: true })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::eq;

    use super::*;
    use crate::outbound::repository::MockProfileRepository;

    fn profile(id: i32) -> Profile {
        let now = Utc::now();
        Profile {
            id,
            external_uid: "user-123".to_string(),
            display_name: None,
            bio: Some("Test bio".to_string()),
            location: None,
            website: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn update_input() -> UpdateProfileInput {
        UpdateProfileInput {
            external_uid: "user-123".to_string(),
            display_name: Some(Some("Updated Name".to_string())),
            bio: None,
            location: Some(Some("Tokyo".to_string())),
            website: None,
        }
    }

    #[tokio::test]
    async fn test_get_profile_existing() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_by_external_uid().withf(|uid| uid == "user-123").times(1).returning(|_| Ok(Some(profile(1))));
        repo.expect_create().never();
        let svc = ProfileService::new(Arc::new(repo));

        let output = svc.get_profile(GetProfileInput { external_uid: "user-123".to_string() }).await.unwrap();

        assert_eq!(output.profile.id, 1);
        assert!(!output.created);
    }

    #[tokio::test]
    async fn test_get_profile_creates_empty_profile() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_by_external_uid().times(1).returning(|_| Ok(None));
        repo.expect_create()
            .withf(|uid, changes| uid == "user-123" && changes.is_empty())
            .times(1)
            .returning(|_, _| Ok(CreateOutcome::Created(profile(5))));
        let svc = ProfileService::new(Arc::new(repo));

        let output = svc.get_profile(GetProfileInput { external_uid: "user-123".to_string() }).await.unwrap();

        assert_eq!(output.profile.id, 5);
        assert!(output.created);
    }

    #[tokio::test]
    async fn test_get_profile_lost_create_race_fetches_winner() {
        let mut repo = MockProfileRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_find_by_external_uid().times(1).in_sequence(&mut seq).returning(|_| Ok(None));
        repo.expect_create().times(1).in_sequence(&mut seq).returning(|_, _| Ok(CreateOutcome::AlreadyExists));
        repo.expect_find_by_external_uid().times(1).in_sequence(&mut seq).returning(|_| Ok(Some(profile(9))));
        let svc = ProfileService::new(Arc::new(repo));

        let output = svc.get_profile(GetProfileInput { external_uid: "user-123".to_string() }).await.unwrap();

        assert_eq!(output.profile.id, 9);
        assert!(!output.created);
    }

    #[tokio::test]
    async fn test_get_profile_create_failure() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_by_external_uid().returning(|_| Ok(None));
        repo.expect_create().returning(|_, _| Err(AppError::Database("create failed".to_string())));
        let svc = ProfileService::new(Arc::new(repo));

        let err = svc.get_profile(GetProfileInput { external_uid: "user-123".to_string() }).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_update_profile_existing() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_by_external_uid().returning(|_| Ok(Some(profile(1))));
        repo.expect_update()
            .withf(|id, changes| {
                *id == 1
                    && changes.display_name == Some(Some("Updated Name".to_string()))
                    && changes.location == Some(Some("Tokyo".to_string()))
                    && changes.bio.is_none()
            })
            .times(1)
            .returning(|_, changes| {
                let mut p = profile(1);
                changes.apply(&mut p);
                Ok(p)
            });
        let svc = ProfileService::new(Arc::new(repo));

        let output = svc.update_profile(update_input()).await.unwrap();

        assert_eq!(output.profile.display_name.as_deref(), Some("Updated Name"));
        assert_eq!(output.profile.location.as_deref(), Some("Tokyo"));
        assert_eq!(output.profile.bio.as_deref(), Some("Test bio"));
    }

    #[tokio::test]
    async fn test_update_profile_creates_missing_profile() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_by_external_uid().returning(|_| Ok(None));
        repo.expect_create().times(1).returning(|_, changes| {
            let mut p = profile(3);
            p.bio = None;
            changes.apply(&mut p);
            Ok(CreateOutcome::Created(p))
        });
        repo.expect_update().never();
        let svc = ProfileService::new(Arc::new(repo));

        let output = svc.update_profile(update_input()).await.unwrap();

        assert_eq!(output.profile.id, 3);
        assert_eq!(output.profile.display_name.as_deref(), Some("Updated Name"));
    }

    #[tokio::test]
    async fn test_update_profile_lost_create_race_updates_winner() {
        let mut repo = MockProfileRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_find_by_external_uid().times(1).in_sequence(&mut seq).returning(|_| Ok(None));
        repo.expect_create().times(1).in_sequence(&mut seq).returning(|_, _| Ok(CreateOutcome::AlreadyExists));
        repo.expect_find_by_external_uid().times(1).in_sequence(&mut seq).returning(|_| Ok(Some(profile(4))));
        repo.expect_update().withf(|id, _| *id == 4).times(1).in_sequence(&mut seq).returning(|_, changes| {
            let mut p = profile(4);
            changes.apply(&mut p);
            Ok(p)
        });
        let svc = ProfileService::new(Arc::new(repo));

        let output = svc.update_profile(update_input()).await.unwrap();

        assert_eq!(output.profile.id, 4);
    }

    #[tokio::test]
    async fn test_update_profile_validation_error() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_by_external_uid().never();
        let svc = ProfileService::new(Arc::new(repo));

        let input = UpdateProfileInput { display_name: Some(Some("x".repeat(101))), ..update_input() };
        let err = svc.update_profile(input).await.unwrap_err();

        match err {
            AppError::Validation(errors) => assert!(errors.field_errors().contains_key("display_name")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_profile_without_changes() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_by_external_uid().never();
        let svc = ProfileService::new(Arc::new(repo));

        let input = UpdateProfileInput {
            external_uid: "user-123".to_string(),
            display_name: None,
            bio: None,
            location: None,
            website: None,
        };
        let err = svc.update_profile(input).await.unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_profile() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_by_external_uid().returning(|_| Ok(Some(profile(2))));
        repo.expect_delete().with(eq(2)).times(1).returning(|_| Ok(()));
        let svc = ProfileService::new(Arc::new(repo));

        let output = svc.delete_profile(DeleteProfileInput { external_uid: "user-123".to_string() }).await.unwrap();

        assert!(output.success);
    }

    #[tokio::test]
    async fn test_delete_profile_not_found() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_by_external_uid().returning(|_| Ok(None));
        repo.expect_delete().never();
        let svc = ProfileService::new(Arc::new(repo));

        let err = svc.delete_profile(DeleteProfileInput { external_uid: "user-123".to_string() }).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(msg) if msg == PROFILE_NOT_FOUND_MSG));
    }

    #[tokio::test]
    async fn test_delete_profile_database_error() {
        let mut repo = MockProfileRepository::new();
        repo.expect_find_by_external_uid().returning(|_| Ok(Some(profile(2))));
        repo.expect_delete().returning(|_| Err(AppError::Database("delete failed".to_string())));
        let svc = ProfileService::new(Arc::new(repo));

        let err = svc.delete_profile(DeleteProfileInput { external_uid: "user-123".to_string() }).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
    }
}
