use std::sync::Arc;

use app_core::error::AppError;
use app_core::time;
use app_orm::prelude::UserProfiles;
use app_orm::user_profiles;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, SqlErr, TransactionTrait,
};

use super::repository::ProfileRepository;
use crate::domain::entity::profile::{CreateOutcome, Profile, ProfileChanges};

const PROFILE_NOT_FOUND_MSG: &str = "Profile not found";
const CREATE_FAILED_MSG: &str = "An error occurred while creating the profile";
const UPDATE_FAILED_MSG: &str = "An error occurred while updating the profile";
const DELETE_FAILED_MSG: &str = "An error occurred while deleting the profile";

/// sea-orm backed [`ProfileRepository`].
///
/// Every mutation runs in its own transaction. On failure the transaction is
/// rolled back explicitly before the error is returned.
pub struct ProfileORM {
    db: Arc<DatabaseConnection>,
}

impl ProfileORM {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn to_profile(&self, model: user_profiles::Model) -> Profile {
        Profile {
            id: model.id,
            external_uid: model.external_uid,
            display_name: model.display_name,
            bio: model.bio,
            location: model.location,
            website: model.website,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    fn apply_changes(changes: &ProfileChanges, model: &mut user_profiles::ActiveModel) {
        if let Some(value) = &changes.display_name {
            model.display_name = ActiveValue::Set(value.clone());
        }
        if let Some(value) = &changes.bio {
            model.bio = ActiveValue::Set(value.clone());
        }
        if let Some(value) = &changes.location {
            model.location = ActiveValue::Set(value.clone());
        }
        if let Some(value) = &changes.website {
            model.website = ActiveValue::Set(value.clone());
        }
    }

    async fn begin(&self, failure_msg: &str) -> Result<DatabaseTransaction, AppError> {
        self.db.begin().await.map_err(|err| AppError::database(failure_msg, err))
    }

    async fn commit(txn: DatabaseTransaction, failure_msg: &str) -> Result<(), AppError> {
        txn.commit().await.map_err(|err| AppError::database(failure_msg, err))
    }

    async fn rollback(txn: DatabaseTransaction) {
        if let Err(err) = txn.rollback().await {
            tracing::error!("Failed to roll back transaction: {:?}", err);
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err.to_string().contains("duplicate key value violates unique constraint")
}

#[async_trait]
impl ProfileRepository for ProfileORM {
    async fn find_by_external_uid(&self, external_uid: &str) -> Result<Option<Profile>, AppError> {
        let model = UserProfiles::find()
            .filter(user_profiles::Column::ExternalUid.eq(external_uid))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(|m| self.to_profile(m)))
    }

    async fn create(&self, external_uid: &str, changes: &ProfileChanges) -> Result<CreateOutcome, AppError> {
        let txn = self.begin(CREATE_FAILED_MSG).await?;
        let now = time::now();

        let mut model = user_profiles::ActiveModel {
            external_uid: ActiveValue::Set(external_uid.to_string()),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        Self::apply_changes(changes, &mut model);

        match model.insert(&txn).await {
            Ok(created) => {
                Self::commit(txn, CREATE_FAILED_MSG).await?;
                Ok(CreateOutcome::Created(self.to_profile(created)))
            },
            Err(err) if is_unique_violation(&err) => {
                Self::rollback(txn).await;
                tracing::info!(external_uid, "Profile was created concurrently");
                Ok(CreateOutcome::AlreadyExists)
            },
            Err(err) => {
                Self::rollback(txn).await;
                Err(AppError::database(CREATE_FAILED_MSG, err))
            },
        }
    }

    async fn update(&self, id: i32, changes: &ProfileChanges) -> Result<Profile, AppError> {
        let txn = self.begin(UPDATE_FAILED_MSG).await?;

        let result: Result<Option<user_profiles::Model>, DbErr> = async {
            let Some(current) = UserProfiles::find_by_id(id).one(&txn).await? else {
                return Ok(None);
            };

            let mut model: user_profiles::ActiveModel = current.into();
            Self::apply_changes(changes, &mut model);
            model.updated_at = ActiveValue::Set(time::now());

            model.update(&txn).await.map(Some)
        }
        .await;

        match result {
            Ok(Some(updated)) => {
                Self::commit(txn, UPDATE_FAILED_MSG).await?;
                Ok(self.to_profile(updated))
            },
            Ok(None) => {
                Self::rollback(txn).await;
                Err(AppError::NotFound(PROFILE_NOT_FOUND_MSG.to_string()))
            },
            Err(err) => {
                Self::rollback(txn).await;
                Err(AppError::database(UPDATE_FAILED_MSG, err))
            },
        }
    }

    async fn delete(&self, id: i32) -> Result<(), AppError> {
        let txn = self.begin(DELETE_FAILED_MSG).await?;

        match UserProfiles::delete_by_id(id).exec(&txn).await {
            Ok(res) if res.rows_affected == 0 => {
                Self::rollback(txn).await;
                Err(AppError::NotFound(PROFILE_NOT_FOUND_MSG.to_string()))
            },
            Ok(_) => Self::commit(txn, DELETE_FAILED_MSG).await,
            Err(err) => {
                Self::rollback(txn).await;
                Err(AppError::database(DELETE_FAILED_MSG, err))
            },
        }
    }
}
