use chrono::{DateTime, Utc};

/// A user's profile, keyed by the identity provider's `uid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: i32,
    pub external_uid: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field-level changes to a profile.
///
/// The outer `Option` says whether the field was sent at all; the inner one
/// carries the new value, where `None` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub display_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub website: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.bio.is_none() && self.location.is_none() && self.website.is_none()
    }

    pub fn apply(&self, profile: &mut Profile) {
        if let Some(value) = &self.display_name {
            profile.display_name = value.clone();
        }
        if let Some(value) = &self.bio {
            profile.bio = value.clone();
        }
        if let Some(value) = &self.location {
            profile.location = value.clone();
        }
        if let Some(value) = &self.website {
            profile.website = value.clone();
        }
    }
}

/// Result of inserting a profile whose `external_uid` may already be taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Profile),
    AlreadyExists,
}
