use validator::Validate;

use crate::domain::entity::profile::{Profile, ProfileChanges};

// ╔════════════════════════════╗
// ║        Get Profile         ║
// ╚════════════════════════════╝

#[derive(Debug)]
pub struct GetProfileInput {
    pub external_uid: String,
}

#[derive(Debug)]
pub struct GetProfileOutput {
    pub profile: Profile,
    /// Set when this call created the profile.
    pub created: bool,
}

// ╔════════════════════════════╗
// ║      Update Profile        ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct UpdateProfileInput {
    pub external_uid: String,

    #[validate(length(min = 1, max = 100, message = "Length must be between 1 and 100."))]
    pub display_name: Option<Option<String>>,

    #[validate(length(max = 500, message = "Longer than maximum length 500."))]
    pub bio: Option<Option<String>>,

    #[validate(length(max = 100, message = "Longer than maximum length 100."))]
    pub location: Option<Option<String>>,

    #[validate(length(max = 255, message = "Longer than maximum length 255."))]
    pub website: Option<Option<String>>,
}

impl UpdateProfileInput {
    pub fn changes(&self) -> ProfileChanges {
        ProfileChanges {
            display_name: self.display_name.clone(),
            bio: self.bio.clone(),
            location: self.location.clone(),
            website: self.website.clone(),
        }
    }
}

#[derive(Debug)]
pub struct UpdateProfileOutput {
    pub profile: Profile,
}

// ╔════════════════════════════╗
// ║      Delete Profile        ║
// ╚════════════════════════════╝

#[derive(Debug)]
pub struct DeleteProfileInput {
    pub external_uid: String,
}

#[derive(Debug)]
pub struct DeleteProfileOutput {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> UpdateProfileInput {
        UpdateProfileInput {
            external_uid: "user-123".to_string(),
            display_name: None,
            bio: None,
            location: None,
            website: None,
        }
    }

    #[test]
    fn test_validate_lengths() {
        let ok = UpdateProfileInput { display_name: Some(Some("a".repeat(100))), ..input() };
        assert!(ok.validate().is_ok());

        let too_long = UpdateProfileInput { display_name: Some(Some("a".repeat(101))), ..input() };
        let errors = too_long.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("display_name"));

        let empty = UpdateProfileInput { display_name: Some(Some(String::new())), ..input() };
        assert!(empty.validate().is_err());

        let bio = UpdateProfileInput { bio: Some(Some("b".repeat(501))), ..input() };
        assert!(bio.validate().unwrap_err().field_errors().contains_key("bio"));
    }

    #[test]
    fn test_validate_allows_clearing() {
        let cleared = UpdateProfileInput { display_name: Some(None), website: Some(None), ..input() };

        assert!(cleared.validate().is_ok());
        assert_eq!(cleared.changes().display_name, Some(None));
        assert_eq!(cleared.changes().bio, None);
    }
}
