use std::borrow::Cow;

use app_core::error::AppError;
use serde::Serialize;
use serde_json::{Map, Value};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::domain::entity::profile::Profile;
use crate::domain::inout::prelude::UpdateProfileInput;

pub const NO_UPDATE_DATA_MSG: &str = "No data provided for update";

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: i32,
    pub external_uid: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            external_uid: profile.external_uid,
            display_name: profile.display_name,
            bio: profile.bio,
            location: profile.location,
            website: profile.website,
            created_at: profile.created_at.to_rfc3339(),
            updated_at: profile.updated_at.to_rfc3339(),
        }
    }
}

// ╔════════════════════════════╗
// ║    Get Profile             ║
// ╚════════════════════════════╝

#[derive(Serialize)]
pub struct GetProfileResponse {
    pub success: bool,
    pub profile: ProfileResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

// ╔════════════════════════════╗
// ║    Update Profile          ║
// ╚════════════════════════════╝

const UPDATABLE_FIELDS: [&str; 4] = ["display_name", "bio", "location", "website"];

/// Raw body of `PUT /api/profile`.
///
/// Absent fields are left untouched and `null` clears a field. Non-string
/// values, unknown fields and length violations are reported together in a
/// single validation error.
#[derive(Debug)]
pub struct UpdateProfileRequest(pub Value);

impl UpdateProfileRequest {
    pub fn into_input(self, external_uid: String) -> Result<UpdateProfileInput, AppError> {
        let fields = match self.0 {
            Value::Object(fields) if !fields.is_empty() => fields,
            _ => return Err(AppError::BadRequest(NO_UPDATE_DATA_MSG.to_string())),
        };

        let mut errors = ValidationErrors::new();
        for key in fields.keys().filter(|key| !UPDATABLE_FIELDS.contains(&key.as_str())) {
            errors
                .errors_mut()
                .insert(Cow::Owned(key.clone()), ValidationErrorsKind::Field(vec![field_error("unknown", "Unknown field.")]));
        }

        let input = UpdateProfileInput {
            external_uid,
            display_name: string_field(&fields, "display_name", &mut errors),
            bio: string_field(&fields, "bio", &mut errors),
            location: string_field(&fields, "location", &mut errors),
            website: string_field(&fields, "website", &mut errors),
        };

        // Fields with a type error are None here, so the two sets never overlap.
        if let Err(length_errors) = input.validate() {
            errors.errors_mut().extend(length_errors.into_errors());
        }

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(input)
    }
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn string_field(
    fields: &Map<String, Value>,
    name: &'static str,
    errors: &mut ValidationErrors,
) -> Option<Option<String>> {
    match fields.get(name)? {
        Value::Null => Some(None),
        Value::String(value) => Some(Some(value.clone())),
        _ => {
            errors.add(name, field_error("type", "Not a valid string."));
            None
        },
    }
}

#[derive(Serialize)]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub profile: ProfileResponse,
    pub message: &'static str,
}

// ╔════════════════════════════╗
// ║    Delete Profile          ║
// ╚════════════════════════════╝

#[derive(Serialize)]
pub struct DeleteProfileResponse {
    pub success: bool,
    pub message: &'static str,
}
