pub use super::user_profiles::Entity as UserProfiles;
