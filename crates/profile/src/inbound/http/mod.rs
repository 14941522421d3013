pub mod authn;
pub mod index;
pub mod profile;
