mod domain;
mod inbound;
mod outbound;
mod usecase;

use std::sync::Arc;

use app_core::identity::TokenVerifier;
pub use inbound::router::create_router;
pub use inbound::state::ProfileState;
use sea_orm::DatabaseConnection;

use crate::outbound::orm::ProfileORM;
use crate::usecase::authn::AuthnService;
use crate::usecase::profile::ProfileService;

pub struct Dependency {
    pub db: Arc<DatabaseConnection>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub version: String,
}

pub fn new(dep: Dependency) -> ProfileState {
    let repo = Arc::new(ProfileORM::new(dep.db));

    let authn_svc = Arc::new(AuthnService::new(dep.verifier));
    let profile_svc = Arc::new(ProfileService::new(repo));

    ProfileState::new(dep.version, authn_svc, profile_svc)
}
