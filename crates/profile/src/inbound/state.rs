use std::sync::Arc;

use crate::usecase::authn::AuthnUseCase;
use crate::usecase::profile::ProfileUseCase;

#[derive(Clone)]
pub struct ProfileState {
    /// Reported by the index endpoint.
    pub version: Arc<str>,
    pub authn: Arc<dyn AuthnUseCase>,
    pub profile: Arc<dyn ProfileUseCase>,
}

impl ProfileState {
    pub fn new(version: impl Into<Arc<str>>, authn: Arc<dyn AuthnUseCase>, profile: Arc<dyn ProfileUseCase>) -> Self {
        Self { version: version.into(), authn, profile }
    }
}
