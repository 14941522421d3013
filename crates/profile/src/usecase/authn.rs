use std::sync::Arc;

use app_core::error::AppError;
use app_core::identity::TokenVerifier;
use async_trait::async_trait;

use crate::domain::inout::prelude::*;

const TOKEN_REQUIRED_MSG: &str = "Token is required";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthnUseCase: Send + Sync {
    async fn verify_token(&self, input: VerifyTokenInput) -> Result<VerifyTokenOutput, AppError>;
}

pub struct AuthnService {
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthnService {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl AuthnUseCase for AuthnService {
    async fn verify_token(&self, input: VerifyTokenInput) -> Result<VerifyTokenOutput, AppError> {
        let Some(token) = input.token.filter(|t| !t.is_empty()) else {
            tracing::warn!("Token verification requested without a token");
            return Err(AppError::Unauthorized(TOKEN_REQUIRED_MSG.to_string()));
        };

        let identity = self.verifier.verify(&token).await?;
        tracing::info!(uid = %identity.uid, "Token verified");

        Ok(VerifyTokenOutput { identity })
    }
}
