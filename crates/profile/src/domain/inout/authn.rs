use app_core::identity::VerifiedIdentity;

// ╔════════════════════════════╗
// ║       Verify Token         ║
// ╚════════════════════════════╝

#[derive(Debug)]
pub struct VerifyTokenInput {
    pub token: Option<String>,
}

#[derive(Debug)]
pub struct VerifyTokenOutput {
    pub identity: VerifiedIdentity,
}
