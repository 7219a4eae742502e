//! Credential verification (spec §4.9 step 2): the dispatcher calls a
//! host-supplied `CredentialVerifier` and attaches the resulting
//! `AuthContext` to the request; it never parses or validates the
//! credential itself.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: String,
    pub role: String,
}

impl AuthContext {
    pub fn new(principal: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            role: role.into(),
        }
    }
}

/// A raw credential as handed to the dispatcher by a transport (a bearer
/// token, an API key, ...). Transports attach this to a request's metadata;
/// the dispatcher never interprets the bytes itself.
#[derive(Debug, Clone, Default)]
pub struct Credential(pub Option<String>);

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credential: &Credential) -> Option<AuthContext>;
}

/// Accepts every request as an anonymous principal. The default when a
/// host registers no verifier — matching how every other component in
/// this workspace treats "no configuration" as "no-op".
pub struct AllowAllVerifier;

#[async_trait]
impl CredentialVerifier for AllowAllVerifier {
    async fn verify(&self, _credential: &Credential) -> Option<AuthContext> {
        Some(AuthContext::new("anonymous", "default"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allow_all_accepts_empty_credential() {
        let ctx = AllowAllVerifier.verify(&Credential(None)).await.unwrap();
        assert_eq!(ctx.principal, "anonymous");
    }
}
