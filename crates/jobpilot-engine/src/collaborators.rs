//! Traits the host application implements for the engine.
//!
//! The engine never owns user data, policies, or secrets; it asks these
//! collaborators at the moment of use. All three are object-safe so the
//! engine can hold them as trait objects.

use async_trait::async_trait;
use jobpilot_automaton::ApplicantProfile;
use jobpilot_core::types::{CredentialId, UserId};

use crate::error::Result;
use crate::policy::AutomationPolicy;

/// Supplies the applicant data used to fill forms and score matches.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn application_data(&self, user: &UserId) -> Result<ApplicantProfile>;
}

/// Supplies per-user automation policies and the set of users to serve.
#[async_trait]
pub trait PolicyProvider: Send + Sync {
    async fn active_users(&self) -> Result<Vec<UserId>>;

    async fn policy_for(&self, user: &UserId) -> Result<AutomationPolicy>;
}

/// Scoped access to stored credentials.
///
/// Plaintext only ever exists inside the closure's stack frame; the store
/// decrypts, invokes, and wipes. The engine itself never copies the secret
/// out — it only uses this to verify a credential resolves before queueing
/// work behind it.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn with_decrypted(
        &self,
        id: &CredentialId,
        use_secret: &mut (dyn FnMut(&str) + Send),
    ) -> Result<()>;
}
