// Authorization steps shared by the web and API pipelines.
//
// A request moves Unauthenticated -> Authenticated (middleware resolves a
// Subject) -> Authorized | Forbidden (these helpers). Forbidden ends the
// request before any page store call is made.

use tracing::warn;

use super::{AuthProvider, Capability, CapabilitySet, Subject};
use crate::error::ApiError;

/// Whether `subject` holds `capability`; a failed check counts as "no"
pub async fn check(provider: &dyn AuthProvider, subject: &Subject, capability: Capability) -> bool {
    match provider.is_authorized(subject, capability).await {
        Ok(granted) => granted,
        Err(e) => {
            warn!("Capability check {} for '{}' failed: {}", capability, subject.username, e);
            false
        }
    }
}

/// Gate an action on one capability
pub async fn require(
    provider: &dyn AuthProvider,
    subject: &Subject,
    capability: Capability,
) -> Result<(), ApiError> {
    if check(provider, subject, capability).await {
        Ok(())
    } else {
        warn!("'{}' lacks the {} capability", subject.username, capability);
        Err(ApiError::forbidden(format!("Missing {} permission", capability)))
    }
}

/// Resolve every capability at once; all three checks run concurrently and
/// each is awaited even when another fails
pub async fn resolve_grants(provider: &dyn AuthProvider, subject: &Subject) -> CapabilitySet {
    let (create, update, delete) = futures::join!(
        check(provider, subject, Capability::Create),
        check(provider, subject, Capability::Update),
        check(provider, subject, Capability::Delete),
    );

    [
        (Capability::Create, create),
        (Capability::Update, update),
        (Capability::Delete, delete),
    ]
    .into_iter()
    .filter_map(|(capability, granted)| granted.then_some(capability))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, Credentials};
    use async_trait::async_trait;

    /// Grants create, errors on update, denies delete
    struct Flaky;

    #[async_trait]
    impl AuthProvider for Flaky {
        async fn authenticate(&self, _credentials: &Credentials) -> Result<Subject, AuthError> {
            Err(AuthError::InvalidCredentials)
        }

        async fn is_authorized(&self, _subject: &Subject, capability: Capability) -> Result<bool, AuthError> {
            match capability {
                Capability::Create => Ok(true),
                Capability::Update => Err(AuthError::UnknownUser("flaky".into())),
                Capability::Delete => Ok(false),
            }
        }
    }

    fn subject() -> Subject {
        Subject::new("someone", CapabilitySet::all())
    }

    #[tokio::test]
    async fn failed_checks_resolve_to_false() {
        let grants = resolve_grants(&Flaky, &subject()).await;
        assert_eq!(grants, [Capability::Create].into_iter().collect());
    }

    #[tokio::test]
    async fn require_maps_denial_to_forbidden() {
        assert!(require(&Flaky, &subject(), Capability::Create).await.is_ok());

        let err = require(&Flaky, &subject(), Capability::Delete).await.unwrap_err();
        assert_eq!(err.status_code(), 403);

        let err = require(&Flaky, &subject(), Capability::Update).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
