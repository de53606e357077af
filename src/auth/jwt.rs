use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, AuthProvider, Capability, CapabilitySet, Credentials, Subject};
use crate::config::SecurityConfig;

/// Token claims; capabilities are fixed at issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub username: String,
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    fn capabilities(&self) -> CapabilitySet {
        [
            (Capability::Create, self.can_create),
            (Capability::Update, self.can_update),
            (Capability::Delete, self.can_delete),
        ]
        .into_iter()
        .filter_map(|(capability, granted)| granted.then_some(capability))
        .collect()
    }
}

/// Issues and verifies the API bearer tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: u64,
    issuer: String,
    subject: String,
}

impl TokenIssuer {
    pub fn new(config: &SecurityConfig) -> Result<Self, AuthError> {
        if config.jwt_secret.is_empty() {
            return Err(AuthError::SecretMissing);
        }
        let secret = config.jwt_secret.as_bytes();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry_hours: config.jwt_expiry_hours,
            issuer: config.jwt_issuer.clone(),
            subject: config.jwt_subject.clone(),
        })
    }

    /// Sign a token carrying exactly the grants resolved for `subject`
    pub fn issue(&self, subject: &Subject) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            username: subject.username.clone(),
            can_create: subject.can(Capability::Create),
            can_update: subject.can(Capability::Update),
            can_delete: subject.can(Capability::Delete),
            sub: self.subject.clone(),
            iss: self.issuer.clone(),
            exp: (now + Duration::hours(self.expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.sub = Some(self.subject.clone());

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[async_trait]
impl AuthProvider for TokenIssuer {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Subject, AuthError> {
        let Credentials::Token(token) = credentials else {
            return Err(AuthError::InvalidCredentials);
        };
        let claims = self.verify(token)?;
        Ok(Subject::new(claims.username.clone(), claims.capabilities()))
    }

    /// Answered from the verified claims alone
    async fn is_authorized(&self, subject: &Subject, capability: Capability) -> Result<bool, AuthError> {
        Ok(subject.can(capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AppConfig::development().security).unwrap()
    }

    #[tokio::test]
    async fn issued_token_round_trips_grants() {
        let issuer = issuer();
        let subject = Subject::new("bar", [Capability::Update].into_iter().collect());
        let token = issuer.issue(&subject).unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.username, "bar");
        assert!(claims.can_update && !claims.can_create && !claims.can_delete);
        assert_eq!(claims.sub, "Wiki API");

        let resolved = issuer.authenticate(&Credentials::Token(token)).await.unwrap();
        assert_eq!(resolved, subject);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let issuer = issuer();
        let token = issuer.issue(&Subject::new("foo", CapabilitySet::all())).unwrap();
        let tampered = format!("{}x", token);
        assert!(matches!(issuer.verify(&tampered), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let mut other = AppConfig::development().security;
        other.jwt_secret = "another-secret".to_string();
        let foreign = TokenIssuer::new(&other)
            .unwrap()
            .issue(&Subject::new("foo", CapabilitySet::all()))
            .unwrap();
        assert!(issuer().verify(&foreign).is_err());
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        let mut config = AppConfig::development().security;
        config.jwt_secret.clear();
        assert!(matches!(TokenIssuer::new(&config), Err(AuthError::SecretMissing)));
    }

    #[tokio::test]
    async fn passwords_are_not_tokens() {
        let err = issuer().authenticate(&Credentials::password("foo", "bar")).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }
}
