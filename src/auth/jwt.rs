use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError, state::AppState};

/// HS256 signing and verification keys plus the claims they stamp.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_seconds.max(1) as u64),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            warn!(error = %e, "jwt rejected");
            AppError::InvalidToken
        })?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_seconds: 300,
        })
    }

    #[test]
    fn sign_and_verify() {
        let keys = JwtKeys::from_ref(&AppState::fake());
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn rejects_other_secret() {
        let token = keys("one", "iss", "aud").sign(Uuid::new_v4()).unwrap();
        assert!(matches!(
            keys("two", "iss", "aud").verify(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_wrong_issuer_or_audience() {
        let token = keys("same", "good-iss", "good-aud").sign(Uuid::new_v4()).unwrap();
        assert!(keys("same", "bad-iss", "good-aud").verify(&token).is_err());
        assert!(keys("same", "good-iss", "bad-aud").verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_and_malformed() {
        let k = keys("secret", "iss", "aud");
        let past = OffsetDateTime::now_utc().unix_timestamp() - 3600;
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: (past - 60) as usize,
            exp: past as usize,
            iss: "iss".into(),
            aud: "aud".into(),
        };
        let expired = encode(&Header::default(), &claims, &k.encoding).unwrap();
        assert!(matches!(k.verify(&expired), Err(AppError::InvalidToken)));
        assert!(matches!(k.verify("not.a.jwt"), Err(AppError::InvalidToken)));
        assert!(matches!(k.verify(""), Err(AppError::InvalidToken)));
    }
}
