use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_user_id;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn from_env() -> AppResult<Self> {
        let secret = std::env::var("SECRET_KEY")
            .map_err(|_| AppError::Internal("SECRET_KEY not set".to_string()))?;
        Ok(Self::new(&secret))
    }

    pub fn generate_token(&self, user_id: &str, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))
    }

    pub fn extract_user_id(&self, token: &str) -> AppResult<String> {
        let claims = self.verify_token(token)?;
        validate_user_id(&claims.sub)
            .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;
        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_yields_subject() {
        let service = JwtService::new("test-secret");
        let token = service.generate_token("u1", Duration::hours(1)).unwrap();
        assert_eq!(service.extract_user_id(&token).unwrap(), "u1");
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let issuer = JwtService::new("one");
        let verifier = JwtService::new("two");
        let token = issuer.generate_token("u1", Duration::hours(1)).unwrap();
        assert!(matches!(
            verifier.extract_user_id(&token),
            Err(AppError::Auth(_))
        ));
    }

    #[test]
    fn subject_with_separator_is_rejected() {
        let service = JwtService::new("test-secret");
        let token = service.generate_token("a_b", Duration::hours(1)).unwrap();
        assert!(matches!(service.extract_user_id(&token), Err(AppError::Auth(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = JwtService::new("test-secret");
        let token = service.generate_token("u1", Duration::hours(-2)).unwrap();
        assert!(service.extract_user_id(&token).is_err());
    }
}
