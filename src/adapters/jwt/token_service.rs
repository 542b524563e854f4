use crate::domain::user::User;
use crate::ports::token_service::{
    Result, TokenClaims, TokenError, TokenService as TokenServiceTrait,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

/// アクセストークンの有効期間（時間）
const TOKEN_LIFETIME_HOURS: i64 = 1;

/// HMAC-SHA256署名によるトークンサービス
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtTokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

impl TokenServiceTrait for JwtTokenService {
    fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.id.value().to_string(),
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Creation(Box::new(e)))
    }

    fn validate(&self, token: &str) -> Result<TokenClaims> {
        // Validation::defaultはHS256と期限検証を含む
        decode::<TokenClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }
}

// ============================================================================
// テスト
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Role, UserId};

    fn sample_user() -> User {
        User {
            id: UserId::new(7),
            username: "alice".to_string(),
            name: Some("Alice".to_string()),
            role: Role::Librarian,
        }
    }

    #[test]
    fn test_issue_and_validate_round_trip() {
        let service = JwtTokenService::new("test-secret");
        let token = service.issue(&sample_user()).unwrap();

        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.user_id(), UserId::new(7));
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Librarian);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_validate_rejects_tampered_token() {
        let service = JwtTokenService::new("test-secret");
        let token = service.issue(&sample_user()).unwrap();

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(
            service.validate(&tampered),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_validate_rejects_token_from_other_secret() {
        let issuer = JwtTokenService::new("secret-a");
        let verifier = JwtTokenService::new("secret-b");

        let token = issuer.issue(&sample_user()).unwrap();
        assert!(matches!(verifier.validate(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let service = JwtTokenService::new("test-secret");
        assert!(matches!(
            service.validate("not-a-token"),
            Err(TokenError::Invalid)
        ));
    }
}
