use crate::token::{Expiring, HmacSha256Verifier, Token, TokenError};

use base64::engine::general_purpose::URL_SAFE as b64_urlsafe;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tokens are issued by the account service. Only `Access` tokens are accepted by the buddy
/// endpoints; the other types exist so a misused token fails with `WrongTokenType` instead
/// of a signature error.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum AccessTokenType {
    Nothing,
    Access,
    Refresh,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(rename = "uid")]
    pub user_id: Uuid,
    #[serde(rename = "eml")]
    pub user_email: String,
    #[serde(rename = "exp")]
    pub expiration: u64,
    #[serde(rename = "typ")]
    pub token_type: AccessTokenType,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewAccessTokenClaims<'a> {
    #[serde(rename = "uid")]
    pub user_id: Uuid,
    #[serde(rename = "eml")]
    pub user_email: &'a str,
    #[serde(rename = "exp")]
    pub expiration: u64,
    #[serde(rename = "typ")]
    pub token_type: AccessTokenType,
}

impl Expiring for AccessTokenClaims {
    fn expiration(&self) -> u64 {
        self.expiration
    }
}

pub struct AccessToken {}

impl AccessToken {
    pub fn sign_new(
        claims: &NewAccessTokenClaims,
        signing_key: &[u8],
    ) -> Result<String, TokenError> {
        let mut token_unencoded =
            serde_json::to_vec(claims).map_err(|_| TokenError::SigningFailed)?;

        let signature = HmacSha256Verifier::sign(&token_unencoded, signing_key)?;
        token_unencoded.extend_from_slice(&signature);

        Ok(b64_urlsafe.encode(&token_unencoded))
    }
}

impl Token for AccessToken {
    type Claims = AccessTokenClaims;
    type Verifier = HmacSha256Verifier;

    fn token_name() -> &'static str {
        "AccessToken"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn expiration_in(secs: u64) -> u64 {
        (SystemTime::now() + Duration::from_secs(secs))
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[test]
    fn claims_use_short_field_names() {
        let user_id = Uuid::now_v7();
        let exp = expiration_in(10);
        let signing_key = [9; 64];

        let claims = NewAccessTokenClaims {
            user_id,
            user_email: "anchor@buddies.test",
            expiration: exp,
            token_type: AccessTokenType::Access,
        };

        let token = AccessToken::sign_new(&claims, &signing_key).unwrap();
        let raw = String::from_utf8_lossy(&b64_urlsafe.decode(&token).unwrap()).into_owned();

        assert!(raw.contains(&format!("\"uid\":\"{user_id}\"")));
        assert!(raw.contains("\"eml\":\"anchor@buddies.test\""));
        assert!(raw.contains(&format!("\"exp\":{exp}")));
        assert!(raw.contains("\"typ\":\"Access\""));
    }

    #[test]
    fn sign_and_verify() {
        let user_id = Uuid::now_v7();
        let exp = expiration_in(10);
        let signing_key = [9; 64];

        let claims = NewAccessTokenClaims {
            user_id,
            user_email: "anchor@buddies.test",
            expiration: exp,
            token_type: AccessTokenType::Refresh,
        };

        let token = AccessToken::sign_new(&claims, &signing_key).unwrap();
        let decoded = AccessToken::decode(&token).unwrap();
        let verified = decoded.verify(&signing_key).unwrap();

        assert_eq!(verified.user_id, user_id);
        assert_eq!(verified.user_email, "anchor@buddies.test");
        assert_eq!(verified.expiration, exp);
        assert_eq!(verified.token_type, AccessTokenType::Refresh);

        assert!(matches!(
            decoded.verify(&[8; 64]),
            Err(TokenError::TokenInvalid)
        ));
    }
}
