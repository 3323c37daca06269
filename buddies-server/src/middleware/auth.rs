use buddies_common::token::access_token::{AccessToken, AccessTokenClaims, AccessTokenType};
use buddies_common::token::{DecodedToken, Token, TokenError};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures::future;
use std::marker::PhantomData;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::middleware::{into_actix_error_res, TokenLocation};

pub trait RequestAccessTokenType {
    fn token_name() -> &'static str;
    fn token_type() -> AccessTokenType;
}

pub struct Access {}

impl RequestAccessTokenType for Access {
    fn token_name() -> &'static str {
        "AccessToken"
    }
    fn token_type() -> AccessTokenType {
        AccessTokenType::Access
    }
}

type AccessDecodedToken =
    DecodedToken<<AccessToken as Token>::Claims, <AccessToken as Token>::Verifier>;

/// Claims of a token whose signature, expiration and type have all been checked
#[derive(Debug)]
pub struct VerifiedToken<T: RequestAccessTokenType, L: TokenLocation>(
    pub AccessTokenClaims,
    PhantomData<(T, L)>,
);

impl<T, L> FromRequest for VerifiedToken<T, L>
where
    T: RequestAccessTokenType,
    L: TokenLocation,
{
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let decoded_token = match into_actix_error_res(get_and_decode_token::<T, L>(req)) {
            Ok(t) => t,
            Err(e) => return future::err(e),
        };

        let claims = match into_actix_error_res(verify_token(&decoded_token, T::token_type())) {
            Ok(c) => c,
            Err(e) => return future::err(e),
        };

        future::ok(VerifiedToken(claims, PhantomData))
    }
}

#[inline]
fn get_and_decode_token<T, L>(req: &HttpRequest) -> Result<AccessDecodedToken, TokenError>
where
    T: RequestAccessTokenType,
    L: TokenLocation,
{
    let token = match L::get_from_request(req, T::token_name()) {
        Some(t) => t,
        None => return Err(TokenError::TokenMissing),
    };

    AccessToken::decode(token)
}

#[inline]
fn verify_token(
    decoded_token: &AccessDecodedToken,
    expected_type: AccessTokenType,
) -> Result<AccessTokenClaims, TokenError> {
    let claims = decoded_token.verify(&env::CONF.token_signing_key)?;

    if claims.token_type != expected_type {
        return Err(TokenError::WrongTokenType);
    }

    Ok(claims.clone())
}
