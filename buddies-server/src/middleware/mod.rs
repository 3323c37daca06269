pub mod auth;

use buddies_common::token::TokenError;

use actix_web::HttpRequest;
use std::borrow::Cow;

use crate::handlers::error::HttpErrorResponse;

pub trait TokenLocation {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<&'a str>;
}

pub struct FromHeader {}

impl TokenLocation for FromHeader {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<&'a str> {
        let header = req.headers().get(key)?;
        header.to_str().ok()
    }
}

#[inline(always)]
fn into_actix_error_res<T>(result: Result<T, TokenError>) -> Result<T, HttpErrorResponse> {
    match result {
        Ok(t) => Ok(t),
        Err(TokenError::TokenInvalid) => Err(HttpErrorResponse::IncorrectCredential(
            Cow::Borrowed("Token is invalid"),
        )),
        Err(TokenError::TokenExpired) => Err(HttpErrorResponse::TokenExpired(Cow::Borrowed(
            "Token is expired",
        ))),
        Err(TokenError::TokenMissing) => Err(HttpErrorResponse::TokenMissing(Cow::Borrowed(
            "Token is missing",
        ))),
        Err(TokenError::WrongTokenType) => Err(HttpErrorResponse::WrongTokenType(Cow::Borrowed(
            "Incorrect token type",
        ))),
        Err(TokenError::SigningFailed) => Err(HttpErrorResponse::InternalError(Cow::Borrowed(
            "Token could not be processed",
        ))),
    }
}
