use buddies_common::directory::CandidateDirectory;
use buddies_common::messages::{Candidate, CandidateList, CandidateQuery};
use buddies_common::validators::{self, Validity};

use actix_protobuf::ProtoBufResponseBuilder;
use actix_web::{web, HttpResponse};
use std::borrow::Cow;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

pub async fn search(
    directory: web::Data<dyn CandidateDirectory>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<CandidateQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = validators::validate_search_query(&query.q) {
        return Err(HttpErrorResponse::IncorrectlyFormed(Cow::Borrowed(msg)));
    }

    let users = directory
        .search(
            query.q.trim(),
            user_access_token.0.user_id,
            env::CONF.candidate_search_limit,
        )
        .await?;

    let candidates = CandidateList {
        candidates: users.iter().map(Candidate::from).collect(),
    };

    Ok(HttpResponse::Ok().protobuf(candidates)?)
}
