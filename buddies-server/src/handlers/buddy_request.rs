use buddies_common::lifecycle::{BuddyError, BuddyRequestManager};
use buddies_common::messages::{
    BuddyRequest, BuddyRequestList, BuddyRole, JoinerRole, NewBuddyRequest, RoleFilter, RoleQuery,
};
use buddies_common::models::buddy_request::BuddyRequest as BuddyRequestModel;
use buddies_common::role::RoleResolver;

use actix_protobuf::{ProtoBuf, ProtoBufResponseBuilder};
use actix_web::{web, HttpResponse};
use std::time::SystemTime;
use uuid::Uuid;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

pub async fn submit(
    manager: web::Data<BuddyRequestManager>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    new_request: ProtoBuf<NewBuddyRequest>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let request = manager
        .submit(user_access_token.0.user_id, &new_request.receiver)
        .await?;

    Ok(HttpResponse::Created().protobuf(BuddyRequest::from_model(&request, SystemTime::now())?)?)
}

pub async fn list(
    resolver: web::Data<RoleResolver>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    query: web::Query<RoleQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.0.user_id;
    let now = SystemTime::now();

    match query.role {
        RoleFilter::Receiver => {
            let joiners = resolver.joiners_for(user_id).await?;
            Ok(HttpResponse::Ok().protobuf(BuddyRequestList::from_models(&joiners, now)?)?)
        }
        RoleFilter::Joiner => {
            let request = resolver.request_for(user_id).await?;
            let request = request
                .as_ref()
                .map(|r| BuddyRequest::from_model(r, now))
                .transpose()?;

            Ok(HttpResponse::Ok().protobuf(JoinerRole { request })?)
        }
    }
}

pub async fn role(
    resolver: web::Data<RoleResolver>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let role = resolver.resolve(user_access_token.0.user_id).await?;
    Ok(HttpResponse::Ok().protobuf(BuddyRole::from_model(&role, SystemTime::now())?)?)
}

pub async fn history(
    manager: web::Data<BuddyRequestManager>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let requests = manager.history(user_access_token.0.user_id).await?;
    Ok(HttpResponse::Ok().protobuf(BuddyRequestList::from_models(&requests, SystemTime::now())?)?)
}

pub async fn approve(
    manager: web::Data<BuddyRequestManager>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    respond_with_request(manager.approve(*request_id, user_access_token.0.user_id).await)
}

pub async fn reject(
    manager: web::Data<BuddyRequestManager>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    respond_with_request(manager.reject(*request_id, user_access_token.0.user_id).await)
}

pub async fn withdraw(
    manager: web::Data<BuddyRequestManager>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    respond_with_request(manager.withdraw(*request_id, user_access_token.0.user_id).await)
}

pub async fn request_cancel(
    manager: web::Data<BuddyRequestManager>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    respond_with_request(
        manager
            .request_cancel(*request_id, user_access_token.0.user_id)
            .await,
    )
}

pub async fn confirm_cancel(
    manager: web::Data<BuddyRequestManager>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    respond_with_request(
        manager
            .confirm_cancel(*request_id, user_access_token.0.user_id)
            .await,
    )
}

pub async fn decline_cancel(
    manager: web::Data<BuddyRequestManager>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    respond_with_request(
        manager
            .decline_cancel(*request_id, user_access_token.0.user_id)
            .await,
    )
}

fn respond_with_request(
    result: Result<BuddyRequestModel, BuddyError>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let request = result?;
    Ok(HttpResponse::Ok().protobuf(BuddyRequest::from_model(&request, SystemTime::now())?)?)
}
