pub mod buddy_request;
pub mod candidate;
pub mod health;

pub mod error {
    use actix_protobuf::ProtoBufResponseBuilder;
    use buddies_common::directory::DirectoryError;
    use buddies_common::lifecycle::{BuddyError, NotFoundKind};
    use buddies_common::messages::{ErrorType, MessageError, RequestStatus, ServerErrorResponse};
    use buddies_common::models::buddy_request::BuddyRequestStatus;
    use buddies_common::token::TokenError;

    use actix_web::http::{header, StatusCode};
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use std::borrow::Cow;
    use std::fmt;

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(Cow<'static, str>),
        InvalidMessage(MessageError),
        InvalidState(Cow<'static, str>, BuddyRequestStatus),
        AlreadyRequested(Cow<'static, str>, BuddyRequestStatus),

        // 401
        IncorrectCredential(Cow<'static, str>),
        TokenExpired(Cow<'static, str>),
        TokenMissing(Cow<'static, str>),
        WrongTokenType(Cow<'static, str>),

        // 403
        NotParticipant(Cow<'static, str>),
        ReceiverNotEligible(String),

        // 404
        DoesNotExist(Cow<'static, str>),

        // 500
        InternalError(Cow<'static, str>),

        // 503
        ServiceUnavailable(Cow<'static, str>),
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let server_error: ServerErrorResponse = self.into();
            write!(f, "{:?}", server_error)
        }
    }

    impl From<HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: HttpErrorResponse) -> Self {
            (&resp).into()
        }
    }

    impl From<&HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            match resp {
                // 400
                HttpErrorResponse::IncorrectlyFormed(msg) => ServerErrorResponse {
                    err_type: ErrorType::IncorrectlyFormed.into(),
                    err_message: format!("Incorrectly formed request: {msg}"),
                    current_status: None,
                },
                HttpErrorResponse::InvalidMessage(e) => ServerErrorResponse {
                    err_type: ErrorType::InvalidMessage.into(),
                    err_message: format!("Invalid message: {e}"),
                    current_status: None,
                },
                HttpErrorResponse::InvalidState(msg, current) => ServerErrorResponse {
                    err_type: ErrorType::InvalidState.into(),
                    err_message: format!("Invalid state: {msg}"),
                    current_status: Some(RequestStatus::from(*current).into()),
                },
                HttpErrorResponse::AlreadyRequested(msg, current) => ServerErrorResponse {
                    err_type: ErrorType::AlreadyRequested.into(),
                    err_message: format!("Already requested: {msg}"),
                    current_status: Some(RequestStatus::from(*current).into()),
                },

                // 401
                HttpErrorResponse::IncorrectCredential(msg) => ServerErrorResponse {
                    err_type: ErrorType::IncorrectCredential.into(),
                    err_message: format!("Incorrect credential: {msg}"),
                    current_status: None,
                },
                HttpErrorResponse::TokenExpired(msg) => ServerErrorResponse {
                    err_type: ErrorType::TokenExpired.into(),
                    err_message: format!("Token expired: {msg}"),
                    current_status: None,
                },
                HttpErrorResponse::TokenMissing(msg) => ServerErrorResponse {
                    err_type: ErrorType::TokenMissing.into(),
                    err_message: format!("Token missing: {msg}"),
                    current_status: None,
                },
                HttpErrorResponse::WrongTokenType(msg) => ServerErrorResponse {
                    err_type: ErrorType::WrongTokenType.into(),
                    err_message: format!("Wrong token type: {msg}"),
                    current_status: None,
                },

                // 403
                HttpErrorResponse::NotParticipant(msg) => ServerErrorResponse {
                    err_type: ErrorType::NotParticipant.into(),
                    err_message: format!("Not a participant: {msg}"),
                    current_status: None,
                },
                // Shown to the user verbatim
                HttpErrorResponse::ReceiverNotEligible(msg) => ServerErrorResponse {
                    err_type: ErrorType::ReceiverNotEligible.into(),
                    err_message: msg.clone(),
                    current_status: None,
                },

                // 404
                HttpErrorResponse::DoesNotExist(msg) => ServerErrorResponse {
                    err_type: ErrorType::DoesNotExist.into(),
                    err_message: format!("Does not exist: {msg}"),
                    current_status: None,
                },

                // 500
                HttpErrorResponse::InternalError(msg) => ServerErrorResponse {
                    err_type: ErrorType::InternalError.into(),
                    err_message: format!("Internal error: {msg}"),
                    current_status: None,
                },

                // 503
                HttpErrorResponse::ServiceUnavailable(msg) => ServerErrorResponse {
                    err_type: ErrorType::ServiceUnavailable.into(),
                    err_message: format!("Service unavailable: {msg}"),
                    current_status: None,
                },
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            match HttpResponseBuilder::new(self.status_code())
                .insert_header((header::CONTENT_TYPE, "application/protobuf"))
                .protobuf::<ServerErrorResponse>(self.into())
            {
                Ok(resp) => resp,
                Err(e) => {
                    log::error!("HttpErrorResponse failed to serialize to ProtoBuf: {e}");
                    HttpResponse::InternalServerError().finish()
                }
            }
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_)
                | HttpErrorResponse::InvalidMessage(_)
                | HttpErrorResponse::InvalidState(_, _)
                | HttpErrorResponse::AlreadyRequested(_, _) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::IncorrectCredential(_)
                | HttpErrorResponse::TokenExpired(_)
                | HttpErrorResponse::TokenMissing(_)
                | HttpErrorResponse::WrongTokenType(_) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::NotParticipant(_)
                | HttpErrorResponse::ReceiverNotEligible(_) => StatusCode::FORBIDDEN,
                HttpErrorResponse::DoesNotExist(_) => StatusCode::NOT_FOUND,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                HttpErrorResponse::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            }
        }
    }

    impl From<actix_web::Error> for HttpErrorResponse {
        fn from(_err: actix_web::Error) -> Self {
            HttpErrorResponse::InternalError(Cow::Borrowed("Failed to serialize ProtoBuf response"))
        }
    }

    impl From<MessageError> for HttpErrorResponse {
        fn from(err: MessageError) -> Self {
            HttpErrorResponse::InvalidMessage(err)
        }
    }

    impl From<TokenError> for HttpErrorResponse {
        fn from(err: TokenError) -> Self {
            match err {
                TokenError::TokenInvalid => {
                    HttpErrorResponse::IncorrectCredential(Cow::Borrowed("Invalid token"))
                }
                TokenError::TokenExpired => {
                    HttpErrorResponse::TokenExpired(Cow::Borrowed("Token expired"))
                }
                TokenError::TokenMissing => {
                    HttpErrorResponse::TokenMissing(Cow::Borrowed("Missing token"))
                }
                TokenError::WrongTokenType => {
                    HttpErrorResponse::WrongTokenType(Cow::Borrowed("Wrong token type"))
                }
                TokenError::SigningFailed => {
                    HttpErrorResponse::InternalError(Cow::Borrowed("Failed to process token"))
                }
            }
        }
    }

    impl From<BuddyError> for HttpErrorResponse {
        fn from(err: BuddyError) -> Self {
            match err {
                BuddyError::Validation(msg) => HttpErrorResponse::IncorrectlyFormed(msg),
                BuddyError::StaleState {
                    current, lapsed, ..
                } => {
                    let msg = if lapsed {
                        Cow::Borrowed("Buddy request has lapsed")
                    } else {
                        Cow::Owned(format!("Buddy request is already {current}"))
                    };

                    HttpErrorResponse::InvalidState(msg, current)
                }
                BuddyError::ReceiverNotEligible(msg) => HttpErrorResponse::ReceiverNotEligible(msg),
                BuddyError::NotFound(NotFoundKind::Request) => {
                    HttpErrorResponse::DoesNotExist(Cow::Borrowed("Buddy request not found"))
                }
                BuddyError::NotFound(NotFoundKind::User) => {
                    HttpErrorResponse::DoesNotExist(Cow::Borrowed("No buyer with that username"))
                }
                BuddyError::AlreadyRequested { status, .. } => {
                    HttpErrorResponse::AlreadyRequested(
                        Cow::Borrowed("You already have an open buddy request"),
                        status,
                    )
                }
                BuddyError::NotParticipant => HttpErrorResponse::NotParticipant(Cow::Borrowed(
                    "User is not a party to this buddy request",
                )),
                BuddyError::Transient(msg) => {
                    log::warn!("{msg}");
                    HttpErrorResponse::ServiceUnavailable(Cow::Borrowed(
                        "Temporary failure, please try again",
                    ))
                }
            }
        }
    }

    impl From<DirectoryError> for HttpErrorResponse {
        fn from(err: DirectoryError) -> Self {
            log::error!("{err}");
            HttpErrorResponse::ServiceUnavailable(Cow::Borrowed(
                "Buyer directory is unavailable, please try again",
            ))
        }
    }
}
