use actix_web::web::*;

use crate::handlers::buddy_request;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/buddy-requests")
            .service(
                resource("")
                    .route(get().to(buddy_request::list))
                    .route(post().to(buddy_request::submit)),
            )
            .service(resource("/role").route(get().to(buddy_request::role)))
            .service(resource("/history").route(get().to(buddy_request::history)))
            .service(
                scope("/{request_id}")
                    .service(resource("/approve").route(post().to(buddy_request::approve)))
                    .service(resource("/reject").route(post().to(buddy_request::reject)))
                    .service(resource("/withdraw").route(post().to(buddy_request::withdraw)))
                    .service(
                        resource("/cancel").route(post().to(buddy_request::request_cancel)),
                    )
                    .service(
                        resource("/cancel/confirm")
                            .route(post().to(buddy_request::confirm_cancel)),
                    )
                    .service(
                        resource("/cancel/decline")
                            .route(post().to(buddy_request::decline_cancel)),
                    ),
            ),
    );
}
