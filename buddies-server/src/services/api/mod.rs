use actix_web::web::*;

mod buddy_request;
mod candidate;
mod health;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/api")
            .configure(buddy_request::configure)
            .configure(candidate::configure)
            .configure(health::configure),
    );
}
