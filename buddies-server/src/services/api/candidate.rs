use actix_web::web::*;

use crate::handlers::candidate;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/candidates").route("", get().to(candidate::search)));
}
