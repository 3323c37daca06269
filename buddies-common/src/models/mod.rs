pub mod buddy_request;
pub mod shipment_cycle;
pub mod user;
