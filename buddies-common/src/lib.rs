#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod db;
pub mod directory;
pub mod lifecycle;
pub mod messages;
pub mod models;
pub mod role;
pub mod schema;
pub mod store;
pub mod token;
pub mod validators;
