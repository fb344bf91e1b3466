#[macro_use]
extern crate rocket;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod routes;

use auth::IdentityClient;
use db::DbPool;
use rocket::{Build, Rocket};

pub fn build(pool: DbPool, identity: IdentityClient) -> Rocket<Build> {
    rocket::build()
        .manage(pool)
        .manage(identity)
        .mount("/api", routes::all())
        .register("/", routes::catchers())
}
