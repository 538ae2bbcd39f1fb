mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod schema;
    pub mod serializers;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

pub mod config;
pub mod routes;
pub mod state;
pub mod uploads;

pub use authentication::*;
pub use constants::*;
pub use database::*;
