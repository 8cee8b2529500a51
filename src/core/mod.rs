pub mod censor;
pub mod errors;
pub mod listing;
pub mod models;
pub mod ranking;
pub mod services;
