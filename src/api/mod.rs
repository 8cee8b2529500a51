pub mod handlers;
pub mod models;
pub mod openapi;

pub use handlers::{SharedService, api_routes};
pub use openapi::ApiDoc;
