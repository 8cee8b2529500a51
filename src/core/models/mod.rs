pub mod attachment;
pub mod audit;
pub mod category;
pub mod order;
pub mod post;
pub mod thread;
pub mod user;
