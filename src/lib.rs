pub mod app;
pub mod auth;
pub mod db;
pub mod errors;
pub mod events;
pub mod models;
pub mod routes;
pub mod security;
pub mod utils;

// Re-export commonly used items for tests
pub use app::create_app;
