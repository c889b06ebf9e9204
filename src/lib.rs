pub mod app;
pub mod config;
pub mod db;
pub mod users;

pub use db::AppState;
pub use users::model::User;
