pub mod activity;
pub mod health;
pub mod import;
pub mod upload;
