pub mod activity;
pub mod vendor;
pub mod viz;
