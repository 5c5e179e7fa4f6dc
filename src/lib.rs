pub mod api;
pub mod board;
pub mod config;
pub mod crm_config;
pub mod errors;
pub mod fetch;
pub mod forms;
pub mod init;
pub mod models;
pub mod serde_util;
pub mod session;
pub mod stats;
pub mod ui;
