pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod entities;
pub mod error;
pub mod external;
pub mod fare;
pub mod history;
pub mod navigation;
pub mod server;
pub mod session;
pub mod validation;

pub mod simulation;
