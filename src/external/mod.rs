pub mod placeholder_api;
