pub mod fares;
pub mod history;
pub mod workflows;
