pub mod config;
pub mod handlers;
pub mod reconciler;
pub mod state;
