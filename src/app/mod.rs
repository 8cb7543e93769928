//! Application state and connection event handling

pub mod dispatch;
pub mod lifecycle;
pub mod state;

pub use dispatch::dispatch;
pub use state::AppState;
