pub mod api;
pub mod cli;
pub mod error;
pub mod state;

pub use api::router;
pub use state::AppState;
