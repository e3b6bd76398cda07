pub mod broadcast;
pub mod error;
pub mod preferences;
pub mod search;
pub mod state;
pub mod users;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};
