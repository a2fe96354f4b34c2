pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;
pub mod views;

pub use routes::build_router;
pub use state::AppState;
