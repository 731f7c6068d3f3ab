mod backend;
mod notifiers;
mod state_builder;
mod sweeper;

pub use state_builder::{ApiServices, build_api_services};
pub use sweeper::spawn_token_sweeper;
