pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod messages;
pub mod reactions;
pub mod state;
pub mod sweeper;
pub mod threads;
pub mod typing;
pub mod zones;

pub use auth::{AllowAll, Authorizer};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::ServiceError;
pub use state::ThreadService;
