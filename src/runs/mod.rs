pub mod bootstrap;
pub mod dispatcher;
pub mod encoder;
pub mod executor;
pub mod models;
pub mod resolver;
pub mod validator;

pub use bootstrap::ToolBootstrapper;
pub use dispatcher::RunDispatcher;
pub use executor::RunExecutor;
pub use models::*;
pub use validator::FieldError;
