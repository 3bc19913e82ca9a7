pub mod assistant;
pub mod config;
pub mod requests;
pub mod responses;

pub use assistant::*;
pub use config::*;
pub use requests::*;
pub use responses::*;
