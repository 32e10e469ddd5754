pub mod config;
pub mod error;
pub mod model;
pub mod object_id;
pub mod resources;
pub mod schema;
pub mod server;
pub mod store;

pub use config::AppState;
pub use error::{ClassifiedError, classify};
pub use model::{Document, ResourceModel};
