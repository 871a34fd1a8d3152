pub mod handlers;
pub mod manager;
pub mod schema;
pub mod store;

pub use manager::DatabaseManager;
pub use store::ResultStore;
