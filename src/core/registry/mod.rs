pub mod model;
pub mod registry;
pub mod store;

pub use model::{RuntimeDescriptor, RuntimeSource, ScopeConfig};
pub use registry::{RuntimeRegistry, GLOBAL_SCOPE};
pub use store::ScopeStore;
