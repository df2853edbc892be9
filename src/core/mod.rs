pub mod error;
pub mod java;
pub mod paths;
pub mod registry;
pub mod state;
