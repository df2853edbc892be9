pub mod probe;
pub mod validator;
pub mod version;

pub use probe::RuntimeProbe;
pub use validator::{RuntimeValidator, ValidationRejection, DEFAULT_VALIDATION_TIMEOUT};
pub use version::JavaVersion;
