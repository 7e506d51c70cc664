pub mod error;
pub mod extractors;
pub mod validator;

pub use error::{AuthError, AuthResult};
pub use extractors::BearerToken;
pub use validator::{PresenceOnlyValidator, SharedTokenValidator, TokenValidator};
