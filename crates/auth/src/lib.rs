pub mod error;
pub mod flow;
pub mod policy;
pub mod session;

pub use error::{AuthError, AuthResult};
pub use flow::Authenticator;
pub use policy::GuardrailPolicies;
pub use session::{AuthState, Session};
