mod error;
mod functions;
mod traits;
mod types;
mod validation;

pub use error::AuthError;
pub use functions::{display_name_from_email, generate_state};
pub use traits::{FlowRepository, IdentityProviderClient, Result};
pub use types::{AuthFlowState, OidcClaims, OidcProvider, SessionClaims};
pub use validation::validate_return_to;
