mod error;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use traits::AccountRepository;
pub use types::{BootstrapOutcome, HeroProfile, LinkedAccount, LinkedIdentity, User};
