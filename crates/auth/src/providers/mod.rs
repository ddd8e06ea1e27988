//! OIDC provider implementations.
//!
//! `IdentityProviderClient` implementations for Google and Apple (plus a
//! mock for local development behind the `mock` feature). Each client makes
//! exactly one exchange attempt per authorization code; codes are single
//! use, so failures are surfaced immediately instead of retried.

mod apple;
mod google;
#[cfg(feature = "mock")]
mod mock;

pub use apple::AppleProvider;
pub use google::GoogleProvider;
#[cfg(feature = "mock")]
pub use mock::MockProvider;

use openidconnect::{core::CoreClient, EndpointMaybeSet, EndpointNotSet, EndpointSet};

/// A `CoreClient` configured from discovered provider metadata.
///
/// `from_provider_metadata` pins the endpoint type-state: the auth URL is
/// always present after discovery, the token and userinfo URLs may or may
/// not be. `set_redirect_uri` preserves these parameters.
pub(crate) type ConfiguredCoreClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;
