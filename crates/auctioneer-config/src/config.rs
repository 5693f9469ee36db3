//! The [`Config`] trait and [`get`] free function used by every service binary in this
//! workspace to read its configuration from environment variables.
use figment::{
    providers::Env,
    Figment,
};
use serde::de::DeserializeOwned;

use crate::_internal::Internal;

/// Implemented by a service's top-level configuration struct.
///
/// `PREFIX` is prepended to every field name (upper-cased) to derive the environment
/// variable read for that field, e.g. a field `log` on a `Config` with
/// `PREFIX = "ASTRIA_AUCTIONEER_"` is read from `ASTRIA_AUCTIONEER_LOG`.
///
/// Implementors should derive `serde::Deserialize` and set `#[serde(deny_unknown_fields)]`
/// so that [`get`] rejects configuration with stray environment variables.
pub trait Config: DeserializeOwned {
    const PREFIX: &'static str;

    #[doc(hidden)]
    fn get_with_prefix(prefix: &str, _: Internal) -> Result<Self, figment::Error> {
        Figment::new().merge(Env::prefixed(prefix)).extract()
    }
}

/// Reads `C` from the process environment, using `C::PREFIX` to select the relevant
/// environment variables.
///
/// # Errors
/// Returns an error if a required field is missing, a value fails to parse, or an
/// environment variable is set that does not map to a field of `C` (assuming `C` is
/// marked `#[serde(deny_unknown_fields)]`).
pub fn get<C: Config>() -> Result<C, figment::Error> {
    C::get_with_prefix(C::PREFIX, Internal)
}
