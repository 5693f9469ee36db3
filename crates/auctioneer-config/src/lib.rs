mod config;
#[cfg(feature = "tests")]
mod config_tests;

pub use config::{
    get,
    Config,
};
#[cfg(feature = "tests")]
pub use config_tests::{
    config_should_reject_unknown_var,
    example_env_config_is_up_to_date,
};

#[doc(hidden)]
pub mod _internal {
    /// Prevents [`Config::get_with_prefix`] from being called by anything but [`get`] and the
    /// `tests` feature's helpers.
    pub struct Internal;
}
