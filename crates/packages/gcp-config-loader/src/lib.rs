#![deny(clippy::all)]
#![forbid(unsafe_code)]

//! Loads secrets from Secret Manager into an immutable, enumerable property source.
//!
//! Embedding applications build a [`SecretPropertySource`] once per configuration
//! load and decide themselves where it sits in their lookup order.

use bytes::Bytes;

mod loader;
mod secret_source;

pub use loader::{SecretPropertySourceLoader, gcp_client};
pub use secret_source::{SOURCE_NAME, SecretPropertySource};

/// A named set of properties that can be enumerated and looked up by name.
pub trait PropertySource {
    fn name(&self) -> &str;

    /// All property names, in a stable order.
    fn property_names(&self) -> &[String];

    fn get_property(&self, name: &str) -> Option<&Bytes>;

    fn contains_property(&self, name: &str) -> bool {
        self.get_property(name).is_some()
    }
}
