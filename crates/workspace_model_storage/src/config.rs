//! Storage configuration.

/// Api version of the entity code shape this storage understands.
pub const GENERATOR_API_VERSION: u32 = 1;

/// Implementation version of the entity code shape this storage understands.
pub const GENERATOR_IMPL_VERSION: u32 = 1;

/// Immutable configuration shared by every storage created from one
/// [`SchemaRegistry`](crate::SchemaRegistry).
///
/// The configuration is validated once, when the registry is loaded; no
/// entity access consults it afterwards except for `assert_consistency`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    /// Expected api version of entity schemas.
    pub api_version: u32,
    /// Expected implementation version of entity schemas.
    pub impl_version: u32,
    /// Reject schemas with a different api version.
    pub check_api_version: bool,
    /// Reject schemas with a different implementation version.
    pub check_impl_version: bool,
    /// Run a full consistency check after every committed mutation.
    pub assert_consistency: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            api_version: GENERATOR_API_VERSION,
            impl_version: GENERATOR_IMPL_VERSION,
            check_api_version: true,
            check_impl_version: true,
            assert_consistency: false,
        }
    }
}

impl StorageConfig {
    /// Version checks on, consistency asserted after every mutation.
    #[must_use]
    pub fn strict() -> Self {
        Self::default().with_assert_consistency(true)
    }

    /// No version checks, no consistency assertion.
    #[must_use]
    pub fn relaxed() -> Self {
        Self {
            check_api_version: false,
            check_impl_version: false,
            ..Self::default()
        }
    }

    /// Sets the expected api version.
    #[must_use]
    pub const fn with_api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    /// Sets the expected implementation version.
    #[must_use]
    pub const fn with_impl_version(mut self, version: u32) -> Self {
        self.impl_version = version;
        self
    }

    /// Enables or disables the api version check.
    #[must_use]
    pub const fn with_check_api_version(mut self, check: bool) -> Self {
        self.check_api_version = check;
        self
    }

    /// Enables or disables the implementation version check.
    #[must_use]
    pub const fn with_check_impl_version(mut self, check: bool) -> Self {
        self.check_impl_version = check;
        self
    }

    /// Enables or disables the post-mutation consistency check.
    #[must_use]
    pub const fn with_assert_consistency(mut self, assert: bool) -> Self {
        self.assert_consistency = assert;
        self
    }
}
