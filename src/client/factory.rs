use std::{fmt, sync::Arc};

use super::ReactiveHttpClient;
use crate::{
    attribute::AttributeMap,
    pool::{self, ConnectionPoolSettings, EngineDefaults, SettingsBuilder},
    spi::SdkAsyncHttpClientBuilder,
};

/// An `AsyncHttpClientFactory` can be used to create a [`ReactiveHttpClient`]
/// with custom connection pool configuration.
///
/// The factory only records how settings are to be resolved; every `build`
/// call resolves them again and returns a new, independent client. It can be
/// cloned and reused.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use reactive_http_client::attribute::{AttributeMap, ConnectionTimeout, MaxConnections};
/// use reactive_http_client::AsyncHttpClientFactory;
///
/// # fn run() -> reactive_http_client::Result<()> {
/// let attributes = AttributeMap::builder()
///     .put::<ConnectionTimeout>(Duration::from_secs(1))
///     .put::<MaxConnections>(8)
///     .build();
///
/// let client = AsyncHttpClientFactory::new()
///     .connection_pool_settings_from_attribute_map()
///     .build_with_defaults(&attributes)?;
///
/// assert_eq!(client.connection_pool_settings().max_connections(), 8);
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
#[must_use]
#[derive(Clone, Default)]
pub struct AsyncHttpClientFactory {
    settings_builder: Option<SettingsBuilder>,
    defaults: Option<EngineDefaults>,
    base: Option<ConnectionPoolSettings>,
}

impl AsyncHttpClientFactory {
    /// Constructs a new `AsyncHttpClientFactory`.
    ///
    /// Without further configuration, [`build`](Self::build) binds clients to
    /// the base configuration loaded by [`ConnectionPoolSettings::from_env`],
    /// and [`build_with_defaults`](Self::build_with_defaults) reads each
    /// option from the attribute map, falling back to the built-in engine
    /// defaults.
    pub fn new() -> AsyncHttpClientFactory {
        AsyncHttpClientFactory::default()
    }

    /// Installs a function producing the connection pool settings.
    ///
    /// The function receives the attribute map given to the build call (an
    /// empty map for [`build`](Self::build)) and the engine defaults. Whatever
    /// it returns is used as-is, so it takes precedence over every other
    /// source.
    pub fn connection_pool_settings_builder<F>(mut self, f: F) -> AsyncHttpClientFactory
    where
        F: Fn(&AttributeMap, &EngineDefaults) -> crate::Result<ConnectionPoolSettings>
            + Send
            + Sync
            + 'static,
    {
        self.settings_builder = Some(Arc::new(f));
        self
    }

    /// Installs the builder reading each option from the attribute map and
    /// falling back to the engine defaults for the options it lacks.
    ///
    /// See [`pool::from_attribute_map`].
    pub fn connection_pool_settings_from_attribute_map(mut self) -> AsyncHttpClientFactory {
        self.settings_builder = Some(Arc::new(pool::from_attribute_map));
        self
    }

    /// Sets the engine defaults table handed to the builder function and used
    /// for options missing from an attribute map.
    ///
    /// Defaults to [`EngineDefaults::builtin`].
    pub fn engine_defaults(mut self, defaults: EngineDefaults) -> AsyncHttpClientFactory {
        self.defaults = Some(defaults);
        self
    }

    /// Sets the settings used when neither a builder function nor an
    /// attribute map is given.
    ///
    /// Defaults to [`ConnectionPoolSettings::from_env`], loaded on each build.
    pub fn base_configuration(mut self, base: ConnectionPoolSettings) -> AsyncHttpClientFactory {
        self.base = Some(base);
        self
    }

    /// Returns a `ReactiveHttpClient` resolved without an attribute map.
    ///
    /// # Errors
    ///
    /// Fails if the settings cannot be resolved, for example because the
    /// environment removed an entry the base configuration needs.
    pub fn build(&self) -> crate::Result<ReactiveHttpClient> {
        self.build_client(None)
    }

    /// Returns a `ReactiveHttpClient` resolved with `attributes`.
    ///
    /// # Errors
    ///
    /// Fails if the settings cannot be resolved, for example because an
    /// option is missing from both `attributes` and the engine defaults.
    pub fn build_with_defaults(
        &self,
        attributes: &AttributeMap,
    ) -> crate::Result<ReactiveHttpClient> {
        self.build_client(Some(attributes))
    }

    fn build_client(&self, attributes: Option<&AttributeMap>) -> crate::Result<ReactiveHttpClient> {
        let builtin;
        let defaults = match self.defaults {
            Some(ref defaults) => defaults,
            None => {
                builtin = EngineDefaults::builtin();
                &builtin
            }
        };

        let base = || match self.base {
            Some(ref base) => Ok(base.clone()),
            None => ConnectionPoolSettings::from_env(),
        };

        let settings = pool::resolve(self.settings_builder.as_ref(), attributes, defaults, base)?;
        Ok(ReactiveHttpClient::new(settings))
    }
}

impl SdkAsyncHttpClientBuilder for AsyncHttpClientFactory {
    type Client = ReactiveHttpClient;

    fn build_with_defaults(&self, attributes: &AttributeMap) -> crate::Result<ReactiveHttpClient> {
        AsyncHttpClientFactory::build_with_defaults(self, attributes)
    }
}

impl fmt::Debug for AsyncHttpClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("AsyncHttpClientFactory");
        builder.field("settings_builder", &self.settings_builder.is_some());
        if let Some(ref defaults) = self.defaults {
            builder.field("engine_defaults", defaults);
        }
        if let Some(ref base) = self.base {
            builder.field("base_configuration", base);
        }
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::attribute::{
        ConnectionMaxIdleTimeout, ConnectionTimeToLive, ConnectionTimeout, MaxConnections,
    };
    use crate::pool::DefaultKey;

    #[test]
    fn factory_is_reusable() {
        let base = ConnectionPoolSettings::builder().build().unwrap();
        let factory = AsyncHttpClientFactory::new().base_configuration(base);
        let a = factory.build().unwrap();
        let b = factory.build().unwrap();
        assert_eq!(a.connection_pool_settings(), b.connection_pool_settings());
        assert!(!Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[test]
    fn injected_defaults_are_used() {
        let defaults = EngineDefaults::builtin().set(DefaultKey::MaxConnections, 4);
        let client = AsyncHttpClientFactory::new()
            .engine_defaults(defaults)
            .build_with_defaults(&AttributeMap::empty())
            .unwrap();
        assert_eq!(client.connection_pool_settings().max_connections(), 4);
    }

    #[test]
    fn injected_base_configuration_is_used() {
        let base = ConnectionPoolSettings::builder()
            .max_connections(6)
            .build()
            .unwrap();
        let client = AsyncHttpClientFactory::new()
            .engine_defaults(EngineDefaults::empty())
            .base_configuration(base.clone())
            .build()
            .unwrap();
        assert_eq!(client.connection_pool_settings(), &base);
    }

    #[test]
    fn oversized_max_connections_fails_instead_of_panicking() {
        let attributes = AttributeMap::builder()
            .put::<MaxConnections>(usize::MAX)
            .build();
        let err = AsyncHttpClientFactory::new()
            .build_with_defaults(&attributes)
            .unwrap_err();
        assert!(err.is_config());

        let err = AsyncHttpClientFactory::new()
            .connection_pool_settings_from_attribute_map()
            .engine_defaults(EngineDefaults::builtin().set(DefaultKey::MaxConnections, u64::MAX))
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn builder_trait_reads_attributes() {
        let attributes = AttributeMap::builder()
            .put::<ConnectionTimeout>(Duration::from_secs(1))
            .put::<ConnectionMaxIdleTimeout>(Duration::from_secs(2))
            .put::<MaxConnections>(3)
            .put::<ConnectionTimeToLive>(Duration::from_secs(4))
            .build();

        let factory = AsyncHttpClientFactory::new().engine_defaults(EngineDefaults::builtin());
        let client = SdkAsyncHttpClientBuilder::build_with_defaults(&factory, &attributes).unwrap();
        let settings = client.connection_pool_settings();

        assert_eq!(settings.connect_timeout(), Duration::from_secs(1));
        assert_eq!(settings.idle_timeout(), Duration::from_secs(2));
        assert_eq!(settings.max_connections(), 3);
        assert_eq!(settings.max_connection_lifetime(), Some(Duration::from_secs(4)));
    }

    #[test]
    fn debug_hides_the_builder_function() {
        let factory = AsyncHttpClientFactory::new().connection_pool_settings_from_attribute_map();
        assert_eq!(
            format!("{:?}", factory),
            "AsyncHttpClientFactory { settings_builder: true }"
        );
    }
}
