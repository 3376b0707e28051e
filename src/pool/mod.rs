//! Connection pool configuration.
//!
//! [`ConnectionPoolSettings`] is the resolved, immutable configuration a
//! [`ReactiveHttpClient`](crate::ReactiveHttpClient) is bound to. It is
//! produced by [`resolve`] from an optional builder function, an optional
//! [`AttributeMap`](crate::attribute::AttributeMap), the engine's
//! [`EngineDefaults`] and a base configuration used when neither of the
//! first two is given.

use std::{fmt, time::Duration};

use tokio::sync::Semaphore;

pub use self::defaults::{DefaultKey, EngineDefaults};
pub use self::resolve::{from_attribute_map, resolve, SettingsBuilder};

mod defaults;
mod resolve;

/// Resolved connection pool configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionPoolSettings {
    connect_timeout: Duration,
    read_timeout: Duration,
    idle_timeout: Duration,
    max_connections: usize,
    max_connection_lifetime: Option<Duration>,
}

/// A `ConnectionPoolSettingsBuilder` can be used to create
/// [`ConnectionPoolSettings`] field by field.
#[must_use]
#[derive(Debug, Clone)]
pub struct ConnectionPoolSettingsBuilder {
    settings: ConnectionPoolSettings,
}

// ===== impl ConnectionPoolSettings =====

impl ConnectionPoolSettings {
    /// Starts from the built-in engine defaults.
    pub fn builder() -> ConnectionPoolSettingsBuilder {
        ConnectionPoolSettingsBuilder {
            settings: ConnectionPoolSettings {
                connect_timeout: defaults::CONNECT_TIMEOUT,
                read_timeout: defaults::READ_TIMEOUT,
                idle_timeout: defaults::POOLED_IDLE_TIMEOUT,
                max_connections: defaults::MAX_CONNECTIONS,
                max_connection_lifetime: None,
            },
        }
    }

    /// Takes every value from the engine defaults table as-is.
    ///
    /// A TTL entry of `0` means the lifetime is unbounded.
    ///
    /// # Errors
    ///
    /// Fails if any entry is missing from `defaults`.
    pub fn from_defaults(defaults: &EngineDefaults) -> crate::Result<ConnectionPoolSettings> {
        ConnectionPoolSettings::builder()
            .connect_timeout(defaults.duration(DefaultKey::ConnectTimeout)?)
            .read_timeout(defaults.duration(DefaultKey::ReadTimeout)?)
            .idle_timeout(defaults.duration(DefaultKey::PooledIdleTimeout)?)
            .max_connections(defaults.count(DefaultKey::MaxConnections)?)
            .max_connection_lifetime(defaults.lifetime()?)
            .build()
    }

    /// Loads the base configuration from the environment.
    ///
    /// This is [`EngineDefaults::global`] taken as-is: the built-in values
    /// with the `REACTIVE_HTTP_*` overrides applied.
    ///
    /// # Errors
    ///
    /// Fails if an override removed an entry or allows more connections than
    /// [`ConnectionPoolSettingsBuilder::build`] accepts.
    pub fn from_env() -> crate::Result<ConnectionPoolSettings> {
        ConnectionPoolSettings::from_defaults(EngineDefaults::global())
    }

    /// Writes these settings back into the shape of an engine defaults table,
    /// with an unbounded lifetime stored as `0`.
    pub fn to_engine_defaults(&self) -> EngineDefaults {
        EngineDefaults::empty()
            .set(DefaultKey::ConnectTimeout, millis(self.connect_timeout))
            .set(DefaultKey::ReadTimeout, millis(self.read_timeout))
            .set(DefaultKey::PooledIdleTimeout, millis(self.idle_timeout))
            .set(DefaultKey::MaxConnections, self.max_connections as u64)
            .set(
                DefaultKey::ConnectionTtl,
                lifetime_to_millis(self.max_connection_lifetime),
            )
    }

    /// Time allowed to establish a TCP connection.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Time allowed between dispatch and the response head.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Time an unused pooled connection is kept.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Upper bound of connections in use at the same time.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Age after which connections are no longer reused; `None` is unbounded.
    pub fn max_connection_lifetime(&self) -> Option<Duration> {
        self.max_connection_lifetime
    }
}

impl fmt::Debug for ConnectionPoolSettings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("ConnectionPoolSettings");
        builder
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("max_connections", &self.max_connections);

        match self.max_connection_lifetime {
            Some(ref lifetime) => builder.field("max_connection_lifetime", lifetime),
            None => builder.field("max_connection_lifetime", &"unbounded"),
        };

        builder.finish()
    }
}

// ===== impl ConnectionPoolSettingsBuilder =====

impl ConnectionPoolSettingsBuilder {
    /// Set a timeout for only the connect phase.
    pub fn connect_timeout(mut self, timeout: Duration) -> ConnectionPoolSettingsBuilder {
        self.settings.connect_timeout = timeout;
        self
    }

    /// Set a timeout for receiving the response head.
    pub fn read_timeout(mut self, timeout: Duration) -> ConnectionPoolSettingsBuilder {
        self.settings.read_timeout = timeout;
        self
    }

    /// Set an optional timeout for idle sockets being kept-alive.
    pub fn idle_timeout(mut self, timeout: Duration) -> ConnectionPoolSettingsBuilder {
        self.settings.idle_timeout = timeout;
        self
    }

    /// Sets the maximum number of connections in use at once.
    pub fn max_connections(mut self, max: usize) -> ConnectionPoolSettingsBuilder {
        self.settings.max_connections = max;
        self
    }

    /// Sets the maximum connection lifetime.
    ///
    /// Pass `None`, [`Duration::ZERO`] or [`Duration::MAX`] for an unbounded
    /// lifetime.
    pub fn max_connection_lifetime<D>(mut self, lifetime: D) -> ConnectionPoolSettingsBuilder
    where
        D: Into<Option<Duration>>,
    {
        self.settings.max_connection_lifetime = lifetime.into().filter(|d| !is_unbounded(*d));
        self
    }

    /// Returns the settings.
    ///
    /// # Errors
    ///
    /// Fails if `max_connections` is zero or larger than
    /// [`Semaphore::MAX_PERMITS`].
    pub fn build(self) -> crate::Result<ConnectionPoolSettings> {
        if self.settings.max_connections == 0 {
            return Err(crate::Error::config("max connections must be at least 1"));
        }
        if self.settings.max_connections > Semaphore::MAX_PERMITS {
            return Err(crate::Error::config(format!(
                "max connections must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(self.settings)
    }
}

fn is_unbounded(lifetime: Duration) -> bool {
    lifetime.is_zero() || lifetime == Duration::MAX
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn lifetime_from_millis(value: u64) -> Option<Duration> {
    match value {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    }
}

pub(crate) fn lifetime_to_millis(lifetime: Option<Duration>) -> u64 {
    lifetime.map(millis).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_starts_from_builtin_defaults() {
        let settings = ConnectionPoolSettings::builder().build().unwrap();
        let builtin = ConnectionPoolSettings::from_defaults(&EngineDefaults::builtin()).unwrap();
        assert_eq!(settings, builtin);
        assert_eq!(settings.max_connection_lifetime(), None);
    }

    #[test]
    fn zero_max_connections_is_rejected() {
        let err = ConnectionPoolSettings::builder()
            .max_connections(0)
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn max_connections_above_semaphore_limit_is_rejected() {
        let err = ConnectionPoolSettings::builder()
            .max_connections(usize::MAX)
            .build()
            .unwrap_err();
        assert!(err.is_config());

        assert!(ConnectionPoolSettings::builder()
            .max_connections(Semaphore::MAX_PERMITS)
            .build()
            .is_ok());

        let table = EngineDefaults::builtin().set(DefaultKey::MaxConnections, u64::MAX);
        let err = ConnectionPoolSettings::from_defaults(&table).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn unbounded_lifetime_spellings() {
        for lifetime in [None, Some(Duration::ZERO), Some(Duration::MAX)] {
            let settings = ConnectionPoolSettings::builder()
                .max_connection_lifetime(lifetime)
                .build()
                .unwrap();
            assert_eq!(settings.max_connection_lifetime(), None);
        }

        let settings = ConnectionPoolSettings::builder()
            .max_connection_lifetime(Duration::from_secs(4))
            .build()
            .unwrap();
        assert_eq!(
            settings.max_connection_lifetime(),
            Some(Duration::from_secs(4))
        );
    }

    #[test]
    fn lifetime_sentinel_round_trips_through_defaults_table() {
        let table = EngineDefaults::builtin();
        assert_eq!(table.get(DefaultKey::ConnectionTtl), Some(0));

        let settings = ConnectionPoolSettings::from_defaults(&table).unwrap();
        assert_eq!(settings.max_connection_lifetime(), None);
        assert_eq!(settings.to_engine_defaults(), table);

        let bounded = ConnectionPoolSettings::builder()
            .max_connection_lifetime(Duration::from_millis(1500))
            .build()
            .unwrap();
        assert_eq!(
            bounded.to_engine_defaults().get(DefaultKey::ConnectionTtl),
            Some(1500)
        );
    }

    #[test]
    fn missing_default_is_fatal() {
        let table = EngineDefaults::builtin().unset(DefaultKey::ReadTimeout);
        let err = ConnectionPoolSettings::from_defaults(&table).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("readTimeout"));
    }

    #[test]
    fn debug_spells_out_unbounded_lifetime() {
        let settings = ConnectionPoolSettings::builder().build().unwrap();
        assert!(format!("{:?}", settings).contains(r#"max_connection_lifetime: "unbounded""#));
    }
}
