use std::{collections::BTreeMap, fmt, time::Duration};

use log::{debug, warn};
use once_cell::sync::Lazy;

pub(super) const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
pub(super) const READ_TIMEOUT: Duration = Duration::from_secs(30);
pub(super) const POOLED_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub(super) const MAX_CONNECTIONS: usize = 50;

static GLOBAL: Lazy<EngineDefaults> = Lazy::new(EngineDefaults::from_env);

/// Keys of the engine defaults table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DefaultKey {
    /// Connect timeout, in milliseconds.
    ConnectTimeout,
    /// Response head timeout, in milliseconds.
    ReadTimeout,
    /// Pooled connection idle timeout, in milliseconds.
    PooledIdleTimeout,
    /// Maximum number of connections.
    MaxConnections,
    /// Connection time-to-live, in milliseconds. `0` means unbounded.
    ConnectionTtl,
}

impl DefaultKey {
    /// Every key, in table order.
    pub const ALL: [DefaultKey; 5] = [
        DefaultKey::ConnectTimeout,
        DefaultKey::ReadTimeout,
        DefaultKey::PooledIdleTimeout,
        DefaultKey::MaxConnections,
        DefaultKey::ConnectionTtl,
    ];

    /// The property name of this entry.
    pub fn name(self) -> &'static str {
        match self {
            DefaultKey::ConnectTimeout => "connectTimeout",
            DefaultKey::ReadTimeout => "readTimeout",
            DefaultKey::PooledIdleTimeout => "pooledConnectionIdleTimeout",
            DefaultKey::MaxConnections => "maxConnections",
            DefaultKey::ConnectionTtl => "connectionTtl",
        }
    }

    /// The environment variable overriding this entry.
    pub fn env_var(self) -> &'static str {
        match self {
            DefaultKey::ConnectTimeout => "REACTIVE_HTTP_CONNECT_TIMEOUT_MS",
            DefaultKey::ReadTimeout => "REACTIVE_HTTP_READ_TIMEOUT_MS",
            DefaultKey::PooledIdleTimeout => "REACTIVE_HTTP_POOLED_IDLE_TIMEOUT_MS",
            DefaultKey::MaxConnections => "REACTIVE_HTTP_MAX_CONNECTIONS",
            DefaultKey::ConnectionTtl => "REACTIVE_HTTP_CONNECTION_TTL_MS",
        }
    }
}

/// The engine's table of fallback values.
///
/// Durations are stored in milliseconds and the connection TTL uses `0` for
/// "unbounded". An entry may be absent; reading an absent entry through one of
/// the typed accessors is a configuration error.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EngineDefaults {
    entries: BTreeMap<DefaultKey, u64>,
}

impl EngineDefaults {
    /// A table without any entry.
    pub fn empty() -> EngineDefaults {
        EngineDefaults::default()
    }

    /// The values compiled into the crate.
    pub fn builtin() -> EngineDefaults {
        EngineDefaults::empty()
            .set(DefaultKey::ConnectTimeout, CONNECT_TIMEOUT.as_millis() as u64)
            .set(DefaultKey::ReadTimeout, READ_TIMEOUT.as_millis() as u64)
            .set(
                DefaultKey::PooledIdleTimeout,
                POOLED_IDLE_TIMEOUT.as_millis() as u64,
            )
            .set(DefaultKey::MaxConnections, MAX_CONNECTIONS as u64)
            .set(DefaultKey::ConnectionTtl, 0)
    }

    /// The built-in values with overrides from the process environment.
    ///
    /// Each [`DefaultKey::env_var`] that is set replaces its entry. An empty
    /// value removes the entry, a value that is not an unsigned integer is
    /// ignored.
    pub fn from_env() -> EngineDefaults {
        EngineDefaults::builtin().with_overrides(|name| std::env::var(name).ok())
    }

    /// The process-wide table, loaded from the environment on first use.
    pub fn global() -> &'static EngineDefaults {
        &GLOBAL
    }

    pub(crate) fn with_overrides<F>(mut self, lookup: F) -> EngineDefaults
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in DefaultKey::ALL {
            let raw = match lookup(key.env_var()) {
                Some(raw) => raw,
                None => continue,
            };

            let raw = raw.trim();
            if raw.is_empty() {
                debug!("{} is empty, unsetting default {}", key.env_var(), key.name());
                self.entries.remove(&key);
                continue;
            }

            match raw.parse::<u64>() {
                Ok(value) => {
                    debug!("default {} overridden to {}", key.name(), value);
                    self.entries.insert(key, value);
                }
                Err(err) => {
                    warn!("ignoring {}={:?}: {}", key.env_var(), raw, err);
                }
            }
        }
        self
    }

    /// Sets an entry.
    #[must_use]
    pub fn set(mut self, key: DefaultKey, value: u64) -> EngineDefaults {
        self.entries.insert(key, value);
        self
    }

    /// Removes an entry.
    #[must_use]
    pub fn unset(mut self, key: DefaultKey) -> EngineDefaults {
        self.entries.remove(&key);
        self
    }

    /// Returns the raw entry.
    pub fn get(&self, key: DefaultKey) -> Option<u64> {
        self.entries.get(&key).copied()
    }

    /// Returns the raw entry, failing if it is missing.
    ///
    /// # Errors
    ///
    /// A missing entry is a configuration error.
    pub fn require(&self, key: DefaultKey) -> crate::Result<u64> {
        self.get(key).ok_or_else(|| {
            crate::Error::config(format!("engine default `{}` is not set", key.name()))
        })
    }

    /// Reads a millisecond entry.
    ///
    /// # Errors
    ///
    /// A missing entry is a configuration error.
    pub fn duration(&self, key: DefaultKey) -> crate::Result<Duration> {
        self.require(key).map(Duration::from_millis)
    }

    /// Reads a count entry.
    ///
    /// # Errors
    ///
    /// A missing entry is a configuration error.
    pub fn count(&self, key: DefaultKey) -> crate::Result<usize> {
        self.require(key)
            .map(|value| usize::try_from(value).unwrap_or(usize::MAX))
    }

    /// Reads the connection TTL, translating `0` to an unbounded lifetime.
    ///
    /// # Errors
    ///
    /// A missing entry is a configuration error.
    pub fn lifetime(&self) -> crate::Result<Option<Duration>> {
        self.require(DefaultKey::ConnectionTtl)
            .map(super::lifetime_from_millis)
    }

    /// Iterates the entries present, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (DefaultKey, u64)> + '_ {
        self.entries.iter().map(|(key, value)| (*key, *value))
    }
}

impl fmt::Debug for EngineDefaults {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(key, value)| (key.name(), value)))
            .finish()
    }
}
