use std::sync::Arc;

use log::debug;

use super::{ConnectionPoolSettings, DefaultKey, EngineDefaults};
use crate::attribute::{
    AttributeMap, ConnectionMaxIdleTimeout, ConnectionTimeToLive, ConnectionTimeout,
    MaxConnections, ReadTimeout,
};

/// A caller-supplied function producing the settings from the attribute map
/// and the engine defaults.
pub type SettingsBuilder = Arc<
    dyn Fn(&AttributeMap, &EngineDefaults) -> crate::Result<ConnectionPoolSettings> + Send + Sync,
>;

/// Resolves the settings a client will be bound to.
///
/// Sources are consulted in this order:
///
/// 1. `builder`, if present, is called with `attributes` (or an empty map) and
///    `defaults`, and its result is returned verbatim;
/// 2. `attributes`, if present, is read option by option through
///    [`from_attribute_map`];
/// 3. otherwise the base configuration returned by `base` is used as-is.
///
/// `base` is only called in step 3, and `defaults` is never read there.
///
/// # Errors
///
/// Fails when a default needed by step 2 is missing from `defaults`, with
/// whatever error `builder` returns, or with the error of `base`.
pub fn resolve<F>(
    builder: Option<&SettingsBuilder>,
    attributes: Option<&AttributeMap>,
    defaults: &EngineDefaults,
    base: F,
) -> crate::Result<ConnectionPoolSettings>
where
    F: FnOnce() -> crate::Result<ConnectionPoolSettings>,
{
    let settings = match (builder, attributes) {
        (Some(builder), attributes) => {
            debug!("resolving connection pool settings with custom builder");
            let empty;
            let attributes = match attributes {
                Some(attributes) => attributes,
                None => {
                    empty = AttributeMap::empty();
                    &empty
                }
            };
            (**builder)(attributes, defaults)?
        }
        (None, Some(attributes)) => {
            debug!("resolving connection pool settings from {:?}", attributes);
            from_attribute_map(attributes, defaults)?
        }
        (None, None) => {
            debug!("using base configuration as connection pool settings");
            base()?
        }
    };

    debug!("resolved {:?}", settings);
    Ok(settings)
}

/// Reads every option from `attributes`, falling back to the matching entry of
/// `defaults` for options the map does not carry.
///
/// A TTL option of [`Duration::ZERO`](std::time::Duration::ZERO) or
/// [`Duration::MAX`](std::time::Duration::MAX) is an unbounded lifetime, as is
/// a `0` TTL entry in `defaults`.
///
/// # Errors
///
/// Fails if an option is absent from both sources.
pub fn from_attribute_map(
    attributes: &AttributeMap,
    defaults: &EngineDefaults,
) -> crate::Result<ConnectionPoolSettings> {
    let connect_timeout = match attributes.get::<ConnectionTimeout>() {
        Some(timeout) => *timeout,
        None => defaults.duration(DefaultKey::ConnectTimeout)?,
    };

    let read_timeout = match attributes.get::<ReadTimeout>() {
        Some(timeout) => *timeout,
        None => defaults.duration(DefaultKey::ReadTimeout)?,
    };

    let idle_timeout = match attributes.get::<ConnectionMaxIdleTimeout>() {
        Some(timeout) => *timeout,
        None => defaults.duration(DefaultKey::PooledIdleTimeout)?,
    };

    let max_connections = match attributes.get::<MaxConnections>() {
        Some(max) => *max,
        None => defaults.count(DefaultKey::MaxConnections)?,
    };

    let lifetime = match attributes.get::<ConnectionTimeToLive>() {
        Some(ttl) => Some(*ttl),
        None => defaults.lifetime()?,
    };

    ConnectionPoolSettings::builder()
        .connect_timeout(connect_timeout)
        .read_timeout(read_timeout)
        .idle_timeout(idle_timeout)
        .max_connections(max_connections)
        .max_connection_lifetime(lifetime)
        .build()
}
