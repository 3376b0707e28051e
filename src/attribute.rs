//! Typed configuration options handed over by the host SDK.
//!
//! # Design Overview
//!
//! Every option is a zero-sized marker type implementing [`HttpConfigOption`],
//! which links the marker to its value type. An [`AttributeMap`] stores at most
//! one value per marker inside [`http::Extensions`], so two options sharing a
//! value type (for example several [`Duration`]s) never collide and lookups are
//! type-checked at compile time.
//!
//! ```
//! use std::time::Duration;
//! use reactive_http_client::attribute::{AttributeMap, ConnectionTimeout, MaxConnections};
//!
//! let attributes = AttributeMap::builder()
//!     .put::<ConnectionTimeout>(Duration::from_secs(1))
//!     .put::<MaxConnections>(8)
//!     .build();
//!
//! assert_eq!(attributes.get::<ConnectionTimeout>(), Some(&Duration::from_secs(1)));
//! assert_eq!(attributes.get::<MaxConnections>(), Some(&8));
//! ```

use std::{fmt, sync::Arc, time::Duration};

use http::Extensions;

/// Associates a configuration option marker with the type of its value.
pub trait HttpConfigOption: Copy + Clone + Send + Sync + 'static {
    /// The type of the value stored for this option.
    type Value: Clone + fmt::Debug + Send + Sync + 'static;

    /// Name used when printing an [`AttributeMap`].
    const NAME: &'static str;
}

/// Time allowed to establish a connection.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionTimeout;

impl HttpConfigOption for ConnectionTimeout {
    type Value = Duration;
    const NAME: &'static str = "ConnectionTimeout";
}

/// Time allowed between dispatching a request and receiving the response head.
#[derive(Clone, Copy, Debug)]
pub struct ReadTimeout;

impl HttpConfigOption for ReadTimeout {
    type Value = Duration;
    const NAME: &'static str = "ReadTimeout";
}

/// Upper bound of concurrently open connections.
#[derive(Clone, Copy, Debug)]
pub struct MaxConnections;

impl HttpConfigOption for MaxConnections {
    type Value = usize;
    const NAME: &'static str = "MaxConnections";
}

/// Time a pooled connection may stay idle before it is closed.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionMaxIdleTimeout;

impl HttpConfigOption for ConnectionMaxIdleTimeout {
    type Value = Duration;
    const NAME: &'static str = "ConnectionMaxIdleTimeout";
}

/// Maximum lifetime of a connection.
///
/// [`Duration::ZERO`] and [`Duration::MAX`] both mean the lifetime is unbounded.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionTimeToLive;

impl HttpConfigOption for ConnectionTimeToLive {
    type Value = Duration;
    const NAME: &'static str = "ConnectionTimeToLive";
}

#[derive(Clone)]
struct Attribute<T: HttpConfigOption>(T::Value);

/// An immutable, cheaply cloneable bag of typed configuration options.
#[derive(Clone, Default)]
pub struct AttributeMap {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    values: Extensions,
    entries: Vec<(&'static str, String)>,
}

/// Accumulates options for a new [`AttributeMap`].
#[must_use]
#[derive(Default)]
pub struct AttributeMapBuilder {
    inner: Inner,
}

// ===== impl AttributeMap =====

impl AttributeMap {
    /// Creates a map without any option.
    pub fn empty() -> AttributeMap {
        AttributeMap::default()
    }

    /// Starts building a new map.
    pub fn builder() -> AttributeMapBuilder {
        AttributeMapBuilder::default()
    }

    /// Returns the value stored for option `T`, if any.
    #[inline]
    pub fn get<T: HttpConfigOption>(&self) -> Option<&T::Value> {
        self.inner.values.get::<Attribute<T>>().map(|v| &v.0)
    }

    /// Returns true if a value is stored for option `T`.
    #[inline]
    pub fn contains<T: HttpConfigOption>(&self) -> bool {
        self.get::<T>().is_some()
    }

    /// Number of options present.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns true if no option is present.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

impl fmt::Debug for AttributeMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

// ===== impl AttributeMapBuilder =====

impl AttributeMapBuilder {
    /// Stores `value` for option `T`, replacing a previous value.
    pub fn put<T: HttpConfigOption>(mut self, value: T::Value) -> AttributeMapBuilder {
        let printed = format!("{:?}", value);
        match self.inner.entries.iter_mut().find(|(name, _)| *name == T::NAME) {
            Some(entry) => entry.1 = printed,
            None => self.inner.entries.push((T::NAME, printed)),
        }
        self.inner.values.insert(Attribute::<T>(value));
        self
    }

    /// Finishes the map.
    pub fn build(self) -> AttributeMap {
        AttributeMap {
            inner: Arc::new(self.inner),
        }
    }
}

impl fmt::Debug for AttributeMapBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AttributeMapBuilder")
            .field("entries", &self.inner.entries)
            .finish()
    }
}
