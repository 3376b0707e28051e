//! Header collections on both sides of the adapter.
//!
//! The host SDK hands over a [`HeaderSet`]: names in whatever casing the caller
//! used, each with an ordered list of string values. The engine wants an
//! [`http::HeaderMap`] and carries `Content-Type` and `Content-Length` as
//! first-class request properties. [`translate`] bridges the two.

use std::fmt;

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};

use crate::ContentType;

/// Multi-valued headers as exchanged with the host SDK.
///
/// Lookups ignore ASCII case. The spelling used by the first insertion of a
/// name is the one kept.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, Vec<String>)>,
}

/// Headers converted to the engine's representation.
///
/// Besides the [`HeaderMap`] handed to the engine this keeps the original
/// spelling of every name, in input order.
#[derive(Clone, Default)]
pub struct EngineHeaders {
    map: HeaderMap,
    names: Vec<(HeaderName, String)>,
}

/// The outcome of [`translate`].
#[derive(Debug, Clone)]
pub struct Translated {
    /// The resolved `Content-Type`, if the input carried one.
    pub content_type: Option<ContentType>,
    /// Every header except `Content-Type` and `Content-Length`.
    pub headers: EngineHeaders,
}

/// Splits `headers` into the content type and the ordinary engine headers.
///
/// `Content-Type` is resolved through [`ContentType::resolve`] (the first value
/// wins) and `Content-Length` is dropped: the engine derives the length from
/// the body it actually sends. All other headers pass through in order. The
/// input is left untouched.
///
/// # Errors
///
/// Fails when a name or value cannot be represented by the engine.
pub fn translate(headers: &HeaderSet) -> crate::Result<Translated> {
    let mut content_type = None;
    let mut translated = EngineHeaders::with_capacity(headers.len());

    for (name, values) in headers.iter() {
        if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            if let Some(value) = values.first() {
                content_type = Some(ContentType::resolve(value));
            }
            continue;
        }

        if name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()) {
            continue;
        }

        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(crate::Error::builder)?;
        for value in values {
            let header_value = HeaderValue::from_str(value).map_err(crate::Error::builder)?;
            translated.append(header_name.clone(), name, header_value);
        }
    }

    Ok(Translated {
        content_type,
        headers: translated,
    })
}

// ===== impl HeaderSet =====

impl HeaderSet {
    /// Creates an empty set.
    pub fn new() -> HeaderSet {
        HeaderSet::default()
    }

    /// Appends `value` to the values of `name`.
    pub fn append<N, V>(&mut self, name: N, value: V)
    where
        N: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1.push(value.into()),
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// Replaces all values of `name`.
    pub fn insert<N, V>(&mut self, name: N, values: V)
    where
        N: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let name = name.into();
        let values = values.into_iter().map(Into::into).collect();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = values,
            None => self.entries.push((name, values)),
        }
    }

    /// Builder-style [`append`](HeaderSet::append).
    #[must_use]
    pub fn with<N, V>(mut self, name: N, value: V) -> HeaderSet
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.append(name, value);
        self
    }

    /// Returns all values of `name`.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|idx| self.entries[idx].1.as_slice())
    }

    /// Returns the first value of `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns true if `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes `name`, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set holds no header.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates names with their values, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

impl<N, V> FromIterator<(N, V)> for HeaderSet
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> HeaderSet {
        let mut set = HeaderSet::new();
        for (name, value) in iter {
            set.append(name, value);
        }
        set
    }
}

impl From<&HeaderMap> for HeaderSet {
    fn from(map: &HeaderMap) -> HeaderSet {
        let mut set = HeaderSet::new();
        for (name, value) in map {
            set.append(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        set
    }
}

impl fmt::Debug for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// ===== impl EngineHeaders =====

impl EngineHeaders {
    fn with_capacity(capacity: usize) -> EngineHeaders {
        EngineHeaders {
            map: HeaderMap::with_capacity(capacity),
            names: Vec::with_capacity(capacity),
        }
    }

    fn append(&mut self, name: HeaderName, original: &str, value: HeaderValue) {
        if !self.map.contains_key(&name) {
            self.names.push((name.clone(), original.to_owned()));
        }
        self.map.append(name, value);
    }

    /// The engine-side map.
    pub fn as_map(&self) -> &HeaderMap {
        &self.map
    }

    /// Consumes the headers, returning the engine-side map.
    pub fn into_map(self) -> HeaderMap {
        self.map
    }

    /// Iterates headers with their names spelled as received, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.names.iter().flat_map(move |(name, original)| {
            self.map
                .get_all(name)
                .iter()
                .map(move |value| (original.as_str(), value))
        })
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no header remains.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Debug for EngineHeaders {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
