//! Structured media types for request and response bodies.
//!
//! [`ContentType::resolve`] never fails. A string naming one of the
//! well-known media types yields the canonical registered instance, anything
//! else is kept verbatim as a custom type.

use std::{convert::Infallible, fmt, str::FromStr};

use encoding_rs::Encoding;
use mime::Mime;
use once_cell::sync::Lazy;

/// Media types that are not exported as constants by `mime` but are common
/// enough in service APIs to be registered.
const EXTRA_WELL_KNOWN: &[&str] = &[
    "application/xml",
    "application/cbor",
    "application/gzip",
    "application/zip",
    "application/x-ndjson",
    "application/problem+json",
];

static REGISTRY: Lazy<Vec<Mime>> = Lazy::new(|| {
    let mut registry = vec![
        mime::STAR_STAR,
        mime::TEXT_STAR,
        mime::TEXT_PLAIN,
        mime::TEXT_PLAIN_UTF_8,
        mime::TEXT_HTML,
        mime::TEXT_HTML_UTF_8,
        mime::TEXT_CSS,
        mime::TEXT_CSV,
        mime::TEXT_CSV_UTF_8,
        mime::TEXT_JAVASCRIPT,
        mime::TEXT_XML,
        mime::TEXT_EVENT_STREAM,
        mime::TEXT_TAB_SEPARATED_VALUES,
        mime::TEXT_TAB_SEPARATED_VALUES_UTF_8,
        mime::TEXT_VCARD,
        mime::IMAGE_STAR,
        mime::IMAGE_JPEG,
        mime::IMAGE_GIF,
        mime::IMAGE_PNG,
        mime::IMAGE_BMP,
        mime::IMAGE_SVG,
        mime::FONT_WOFF,
        mime::FONT_WOFF2,
        mime::APPLICATION_JSON,
        mime::APPLICATION_JAVASCRIPT,
        mime::APPLICATION_JAVASCRIPT_UTF_8,
        mime::APPLICATION_WWW_FORM_URLENCODED,
        mime::APPLICATION_OCTET_STREAM,
        mime::APPLICATION_MSGPACK,
        mime::APPLICATION_PDF,
        mime::MULTIPART_FORM_DATA,
    ];
    registry.extend(EXTRA_WELL_KNOWN.iter().filter_map(|raw| raw.parse().ok()));
    registry
});

/// A media type, optionally carrying a charset parameter.
#[derive(Clone)]
pub struct ContentType(Repr);

#[derive(Clone)]
enum Repr {
    Registered(&'static Mime),
    Custom { raw: Box<str>, mime: Option<Mime> },
}

// ===== impl ContentType =====

impl ContentType {
    /// Resolves a raw `Content-Type` value.
    ///
    /// # Examples
    ///
    /// ```
    /// use reactive_http_client::ContentType;
    ///
    /// let json = ContentType::resolve("application/json");
    /// assert!(json.is_registered());
    ///
    /// let vendor = ContentType::resolve("application/vnd.example+json; version=2");
    /// assert!(!vendor.is_registered());
    /// assert_eq!(vendor.as_str(), "application/vnd.example+json; version=2");
    /// ```
    pub fn resolve(raw: &str) -> ContentType {
        let parsed = raw.trim().parse::<Mime>().ok();

        if let Some(ref mime) = parsed {
            if let Some(registered) = REGISTRY.iter().find(|known| *known == mime) {
                return ContentType(Repr::Registered(registered));
            }
        }

        ContentType(Repr::Custom {
            raw: raw.into(),
            mime: parsed,
        })
    }

    /// Looks up the registered instance for `raw`, without falling back to a
    /// custom type.
    pub fn well_known(raw: &str) -> Option<ContentType> {
        let resolved = ContentType::resolve(raw);
        if resolved.is_registered() {
            Some(resolved)
        } else {
            None
        }
    }

    /// Returns the canonical registry entry this type resolved to.
    pub fn as_registered(&self) -> Option<&'static Mime> {
        match self.0 {
            Repr::Registered(mime) => Some(mime),
            Repr::Custom { .. } => None,
        }
    }

    /// Returns true if this is one of the well-known media types.
    pub fn is_registered(&self) -> bool {
        matches!(self.0, Repr::Registered(_))
    }

    /// The parsed media type, when the string was syntactically valid.
    pub fn mime(&self) -> Option<&Mime> {
        match self.0 {
            Repr::Registered(mime) => Some(mime),
            Repr::Custom { ref mime, .. } => mime.as_ref(),
        }
    }

    /// The media type without parameters, e.g. `text/plain`.
    ///
    /// Unparsable custom types return their full string.
    pub fn essence(&self) -> &str {
        match self.mime() {
            Some(mime) => mime.essence_str(),
            None => self.as_str(),
        }
    }

    /// The `charset` parameter, if present.
    pub fn charset(&self) -> Option<&str> {
        self.mime()
            .and_then(|m| m.get_param(mime::CHARSET))
            .map(|charset| charset.as_str())
    }

    /// The text encoding named by the `charset` parameter, if it is a known
    /// label.
    pub fn encoding(&self) -> Option<&'static Encoding> {
        self.charset()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
    }

    /// The string form: the canonical spelling for registered types, the
    /// original input for custom ones.
    pub fn as_str(&self) -> &str {
        match self.0 {
            Repr::Registered(mime) => mime.as_ref(),
            Repr::Custom { ref raw, .. } => raw,
        }
    }
}

impl PartialEq for ContentType {
    fn eq(&self, other: &ContentType) -> bool {
        match (self.mime(), other.mime()) {
            (Some(a), Some(b)) => a == b,
            _ => self.as_str().eq_ignore_ascii_case(other.as_str()),
        }
    }
}

impl Eq for ContentType {}

impl PartialEq<str> for ContentType {
    fn eq(&self, other: &str) -> bool {
        *self == ContentType::resolve(other)
    }
}

impl PartialEq<&str> for ContentType {
    fn eq(&self, other: &&str) -> bool {
        *self == ContentType::resolve(other)
    }
}

impl FromStr for ContentType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<ContentType, Infallible> {
        Ok(ContentType::resolve(s))
    }
}

impl From<Mime> for ContentType {
    fn from(mime: Mime) -> ContentType {
        ContentType::resolve(mime.as_ref())
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Repr::Registered(mime) => f.debug_tuple("Registered").field(&mime.as_ref()).finish(),
            Repr::Custom { ref raw, .. } => f.debug_tuple("Custom").field(raw).finish(),
        }
    }
}
