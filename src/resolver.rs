//! Fetches and caches the documents a `$ref` points into, keyed by
//! absolute URI (fragment stripped), and evaluates the fragment as a JSON
//! Pointer against whichever document it names.

use std::cell::RefCell;
use std::collections::BTreeMap;

use thiserror::Error;
use url::Url;

use crate::pointer::{self, PointerError};
use crate::text;
use crate::uri;
use crate::value::Value;

/// Supplies the raw text of a document a [`Resolver`] hasn't cached yet.
/// Implement this to fetch over the network, read from a bundle directory,
/// or (in tests) serve from an in-memory table — the resolver performs no
/// I/O of its own.
pub trait Fetcher {
    /// Returns the JSON text at `uri`.
    fn fetch(&self, uri: &Url) -> Result<String, FetchError>;
}

/// Why a [`Fetcher`] could not produce a document's text.
#[derive(Debug, Error, Clone)]
#[error("failed to fetch {uri}: {reason}")]
pub struct FetchError {
    /// The URI the fetcher was asked to retrieve.
    pub uri: Url,
    /// A human-readable description of why the fetch failed.
    pub reason: String,
}

/// Everything that can go wrong resolving a `$ref` URI into a [`Value`].
#[derive(Debug, Error, Clone)]
pub enum ResolveError {
    /// The fetcher could not retrieve the document.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The fetched text was not valid JSON.
    #[error("document at {uri} is not valid JSON: {source}")]
    Parse {
        /// The document URI that was fetched.
        uri: Url,
        /// The underlying parse error.
        source: text::ParseError,
    },
    /// The document was valid JSON, but the reference's fragment did not
    /// resolve as a JSON Pointer within it.
    #[error("bad pointer into {uri}: {source}")]
    Pointer {
        /// The full reference URI whose fragment failed to resolve.
        uri: Url,
        /// The underlying pointer error.
        source: PointerError,
    },
    /// `reference` was not a valid URI reference against `base`.
    #[error("invalid URI reference {reference:?} against base {base}: {source}")]
    BadUri {
        /// The reference string that failed to parse.
        reference: String,
        /// The base URI it was resolved against.
        base: Url,
        /// The underlying URI parse error.
        source: url::ParseError,
    },
}

/// A cache of parsed documents, keyed by absolute URI with the fragment
/// stripped. One `Resolver` is typically shared across an entire `$ref`
/// expansion or schema compilation pass, so that every reference to the
/// same document reuses one fetch and one parse.
#[derive(Default)]
pub struct Resolver {
    documents: RefCell<BTreeMap<String, Value>>,
}

impl Resolver {
    /// A resolver with an empty document cache.
    pub fn new() -> Resolver {
        Resolver::default()
    }

    /// Resolves `reference` against `base` (see [`uri::resolve`]),
    /// fetching and parsing the target document through `fetcher` if it is
    /// not already cached, then evaluating the reference's fragment as a
    /// JSON Pointer against it.
    pub fn resolve(
        &self,
        base: &Url,
        reference: &str,
        fetcher: &dyn Fetcher,
    ) -> Result<Value, ResolveError> {
        let target = uri::resolve(base, reference).map_err(|source| ResolveError::BadUri {
            reference: reference.to_string(),
            base: base.clone(),
            source,
        })?;
        let document = self.document_for(&target, fetcher)?;
        let pointer = target.fragment().unwrap_or("");
        pointer::resolve(&document, pointer).map_err(|source| ResolveError::Pointer {
            uri: target.clone(),
            source,
        })
    }

    /// Returns the cached document at `uri` (fragment ignored), fetching
    /// and parsing it first if this is the first time it's been needed.
    pub fn document_for(&self, uri: &Url, fetcher: &dyn Fetcher) -> Result<Value, ResolveError> {
        let key = uri::without_fragment(uri).to_string();
        if let Some(existing) = self.documents.borrow().get(&key) {
            tracing::debug!(uri = %key, "document cache hit");
            return Ok(existing.clone());
        }
        let doc_uri = uri::without_fragment(uri);
        tracing::debug!(uri = %doc_uri, "fetching document");
        let text = fetcher.fetch(&doc_uri)?;
        let parsed = text::reader::parse(&text).map_err(|source| ResolveError::Parse {
            uri: doc_uri.clone(),
            source,
        })?;
        self.documents.borrow_mut().insert(key, parsed.clone());
        Ok(parsed)
    }

    /// Seeds the cache with an already-parsed document, so a caller that
    /// already holds the root schema in memory doesn't need a [`Fetcher`]
    /// round trip just to resolve references within it.
    pub fn seed(&self, uri: &Url, document: Value) {
        self.documents.borrow_mut().insert(uri::without_fragment(uri).to_string(), document);
    }
}

/// A [`Fetcher`] that only ever serves documents pre-registered with
/// [`StaticFetcher::register`] — used in tests, and for embedding a fixed
/// set of schemas that should never hit the network.
#[derive(Default)]
pub struct StaticFetcher {
    documents: BTreeMap<String, String>,
}

impl StaticFetcher {
    /// An empty static fetcher.
    pub fn new() -> StaticFetcher {
        StaticFetcher::default()
    }

    /// Registers the text to serve for `uri`.
    pub fn register(mut self, uri: impl Into<String>, text: impl Into<String>) -> StaticFetcher {
        self.documents.insert(uri.into(), text.into());
        self
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, uri: &Url) -> Result<String, FetchError> {
        self.documents.get(uri.as_str()).cloned().ok_or_else(|| FetchError {
            uri: uri.clone(),
            reason: "no document registered for this URI".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_fragment_within_a_fetched_document() {
        let fetcher = StaticFetcher::new()
            .register("https://example.com/root.json", r#"{"definitions":{"foo":{"type":"string"}}}"#);
        let resolver = Resolver::new();
        let base: Url = "https://example.com/root.json".parse().unwrap();
        let resolved = resolver.resolve(&base, "#/definitions/foo", &fetcher).unwrap();
        assert_eq!(resolved.get("type").unwrap(), Value::string("string"));
    }

    #[test]
    fn caches_document_across_repeated_resolves() {
        struct CountingFetcher {
            calls: RefCell<usize>,
        }
        impl Fetcher for CountingFetcher {
            fn fetch(&self, _uri: &Url) -> Result<String, FetchError> {
                *self.calls.borrow_mut() += 1;
                Ok(r#"{"a":1}"#.to_string())
            }
        }
        let fetcher = CountingFetcher { calls: RefCell::new(0) };
        let resolver = Resolver::new();
        let base: Url = "https://example.com/root.json".parse().unwrap();
        resolver.resolve(&base, "#/a", &fetcher).unwrap();
        resolver.resolve(&base, "#/a", &fetcher).unwrap();
        assert_eq!(*fetcher.calls.borrow(), 1);
    }

    #[test]
    fn unknown_document_surfaces_fetch_error() {
        let fetcher = StaticFetcher::new();
        let resolver = Resolver::new();
        let base: Url = "https://example.com/missing.json".parse().unwrap();
        let err = resolver.resolve(&base, "#/a", &fetcher).unwrap_err();
        assert!(matches!(err, ResolveError::Fetch(_)));
    }

    #[test]
    fn seeded_document_skips_the_fetcher() {
        struct PanicFetcher;
        impl Fetcher for PanicFetcher {
            fn fetch(&self, uri: &Url) -> Result<String, FetchError> {
                panic!("should not be called for {uri}")
            }
        }
        let resolver = Resolver::new();
        let base: Url = "https://example.com/root.json".parse().unwrap();
        let doc = Value::object();
        doc.set("a", 1i64);
        resolver.seed(&base, doc);
        let resolved = resolver.resolve(&base, "#/a", &PanicFetcher).unwrap();
        assert_eq!(resolved, Value::number(1i64));
    }
}
