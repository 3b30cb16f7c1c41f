//! Base-URI composition for `$ref`/`id` resolution.
//!
//! RFC 3986 reference resolution is exactly what [`url::Url::join`] does;
//! this module just names the two operations the resolver and expander
//! need on top of it.

use url::Url;

/// Resolves `reference` against `base` per RFC 3986: an absolute
/// reference replaces `base` outright, a reference with only a fragment
/// keeps `base`'s path and swaps the fragment, and anything in between
/// resolves relative to `base`'s path.
pub fn resolve(base: &Url, reference: &str) -> Result<Url, url::ParseError> {
    base.join(reference)
}

/// `uri` with its fragment stripped, for use as a document-cache key
/// (two URIs differing only by fragment name the same document).
pub fn without_fragment(uri: &Url) -> Url {
    let mut out = uri.clone();
    out.set_fragment(None);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_only_reference_keeps_base_path() {
        let base: Url = "https://example.com/schemas/root.json".parse().unwrap();
        let resolved = resolve(&base, "#/definitions/foo").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/schemas/root.json#/definitions/foo");
    }

    #[test]
    fn relative_reference_resolves_against_base_path() {
        let base: Url = "https://example.com/schemas/root.json".parse().unwrap();
        let resolved = resolve(&base, "other.json#/a").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/schemas/other.json#/a");
    }

    #[test]
    fn absolute_reference_replaces_base_entirely() {
        let base: Url = "https://example.com/schemas/root.json".parse().unwrap();
        let resolved = resolve(&base, "https://other.org/x.json").unwrap();
        assert_eq!(resolved.as_str(), "https://other.org/x.json");
    }

    #[test]
    fn without_fragment_strips_only_the_fragment() {
        let uri: Url = "https://example.com/schemas/root.json#/a/b".parse().unwrap();
        assert_eq!(without_fragment(&uri).as_str(), "https://example.com/schemas/root.json");
    }
}
