//! Walks a schema value and replaces every `$ref` subtree with its
//! resolved target, in place.
//!
//! Two identity-keyed tables make this terminate on recursive schemas:
//! an **expanded set** (which nodes have already had their own children
//! walked) stops re-descending into a node reached a second time by
//! ordinary structural recursion, and a **resolved map** (absolute URI to
//! already-resolved target) stops re-fetching or re-expanding the same
//! `$ref` target — including when that target is *itself* still being
//! expanded, which is exactly what makes a self-referential schema like
//! `{"id": "urn:t", "properties": {"child": {"$ref": "urn:t"}}}` expand
//! without infinite recursion: the inner `$ref` finds the resolved map
//! entry for `urn:t` already present (pointing at the in-progress root)
//! and reuses that handle instead of recursing again.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use url::Url;

use crate::pointer;
use crate::resolver::{Fetcher, ResolveError, Resolver};
use crate::uri;
use crate::value::{Value, ValueId};

/// Everything that can go wrong expanding `$ref`s in a schema tree.
#[derive(Debug, Error, Clone)]
pub enum ExpandError {
    /// Fetching, parsing, or pointer-resolving a `$ref` target failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A `$ref` or `id` string was not a valid URI reference against its
    /// enclosing base.
    #[error("invalid URI reference {reference:?} against base {base}: {source}")]
    BadUri {
        /// The `$ref`/`id` string that failed to parse.
        reference: String,
        /// The base URI it was resolved against.
        base: Url,
        /// The underlying URI parse error.
        source: url::ParseError,
    },
    /// `$ref` was present but not a string.
    #[error("\"$ref\" value must be a string")]
    BadRef,
    /// Following a chain of `$ref`s exceeded
    /// [`ExpandOptions::max_ref_depth`]. A stack-overflow guard, not a
    /// draft-4 validity rule: a genuinely cyclic schema terminates on its
    /// own (see the module docs) long before this limit matters, so
    /// tripping it means a very long, non-cyclic `$ref` chain.
    #[error("following \"$ref\" chain exceeded the maximum depth of {limit}")]
    MaxRefDepthExceeded {
        /// The configured limit that was exceeded.
        limit: usize,
    },
}

/// Options controlling the reference expansion pass.
#[derive(Clone, Copy, Debug)]
pub struct ExpandOptions {
    /// The maximum number of `$ref` hops followed before giving up with
    /// [`ExpandError::MaxRefDepthExceeded`]. This guards against a
    /// pathologically long (but non-cyclic) chain of references blowing
    /// the call stack; genuine cycles already terminate via the resolved
    /// map regardless of this limit.
    pub max_ref_depth: usize,
}

impl Default for ExpandOptions {
    fn default() -> ExpandOptions {
        ExpandOptions { max_ref_depth: 128 }
    }
}

struct ExpandCtx<'a> {
    expanded: HashSet<ValueId>,
    resolved: HashMap<String, Value>,
    resolver: &'a Resolver,
    fetcher: &'a dyn Fetcher,
    ref_depth: usize,
    max_ref_depth: usize,
}

/// Expands `root` (a schema document whose absolute URI is `base`) in
/// place: every `$ref` subtree is replaced with its resolved target.
/// Cross-document references are retrieved through `resolver`, which
/// calls `fetcher` for documents it hasn't cached yet. Equivalent to
/// `expand_with_options(root, base, resolver, fetcher, ExpandOptions::default())`.
pub fn expand(root: &Value, base: &Url, resolver: &Resolver, fetcher: &dyn Fetcher) -> Result<(), ExpandError> {
    expand_with_options(root, base, resolver, fetcher, ExpandOptions::default())
}

/// Like [`expand`], honoring `options`.
pub fn expand_with_options(
    root: &Value,
    base: &Url,
    resolver: &Resolver,
    fetcher: &dyn Fetcher,
    options: ExpandOptions,
) -> Result<(), ExpandError> {
    resolver.seed(base, root.clone());
    let mut ctx = ExpandCtx {
        expanded: HashSet::new(),
        resolved: HashMap::new(),
        resolver,
        fetcher,
        ref_depth: 0,
        max_ref_depth: options.max_ref_depth,
    };
    expand_in_document(root, base, root, base, &mut ctx)?;
    Ok(())
}

/// Expands `node`, interpreting any `id`/`$ref` on it relative to
/// `scope_base`, with `doc_root`/`doc_base` identifying the in-memory
/// document `node` lives in (so same-document `$ref`s can be resolved by
/// pointer lookup instead of a fetch).
fn expand_in_document(
    node: &Value,
    scope_base: &Url,
    doc_root: &Value,
    doc_base: &Url,
    ctx: &mut ExpandCtx,
) -> Result<Value, ExpandError> {
    if node.is_array() {
        for i in 0..node.len() {
            let child = node.at(i);
            let replaced = expand_in_document(&child, scope_base, doc_root, doc_base, ctx)?;
            node.set_at(i, replaced);
        }
        return Ok(node.clone());
    }

    if !node.is_object() {
        return Ok(node.clone());
    }

    let id = node.identity();
    if ctx.expanded.contains(&id) {
        return Ok(node.clone());
    }

    let own_base = match node.get("id").and_then(|v| v.as_str_internal()) {
        Some(id_ref) => resolve_uri(scope_base, &id_ref)?,
        None => scope_base.clone(),
    };

    if let Some(ref_value) = node.get("$ref") {
        let ref_str = ref_value.as_str_internal().ok_or(ExpandError::BadRef)?;
        let target_uri = resolve_uri(&own_base, &ref_str)?;
        let key = target_uri.to_string();
        if let Some(existing) = ctx.resolved.get(&key) {
            tracing::debug!(ref_uri = %key, "ref already resolved, reusing handle");
            return Ok(existing.clone());
        }
        tracing::debug!(ref_uri = %key, "expanding ref");
        if ctx.ref_depth >= ctx.max_ref_depth {
            return Err(ExpandError::MaxRefDepthExceeded { limit: ctx.max_ref_depth });
        }
        ctx.ref_depth += 1;

        let same_document = uri::without_fragment(&target_uri) == uri::without_fragment(doc_base);
        let (target_value, target_doc_root, target_doc_base) = if same_document {
            let resolved = pointer::resolve(doc_root, target_uri.fragment().unwrap_or(""))
                .map_err(|source| ExpandError::Resolve(ResolveError::Pointer { uri: target_uri.clone(), source }))?;
            (resolved, doc_root.clone(), doc_base.clone())
        } else {
            let target_doc_base = uri::without_fragment(&target_uri);
            let fetched = ctx.resolver.document_for(&target_doc_base, ctx.fetcher)?;
            let resolved = pointer::resolve(&fetched, target_uri.fragment().unwrap_or(""))
                .map_err(|source| ExpandError::Resolve(ResolveError::Pointer { uri: target_uri.clone(), source }))?;
            (resolved, fetched, target_doc_base)
        };

        // Register before recursing: a cycle back to this same URI during
        // the recursive expand below must see this entry already present.
        ctx.resolved.insert(key.clone(), target_value.clone());
        let fully_expanded =
            expand_in_document(&target_value, &target_doc_base, &target_doc_root, &target_doc_base, ctx);
        ctx.ref_depth -= 1;
        let fully_expanded = fully_expanded?;
        ctx.resolved.insert(key, fully_expanded.clone());
        return Ok(fully_expanded);
    }

    ctx.expanded.insert(id);
    for (key, child) in node.object_snapshot().expect("checked is_object above") {
        let replaced = expand_in_document(&child, &own_base, doc_root, doc_base, ctx)?;
        node.set(key, replaced);
    }
    Ok(node.clone())
}

fn resolve_uri(base: &Url, reference: &str) -> Result<Url, ExpandError> {
    uri::resolve(base, reference).map_err(|source| ExpandError::BadUri {
        reference: reference.to_string(),
        base: base.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticFetcher;

    #[test]
    fn self_recursive_ref_terminates_and_shares_the_root_node() {
        let schema = crate::text::parse(
            r#"{"id":"urn:t","type":"object","properties":{"child":{"$ref":"urn:t"}}}"#,
        )
        .unwrap();
        let base: Url = "urn:t".parse().unwrap();
        let resolver = Resolver::new();
        let fetcher = StaticFetcher::new();
        expand(&schema, &base, &resolver, &fetcher).unwrap();

        let child_schema = schema.get("properties").unwrap().get("child").unwrap();
        assert!(child_schema.is_object());
        assert!(!child_schema.has("$ref"));
        assert_eq!(child_schema.identity(), schema.identity());
    }

    #[test]
    fn cross_document_ref_is_fetched_and_inlined() {
        let fetcher = StaticFetcher::new()
            .register("https://example.com/defs.json", r#"{"type":"string"}"#);
        let schema = crate::text::parse(
            r#"{"type":"object","properties":{"name":{"$ref":"https://example.com/defs.json"}}}"#,
        )
        .unwrap();
        let base: Url = "https://example.com/root.json".parse().unwrap();
        let resolver = Resolver::new();
        expand(&schema, &base, &resolver, &fetcher).unwrap();

        let name_schema = schema.get("properties").unwrap().get("name").unwrap();
        assert_eq!(name_schema.get("type").unwrap(), Value::string("string"));
        assert!(!name_schema.has("$ref"));
    }

    #[test]
    fn long_ref_chain_exceeding_max_depth_is_an_error() {
        let schema = crate::text::parse(
            r##"{
                "$ref": "#/defs/a0",
                "defs": {
                    "a0": {"$ref": "#/defs/a1"},
                    "a1": {"$ref": "#/defs/a2"},
                    "a2": {"$ref": "#/defs/a3"},
                    "a3": {"type": "string"}
                }
            }"##,
        )
        .unwrap();
        let base: Url = "urn:chain".parse().unwrap();
        let resolver = Resolver::new();
        let fetcher = StaticFetcher::new();
        let err = expand_with_options(&schema, &base, &resolver, &fetcher, ExpandOptions { max_ref_depth: 2 })
            .unwrap_err();
        assert!(matches!(err, ExpandError::MaxRefDepthExceeded { limit: 2 }));
    }

    #[test]
    fn non_string_ref_is_an_error() {
        let schema = crate::text::parse(r#"{"$ref":5}"#).unwrap();
        let base: Url = "urn:t".parse().unwrap();
        let resolver = Resolver::new();
        let fetcher = StaticFetcher::new();
        let err = expand(&schema, &base, &resolver, &fetcher).unwrap_err();
        assert!(matches!(err, ExpandError::BadRef));
    }
}
