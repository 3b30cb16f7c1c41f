//! A dynamic JSON value model, a tolerant reader/writer, and a draft-4
//! JSON Schema validator.
//!
//! The pieces compose in the order a schema-validating pipeline actually
//! needs them:
//!
//! 1. [`parse`] turns source text into a [`Value`] tree.
//! 2. [`expand`] walks a schema [`Value`] and inlines every `$ref`,
//!    fetching cross-document references through a [`Resolver`] and a
//!    caller-supplied [`Fetcher`].
//! 3. [`compile`] turns the expanded schema into an [`Instruction`].
//! 4. [`validate`] runs a document against a compiled instruction and
//!    returns a `{ok, errors}` report [`Value`].
//!
//! RFC 6901 JSON Pointer and RFC 3986 URI resolution are the plumbing the
//! above stages share internally; [`Value::with`] exposes a configurable
//! structural merge for combining documents outside the validation path
//! entirely.

#![deny(missing_docs)]

mod expand;
mod pointer;
mod resolver;
mod schema;
mod text;
mod uri;
mod value;

pub use expand::{expand, expand_with_options, ExpandError, ExpandOptions};
pub use pointer::{resolve as resolve_pointer, PointerError};
pub use resolver::{FetchError, Fetcher, ResolveError, Resolver, StaticFetcher};
pub use schema::{compile, compile_with_options, validate, CompileError, CompileOptions, Instruction};
pub use text::{parse, ParseError};
pub use value::{
    current_factory, set_global_factory, with_thread_local_factory, AnyValue, DefaultFactory,
    Factory, MergeFlag, MergeOption, Num, PathPolicy, Value, ValueId,
};
