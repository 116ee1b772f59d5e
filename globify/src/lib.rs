//! Message templates and locale documents for globify.
//!
//! This crate has no network or async code. It provides:
//!
//! - [`parser`]: turns an ICU-style template string into [`MessageNode`]s
//! - [`ast`]: the node model and its canonical textual rendering
//! - [`document`]: the nested key/value tree of a locale file
//! - [`storage`]: reading and writing locale documents as JSON
//!
//! ```
//! use globify::{parse, render};
//!
//! let nodes = parse("Hello, {name}!").unwrap();
//! assert_eq!(nodes.len(), 3);
//! assert_eq!(render(&nodes), "Hello, {name}!");
//! ```

pub mod ast;
pub mod document;
pub mod parser;
pub mod storage;

pub use ast::{
    Argument, Bracing, CATEGORY_ORDER, Choice, Format, MessageNode, NodeKind, Tag,
    ordered_categories, render,
};
pub use document::{Document, DocumentError, Entry, METADATA_MARKER, is_metadata_key};
pub use parser::{MAX_DEPTH, ParseError, Parser, parse};
pub use storage::{JsonStorage, Storage, StorageError, locale_file_path};
