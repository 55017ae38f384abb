//! Pipeline stages for wiki-page-to-record extraction.
//!
//! Each submodule implements exactly one transformation step so every rule
//! can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! tree ──▶ record ──▶ fields ──▶ inline ──▶ image / links
//! (XML)   (template)  (parts)    (markup)   ([[…]] tags)
//!                                                │
//!                                   render ◀─────┘
//!                                   (LaTeX)
//! ```
//!
//! 1. [`tree`]   : decode the wiki's XML parse tree into text/element nodes
//! 2. [`record`] : pick the infobox template by title, map fields to a record
//! 3. [`fields`] : walk the template's parts; format `<math>` bodies
//! 4. [`inline`] : bold/italic/sub/sup/line-break/entity rewriting
//! 5. [`image`]  : recognise an embedded `[[File:…]]` reference
//! 6. [`links`]  : find link tags, collapse them to display text
//! 7. [`render`] : assemble sections and records into a LaTeX document

pub mod fields;
pub mod image;
pub mod inline;
pub mod links;
pub mod record;
pub mod render;
pub mod tree;
