//! # `asmstudio`
//!
//! Core of an editing and verification front end for an external assembler. It keeps
//! a set of named source documents, highlights assembly source off the interactive
//! thread, runs the assembler and turns its output into canonical, annotated Intel HEX
//! (via [`ihexlib`]).
//!
//! ## Example
//!
//! ```
//! use asmstudio::lexer::{resolve, tokenize, ColorClass};
//!
//! let text = "start: JMP start ; forever";
//! let painted = resolve(text.len(), &tokenize(text));
//!
//! assert_eq!(painted[0].class, ColorClass::Label);
//! assert_eq!(painted.last().map(|s| s.class), Some(ColorClass::Comment));
//! ```

pub mod assembler;
pub mod config;
pub mod error;
pub mod export;
pub mod highlight;
pub mod lexer;
pub mod session;
pub mod studio;
pub mod worker;

pub use assembler::{Assembler, AssemblyReport, AssemblyRequest, ProcessAssembler, assemble_request};
pub use config::StudioConfig;
pub use error::StudioError;
pub use highlight::{HighlightScheduler, Selection};
pub use session::{Document, DocumentSet};
pub use studio::{EditorSurface, Studio, StudioEvent};
