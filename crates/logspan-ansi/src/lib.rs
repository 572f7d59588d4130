//! ANSI span parsing for logspan
//!
//! This crate turns raw process output lines (which may embed SGR escape
//! sequences) into styled text spans, autodetecting hyperlinks, and converts
//! spans into ratatui lines for terminal viewers.

mod color;
mod parser;
mod render;
mod span;

pub use color::{Color, lookup_256};
pub use parser::{ParserState, SpanParser, parse, parse_line};
pub use render::{plain_text, to_line};
pub use span::{Span, Style};
