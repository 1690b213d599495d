//! Lossless micro-grammar for the project document.
//!
//! # Responsibility
//! - Tokenize the document into classified lines.
//! - Decode each entity section into typed records and encode records
//!   back into section text.
//!
//! # Invariants
//! - `encode(decode(section))` is stable: a second round trip yields the
//!   same text as the first.
//! - Decoding is lenient; malformed fragments are skipped, never fatal.
//!
//! # See also
//! - `document::facade` for the read-modify-write cycle built on this.

/// Implements [`SectionCodec`] for a [`records::RecordCodec`] type.
macro_rules! record_section {
    ($ty:ty, $name:literal) => {
        impl $crate::markdown::SectionCodec for $ty {
            const SECTION: &'static str = $name;

            fn decode(body: &[$crate::markdown::lexer::Line<'_>]) -> Vec<Self> {
                $crate::markdown::records::decode_records(body)
            }

            fn encode(items: &[Self], _existing: &[$crate::markdown::lexer::Line<'_>]) -> String {
                $crate::markdown::records::encode_records($name, items)
            }
        }
    };
}

pub mod attrs;
pub mod billing;
pub mod canvas;
pub mod crm;
pub mod enhanced;
pub mod ids;
pub mod lexer;
pub mod notes;
pub mod records;
pub mod section;
pub mod tasks;

use crate::model::Entity;
use lexer::Line;

/// Section-level codec for one entity type.
pub trait SectionCodec: Entity {
    /// Marker name, written as `<!-- Name -->` followed by `# Name`.
    const SECTION: &'static str;

    /// Decodes the lines after the section heading.
    ///
    /// Records without an id receive fresh ones above the section maximum.
    fn decode(body: &[Line<'_>]) -> Vec<Self>;

    /// Renders the whole section, marker and heading included.
    ///
    /// `existing` is the current section body and lets codecs keep layout
    /// the records themselves do not carry (board column order).
    fn encode(items: &[Self], existing: &[Line<'_>]) -> String;
}

/// `<!-- Name -->\n# Name\n\n` section preamble.
pub(crate) fn section_header(name: &str) -> String {
    format!("<!-- {name} -->\n# {name}\n\n")
}
