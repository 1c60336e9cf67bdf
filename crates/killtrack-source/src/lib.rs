//! killtrack-source: chat line source IO boundary.
//! Reads the host's recent chat window through an ordered list of read
//! strategies and decodes the tolerated line shapes into plain text.
//! No tracking logic lives here.

pub mod decode;
pub mod error;
pub mod reader;
pub mod source;

pub use decode::{decode_payload, line_text, response_lines};
pub use error::SourceError;
pub use reader::{ChatReader, CommandReader, DEFAULT_COMMAND_TIMEOUT, FileReader};
pub use source::{DEFAULT_WINDOW, FetchedLines, LineSource, ProbingLineSource};
