// RCS ("comma-v") file format.
//
// - `revision` : trunk revision numbers, date stamps, revision records
// - `quote`    : `@` string quoting as a streaming filter
// - `writer`   : serializer with the fixed RCS emission order
// - `reader`   : parser and trunk reconstruction, used for verification

pub mod quote;
pub mod reader;
pub mod revision;
pub mod writer;

pub use quote::{AtEscaper, write_quoted};
pub use reader::{RcsFile, ReadError};
pub use revision::{RcsDate, RevisionNumber, RevisionRecord, State};
pub use writer::{DEFAULT_COMMENT_LEADER, RcsHeader, write_rcs};
