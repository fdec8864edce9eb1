//! Batch operations over a whole corpus.
//!
//! Every operation visits each annotation file once and returns a
//! [`BatchReport`]. A file that fails to parse, or whose image is missing, is
//! reported and skipped; only invalid arguments or an unusable output
//! directory abort the batch.

mod copy;
mod crops;
mod rename;
mod report;

pub use copy::copy_filtered;
pub use crops::{crop_file_name, export_crops, CropOptions, DEFAULT_CROP_MARGIN};
pub use rename::rename_corpus;
pub use report::{BatchIssue, BatchReport, IssueKind};
