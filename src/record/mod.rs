//! Fixed-layout records stored at the start of a segment

pub mod codec;
pub mod traits;

pub use codec::{decode, encode, read_record, write_record, RecordAccessorExt, RECORD_OFFSET};
pub use traits::{Record, RecordReader, RecordWriter};
