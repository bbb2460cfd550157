//! Record encoding and record-level segment access
//!
//! Records always live at offset 0 of the segment. Multiple or offset-addressed
//! records are only reachable through [`RawAccessor`] directly.

use std::any::type_name;

use crate::{
    access::RawAccessor,
    error::{CodecError, RecordError},
};

use super::traits::{Record, RecordReader, RecordWriter};

/// Offset at which the codec path reads and writes records
pub const RECORD_OFFSET: usize = 0;

/// Encode `record` into exactly `R::SIZE` bytes
pub fn encode<R: Record>(record: &R) -> Result<Vec<u8>, CodecError> {
    let mut buf = vec![0u8; R::SIZE];
    let mut writer = RecordWriter::new::<R>(&mut buf);
    record.encode_into(&mut writer)?;

    let written = writer.position();
    if written != R::SIZE {
        return Err(CodecError::encode(
            type_name::<R>(),
            format!("wrote {} bytes, layout declares {}", written, R::SIZE),
        ));
    }
    Ok(buf)
}

/// Decode a record from exactly `R::SIZE` bytes
pub fn decode<R: Record>(bytes: &[u8]) -> Result<R, CodecError> {
    if bytes.len() != R::SIZE {
        return Err(CodecError::decode(
            type_name::<R>(),
            format!("expected {} bytes, got {}", R::SIZE, bytes.len()),
        ));
    }

    let mut reader = RecordReader::new::<R>(bytes);
    let record = R::decode_from(&mut reader)?;
    if reader.remaining() != 0 {
        return Err(reader.malformed(format!(
            "{} trailing bytes after decode",
            reader.remaining()
        )));
    }
    Ok(record)
}

/// Read a record of type `R` from offset 0
pub fn read_record<R, A>(accessor: &A) -> Result<R, RecordError>
where
    R: Record,
    A: RawAccessor + ?Sized,
{
    let bytes = accessor.read(RECORD_OFFSET, R::SIZE)?;
    Ok(decode(&bytes)?)
}

/// Write `record` at offset 0
pub fn write_record<R, A>(accessor: &mut A, record: &R) -> Result<(), RecordError>
where
    R: Record,
    A: RawAccessor + ?Sized,
{
    let bytes = encode(record)?;
    accessor.write_from(RECORD_OFFSET, &bytes)?;
    Ok(())
}

/// Record-level methods on any [`RawAccessor`]
pub trait RecordAccessorExt: RawAccessor {
    /// Read a record of type `R` from offset 0
    fn read_record<R: Record>(&self) -> Result<R, RecordError> {
        read_record(self)
    }

    /// Write `record` at offset 0
    fn write_record<R: Record>(&mut self, record: &R) -> Result<(), RecordError> {
        write_record(self, record)
    }
}

impl<A: RawAccessor + ?Sized> RecordAccessorExt for A {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;
    use crate::segment::{FileBackend, Segment};
    use tempfile::TempDir;

    crate::record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Telemetry {
            seq: u64,
            temperature: f32,
            armed: bool,
            label: [u8; 8],
        }
    }

    /// A hand-written layout that under-reports what it writes
    #[derive(Debug)]
    struct Lying;

    impl Record for Lying {
        const SIZE: usize = 8;

        fn encode_into(&self, out: &mut RecordWriter<'_>) -> Result<(), CodecError> {
            out.put(&[1, 2, 3])
        }

        fn decode_from(input: &mut RecordReader<'_>) -> Result<Self, CodecError> {
            input.take(3)?;
            Ok(Lying)
        }
    }

    fn sample() -> Telemetry {
        Telemetry {
            seq: 42,
            temperature: -3.25,
            armed: true,
            label: *b"sensor-1",
        }
    }

    #[test]
    fn test_encode_size() {
        let bytes = encode(&sample()).unwrap();
        assert_eq!(bytes.len(), Telemetry::SIZE);
        assert_eq!(Telemetry::SIZE, 8 + 4 + 1 + 8);
        assert_eq!(decode::<Telemetry>(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_short_encode_fails() {
        let err = encode(&Lying).unwrap_err();
        assert!(matches!(err, CodecError::EncodeFailed { .. }));
    }

    #[test]
    fn test_decode_wrong_length() {
        assert!(decode::<Telemetry>(&[]).is_err());
        assert!(decode::<Telemetry>(&[0u8; 20]).is_err());
        assert!(decode::<Telemetry>(&[0u8; 22]).is_err());
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let err = decode::<Lying>(&[0u8; 8]).unwrap_err();
        assert!(matches!(err, CodecError::DecodeFailed { .. }));
    }

    #[test]
    fn test_decode_malformed_field() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[12] = 7;
        assert!(decode::<Telemetry>(&bytes).is_err());
    }

    #[test]
    fn test_record_round_trip_through_segment() {
        let temp_dir = TempDir::new().unwrap();
        let mut segment = Segment::with_backend(FileBackend::new(temp_dir.path()));
        segment.init("telemetry", 4096).unwrap();

        segment.write_record(&sample()).unwrap();
        let back: Telemetry = segment.read_record().unwrap();
        assert_eq!(back, sample());
        assert_eq!(segment.read(0, 8).unwrap(), 42u64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_record_errors_before_init() {
        let mut segment = Segment::with_backend(FileBackend::new("/nonexistent"));
        assert_eq!(
            segment.read_record::<Telemetry>(),
            Err(RecordError::Access(AccessError::NotInitialized))
        );
        let err = segment.write_record(&sample()).unwrap_err();
        assert_eq!(err.code(), 1);
    }

    #[test]
    fn test_record_larger_than_segment() {
        let temp_dir = TempDir::new().unwrap();
        let mut segment = Segment::with_backend(FileBackend::new(temp_dir.path()));
        segment.init("tiny", 16).unwrap();

        let err = segment.write_record(&sample()).unwrap_err();
        assert_eq!(err.code(), 2);
        assert!(segment.as_slice().unwrap().iter().all(|&b| b == 0));
        assert!(segment.read_record::<Telemetry>().is_err());
    }

    #[test]
    fn test_codec_error_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut segment = Segment::with_backend(FileBackend::new(temp_dir.path()));
        segment.init("lying", 64).unwrap();

        let err = segment.write_record(&Lying).unwrap_err();
        assert_eq!(err.code(), 3);
        assert!(segment.as_slice().unwrap().iter().all(|&b| b == 0));
    }
}
