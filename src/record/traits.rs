//! Fixed-layout record trait and its byte cursors
//!
//! A record declares its exact encoded size at compile time and writes its
//! fields one after another, little-endian and without padding. The layout is
//! therefore identical on every process regardless of how the compiler lays
//! the Rust struct out in memory.

use std::any::type_name;

use crate::error::CodecError;

/// A value with a fixed, compile-time byte layout
pub trait Record: Sized {
    /// Exact number of bytes `encode_into` writes and `decode_from` consumes
    const SIZE: usize;

    /// Append this value's fields to `out`
    fn encode_into(&self, out: &mut RecordWriter<'_>) -> Result<(), CodecError>;

    /// Read a value from the front of `input`
    fn decode_from(input: &mut RecordReader<'_>) -> Result<Self, CodecError>;
}

/// Write cursor over a fixed-size output buffer
#[derive(Debug)]
pub struct RecordWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    record: &'static str,
}

impl<'a> RecordWriter<'a> {
    /// Start writing a record of type `R` into `buf`
    pub fn new<R: Record>(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            record: type_name::<R>(),
        }
    }

    /// Append raw bytes
    pub fn put(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let end = self
            .pos
            .checked_add(bytes.len())
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                CodecError::encode(
                    self.record,
                    format!(
                        "field of {} bytes overruns layout at offset {} of {}",
                        bytes.len(),
                        self.pos,
                        self.buf.len()
                    ),
                )
            })?;
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Read cursor over an encoded record
#[derive(Debug)]
pub struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
    record: &'static str,
}

impl<'a> RecordReader<'a> {
    /// Start reading a record of type `R` from `buf`
    pub fn new<R: Record>(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            record: type_name::<R>(),
        }
    }

    /// Take the next `len` bytes
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                CodecError::decode(
                    self.record,
                    format!(
                        "field of {} bytes runs past end at offset {} of {}",
                        len,
                        self.pos,
                        self.buf.len()
                    ),
                )
            })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Report a malformed field
    pub fn malformed(&self, message: impl Into<String>) -> CodecError {
        CodecError::decode(self.record, message)
    }
}

macro_rules! impl_le_record {
    ($($t:ty),* $(,)?) => {
        $(
            impl Record for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn encode_into(&self, out: &mut RecordWriter<'_>) -> Result<(), CodecError> {
                    out.put(&self.to_le_bytes())
                }

                fn decode_from(input: &mut RecordReader<'_>) -> Result<Self, CodecError> {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(input.take(Self::SIZE)?);
                    Ok(<$t>::from_le_bytes(raw))
                }
            }
        )*
    };
}

impl_le_record!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl Record for bool {
    const SIZE: usize = 1;

    fn encode_into(&self, out: &mut RecordWriter<'_>) -> Result<(), CodecError> {
        out.put(&[*self as u8])
    }

    fn decode_from(input: &mut RecordReader<'_>) -> Result<Self, CodecError> {
        match input.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(input.malformed(format!("{:#04x} is not a bool", other))),
        }
    }
}

impl<T: Record, const N: usize> Record for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn encode_into(&self, out: &mut RecordWriter<'_>) -> Result<(), CodecError> {
        for item in self {
            item.encode_into(out)?;
        }
        Ok(())
    }

    fn decode_from(input: &mut RecordReader<'_>) -> Result<Self, CodecError> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(T::decode_from(input)?);
        }
        items
            .try_into()
            .map_err(|_| input.malformed("array length mismatch"))
    }
}

/// Declare a struct together with its [`Record`] layout.
///
/// Fields are encoded in declaration order and every field type must itself
/// implement [`Record`], so the total size is known at compile time.
///
/// ```
/// shmseg::record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Pose {
///         pub x: f64,
///         pub y: f64,
///         pub valid: bool,
///     }
/// }
///
/// use shmseg::record::Record;
/// assert_eq!(Pose::SIZE, 17);
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field : $ty, )*
        }

        impl $crate::record::Record for $name {
            const SIZE: usize = 0 $( + <$ty as $crate::record::Record>::SIZE )*;

            #[allow(unused_variables)]
            fn encode_into(
                &self,
                out: &mut $crate::record::RecordWriter<'_>,
            ) -> ::std::result::Result<(), $crate::error::CodecError> {
                $( $crate::record::Record::encode_into(&self.$field, out)?; )*
                Ok(())
            }

            #[allow(unused_variables)]
            fn decode_from(
                input: &mut $crate::record::RecordReader<'_>,
            ) -> ::std::result::Result<Self, $crate::error::CodecError> {
                Ok(Self {
                    $( $field: <$ty as $crate::record::Record>::decode_from(input)?, )*
                })
            }
        }
    };
}
