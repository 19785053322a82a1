//! Extend Read and Write with the big endian, four byte aligned encodings of the classic format
//!
use std::io::{self, Read};
use std::mem;

use ncbuild::Element;

use crate::errors::{Error, Result};

/// Number of zero bytes needed to round `length` up to a multiple of four
pub(crate) fn padding(length: usize) -> usize {
    (4 - length % 4) % 4
}

/// Element types with a fixed big endian representation
pub(crate) trait BigEndian: Element {
    /// Decode one value from exactly `DATA_TYPE.size()` bytes
    fn decode(bytes: &[u8]) -> Self;

    /// Append the encoded value to `buffer`
    fn encode(self, buffer: &mut Vec<u8>);
}

macro_rules! BigEndian {
    ($type:ty) => {
        impl BigEndian for $type {
            fn decode(bytes: &[u8]) -> Self {
                let mut buffer = [0; mem::size_of::<$type>()];
                buffer.copy_from_slice(bytes);

                <$type>::from_be_bytes(buffer)
            }

            fn encode(self, buffer: &mut Vec<u8>) {
                buffer.extend_from_slice(&self.to_be_bytes());
            }
        }
    };
}

BigEndian!(i8);
BigEndian!(u8);
BigEndian!(i16);
BigEndian!(i32);
BigEndian!(f32);
BigEndian!(f64);

pub(crate) trait ExtendedRead: io::Read {
    /// Read a Big Endian encoded 32 bit unsigned integer from a stream
    fn read_u32(&mut self) -> io::Result<u32>;

    /// Read a Big Endian encoded 64 bit unsigned integer from a stream
    fn read_u64(&mut self) -> io::Result<u64>;

    /// Read `length` bytes followed by the padding up to the next four byte boundary
    fn read_padded(&mut self, length: usize) -> io::Result<Vec<u8>>;

    /// Read `count` values of type `T`, then the trailing padding
    fn read_values<T: BigEndian>(&mut self, count: usize) -> io::Result<Vec<T>>;

    /// Read a length prefixed, padded name
    fn read_name(&mut self) -> Result<String>;
}

impl<R: io::Read> ExtendedRead for R {
    fn read_u32(&mut self) -> io::Result<u32> {
        let mut buffer = [0; 4];
        self.read_exact(&mut buffer)?;

        Ok(u32::from_be_bytes(buffer))
    }

    fn read_u64(&mut self) -> io::Result<u64> {
        let mut buffer = [0; 8];
        self.read_exact(&mut buffer)?;

        Ok(u64::from_be_bytes(buffer))
    }

    fn read_padded(&mut self, length: usize) -> io::Result<Vec<u8>> {
        // Lengths come from the file, so don't trust them with an up front allocation
        let total = length + padding(length);
        let mut buffer = Vec::new();
        self.take(total as u64).read_to_end(&mut buffer)?;
        if buffer.len() < total {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        buffer.truncate(length);

        Ok(buffer)
    }

    fn read_values<T: BigEndian>(&mut self, count: usize) -> io::Result<Vec<T>> {
        let size = T::DATA_TYPE.size();
        let bytes = self.read_padded(count * size)?;

        Ok(bytes.chunks_exact(size).map(T::decode).collect())
    }

    fn read_name(&mut self) -> Result<String> {
        let length = self.read_u32()? as usize;
        let bytes = self.read_padded(length)?;

        String::from_utf8(bytes).map_err(|_| Error::Format(String::from("name is not UTF-8")))
    }
}

pub(crate) trait ExtendedWrite: io::Write {
    /// Write a Big Endian encoded 32 bit unsigned integer to a stream
    fn write_u32(&mut self, word: u32) -> io::Result<()>;

    /// Write a Big Endian encoded 64 bit unsigned integer to a stream
    fn write_u64(&mut self, word: u64) -> io::Result<()>;

    /// Write `bytes` followed by zero padding up to the next four byte boundary
    fn write_padded(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Write values of type `T`, then the trailing padding
    fn write_values<T: BigEndian>(&mut self, values: &[T]) -> io::Result<()>;

    /// Write a length prefixed, padded name
    fn write_name(&mut self, name: &str) -> io::Result<()>;
}

impl<W: io::Write> ExtendedWrite for W {
    fn write_u32(&mut self, word: u32) -> io::Result<()> {
        self.write_all(&word.to_be_bytes())
    }

    fn write_u64(&mut self, word: u64) -> io::Result<()> {
        self.write_all(&word.to_be_bytes())
    }

    fn write_padded(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.write_all(&[0; 3][..padding(bytes.len())])
    }

    fn write_values<T: BigEndian>(&mut self, values: &[T]) -> io::Result<()> {
        let mut buffer = Vec::with_capacity(values.len() * T::DATA_TYPE.size());
        for &value in values {
            value.encode(&mut buffer);
        }

        self.write_padded(&buffer)
    }

    fn write_name(&mut self, name: &str) -> io::Result<()> {
        self.write_u32(name.len() as u32)?;
        self.write_padded(name.as_bytes())
    }
}
