/// A fixed-layout record that can be written to (and read back from) a GPU-visible buffer.
///
/// Records are sequences of little-endian 32-bit words. Use `#[derive(GpuRecord)]` on a struct
/// to serialize its fields in declaration order.
///
/// The data should be read in the same order as it was written; the derive macro guarantees that.
pub trait GpuRecord: Sized {
    /// Size of the record in 32-bit words.
    const WORDS: usize;

    /// Size of the record in bytes.
    const BYTES: usize = Self::WORDS * 4;

    /// Serialize the record to a given [`RecordWriter`].
    fn write(&self, writer: &mut dyn RecordWriter);

    /// Deserialize the record from a given [`RecordReader`].
    fn read(reader: &mut dyn RecordReader) -> Self;
}

/// Sink for GPU record words.
pub trait RecordWriter {
    fn write_u32(&mut self, x: u32);

    fn write_i32(&mut self, x: i32) {
        self.write_u32(x as u32);
    }

    fn write_f32(&mut self, x: f32) {
        self.write_u32(x.to_bits());
    }
}

/// Source of GPU record words.
pub trait RecordReader {
    fn read_u32(&mut self) -> u32;

    fn read_i32(&mut self) -> i32 {
        self.read_u32() as i32
    }

    fn read_f32(&mut self) -> f32 {
        f32::from_bits(self.read_u32())
    }
}

/// Writes records into a byte slice, little-endian.
pub struct ByteWriter<'a> {
    bytes: &'a mut [u8],
    offset: usize,
}

/// Reads records from a byte slice, little-endian.
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Start writing at the `index`-th element of type `T`.
    pub fn at<T: GpuRecord>(bytes: &'a mut [u8], index: usize) -> Self {
        Self {
            bytes,
            offset: index * T::BYTES,
        }
    }

    /// Number of bytes written (or skipped) so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Start reading at the `index`-th element of type `T`.
    pub fn at<T: GpuRecord>(bytes: &'a [u8], index: usize) -> Self {
        Self {
            bytes,
            offset: index * T::BYTES,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl RecordWriter for ByteWriter<'_> {
    fn write_u32(&mut self, x: u32) {
        self.bytes[self.offset..self.offset + 4].copy_from_slice(&x.to_le_bytes());
        self.offset += 4;
    }
}

impl RecordReader for ByteReader<'_> {
    fn read_u32(&mut self) -> u32 {
        let word = match self.bytes.get(self.offset..self.offset + 4) {
            Some(word) => u32::from_le_bytes([word[0], word[1], word[2], word[3]]),
            None => 0,
        };

        self.offset += 4;
        word
    }
}

/// Read the `index`-th record of type `T` out of a byte buffer.
///
/// Reading past the end of the buffer yields zeroed words.
pub fn read_record<T: GpuRecord>(bytes: &[u8], index: usize) -> T {
    T::read(&mut ByteReader::at::<T>(bytes, index))
}

impl GpuRecord for u32 {
    const WORDS: usize = 1;

    fn write(&self, writer: &mut dyn RecordWriter) {
        writer.write_u32(*self);
    }

    fn read(reader: &mut dyn RecordReader) -> Self {
        reader.read_u32()
    }
}

impl GpuRecord for i32 {
    const WORDS: usize = 1;

    fn write(&self, writer: &mut dyn RecordWriter) {
        writer.write_i32(*self);
    }

    fn read(reader: &mut dyn RecordReader) -> Self {
        reader.read_i32()
    }
}

impl GpuRecord for f32 {
    const WORDS: usize = 1;

    fn write(&self, writer: &mut dyn RecordWriter) {
        writer.write_f32(*self);
    }

    fn read(reader: &mut dyn RecordReader) -> Self {
        reader.read_f32()
    }
}

impl<const N: usize, T: GpuRecord> GpuRecord for [T; N] {
    const WORDS: usize = T::WORDS * N;

    fn write(&self, writer: &mut dyn RecordWriter) {
        for x in self.iter() {
            x.write(writer);
        }
    }

    fn read(reader: &mut dyn RecordReader) -> Self {
        std::array::from_fn(|_| T::read(reader))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::GpuRecord;
    use crate::math::Vec2;

    #[derive(Debug, PartialEq, GpuRecord)]
    struct Named {
        a: u32,
        b: [f32; 2],
        c: Vec2,
    }

    #[derive(Debug, PartialEq, GpuRecord)]
    struct Tuple(i32, u32);

    #[test]
    fn test_word_counts() {
        assert_eq!(Named::WORDS, 5);
        assert_eq!(Named::BYTES, 20);
        assert_eq!(Tuple::WORDS, 2);
    }

    #[test]
    fn test_fields_in_declaration_order() {
        let mut bytes = [0u8; 20];
        Named {
            a: 7,
            b: [1.0, 2.0],
            c: Vec2::new(3.0, 4.0),
        }
        .write(&mut ByteWriter::new(&mut bytes));

        assert_eq!(&bytes[0..4], &7u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[16..20], &4.0f32.to_le_bytes());
    }

    #[test]
    fn test_indexed_access() {
        let mut bytes = [0u8; 24];
        Tuple(-1, 2).write(&mut ByteWriter::at::<Tuple>(&mut bytes, 1));
        Tuple(5, 6).write(&mut ByteWriter::at::<Tuple>(&mut bytes, 2));

        assert_eq!(read_record::<Tuple>(&bytes, 0), Tuple(0, 0));
        assert_eq!(read_record::<Tuple>(&bytes, 1), Tuple(-1, 2));
        assert_eq!(read_record::<Tuple>(&bytes, 2), Tuple(5, 6));
        assert_eq!(read_record::<Tuple>(&bytes, 3), Tuple(0, 0));
    }
}
