use crate::common::errors::DataCorruption;

/// Sequential byte sink with Lucene-style variable length integers.
///
/// VInt/VLong: 7 bits per byte, low-order group first, the high bit of a byte
/// is set when more bytes follow. Fixed width ints are big-endian.
pub trait DataOutput {
    fn write_byte(&mut self, b: u8) -> crate::Result<()>;

    fn write_bytes(&mut self, bytes: &[u8]) -> crate::Result<()>;

    fn write_int(&mut self, value: i32) -> crate::Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_long(&mut self, value: i64) -> crate::Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_vint(&mut self, mut value: u32) -> crate::Result<()> {
        while value & !0x7F != 0 {
            self.write_byte(((value & 0x7F) | 0x80) as u8)?;
            value >>= 7;
        }
        self.write_byte(value as u8)
    }

    fn write_vlong(&mut self, mut value: u64) -> crate::Result<()> {
        while value & !0x7F != 0 {
            self.write_byte(((value & 0x7F) | 0x80) as u8)?;
            value >>= 7;
        }
        self.write_byte(value as u8)
    }

    /// VInt byte length followed by the UTF-8 bytes.
    fn write_string(&mut self, s: &str) -> crate::Result<()> {
        self.write_vint(s.len() as u32)?;
        self.write_bytes(s.as_bytes())
    }
}

/// Sequential byte source, the reading counterpart of [`DataOutput`].
pub trait DataInput {
    fn read_byte(&mut self) -> crate::Result<u8>;

    fn read_bytes(&mut self, buf: &mut [u8]) -> crate::Result<()>;

    fn read_int(&mut self) -> crate::Result<i32> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_long(&mut self) -> crate::Result<i64> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    fn read_vint(&mut self) -> crate::Result<u32> {
        let mut b = self.read_byte()?;
        let mut value = (b & 0x7F) as u32;
        let mut shift = 7;
        while b & 0x80 != 0 {
            if shift > 28 {
                return Err(DataCorruption::comment_only("VInt is longer than 5 bytes").into());
            }
            b = self.read_byte()?;
            value |= ((b & 0x7F) as u32) << shift;
            shift += 7;
        }
        Ok(value)
    }

    fn read_vlong(&mut self) -> crate::Result<u64> {
        let mut b = self.read_byte()?;
        let mut value = (b & 0x7F) as u64;
        let mut shift = 7;
        while b & 0x80 != 0 {
            if shift > 63 {
                return Err(DataCorruption::comment_only("VLong is longer than 10 bytes").into());
            }
            b = self.read_byte()?;
            value |= ((b & 0x7F) as u64) << shift;
            shift += 7;
        }
        Ok(value)
    }

    fn read_string(&mut self) -> crate::Result<String> {
        let len = self.read_vint()? as usize;
        let mut buf = vec![0u8; len];
        self.read_bytes(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| DataCorruption::comment_only(format!("invalid UTF-8 string: {e}")).into())
    }
}

/// Growable in-memory output. Used for skip level buffers and as the
/// backing store of RAM directory files.
#[derive(Debug, Default, Clone)]
pub struct RamOutput {
    buf: Vec<u8>,
    pos: usize,
}

impl RamOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_pointer(&self) -> u64 {
        self.pos as u64
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Move the write cursor. Seeking past the end pads with zeros.
    pub fn seek(&mut self, pos: u64) {
        let pos = pos as usize;
        if pos > self.buf.len() {
            self.buf.resize(pos, 0);
        }
        self.pos = pos;
    }

    /// Clear the content, keeping the allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Copy the whole buffer into `out`.
    pub fn write_to(&self, out: &mut dyn DataOutput) -> crate::Result<()> {
        out.write_bytes(&self.buf)
    }
}

impl DataOutput for RamOutput {
    fn write_byte(&mut self, b: u8) -> crate::Result<()> {
        if self.pos == self.buf.len() {
            self.buf.push(b);
        } else {
            self.buf[self.pos] = b;
        }
        self.pos += 1;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> crate::Result<()> {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::directory::{FileSlice, IndexInput};
    use crate::TextIndexError;

    fn input_of(output: RamOutput) -> IndexInput {
        IndexInput::new("test", FileSlice::from_vec(output.into_inner()))
    }

    #[test]
    fn test_vint_encoding_bytes() {
        let mut out = RamOutput::new();
        out.write_vint(0).unwrap();
        out.write_vint(127).unwrap();
        out.write_vint(128).unwrap();
        out.write_vint(16_384).unwrap();
        assert_eq!(out.as_slice(), &[0x00, 0x7F, 0x80, 0x01, 0x80, 0x80, 0x01]);
    }

    #[test]
    fn test_random_vints_and_vlongs() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let ints: Vec<u32> = (0..2000).map(|_| rng.gen::<u32>() >> rng.gen_range(0..32)).collect();
        let longs: Vec<u64> = (0..2000).map(|_| rng.gen::<u64>() >> rng.gen_range(0..64)).collect();

        let mut out = RamOutput::new();
        for (i, l) in ints.iter().zip(longs.iter()) {
            out.write_vint(*i).unwrap();
            out.write_vlong(*l).unwrap();
        }
        out.write_vint(u32::MAX).unwrap();
        out.write_vlong(u64::MAX).unwrap();

        let mut input = input_of(out);
        for (i, l) in ints.iter().zip(longs.iter()) {
            assert_eq!(input.read_vint().unwrap(), *i);
            assert_eq!(input.read_vlong().unwrap(), *l);
        }
        assert_eq!(input.read_vint().unwrap(), u32::MAX);
        assert_eq!(input.read_vlong().unwrap(), u64::MAX);
    }

    #[test]
    fn test_fixed_width_and_strings() {
        let mut out = RamOutput::new();
        out.write_int(-4).unwrap();
        out.write_long(1 << 40).unwrap();
        out.write_string("héllo").unwrap();
        let mut input = input_of(out);
        assert_eq!(input.read_int().unwrap(), -4);
        assert_eq!(input.read_long().unwrap(), 1 << 40);
        assert_eq!(input.read_string().unwrap(), "héllo");
    }

    #[test]
    fn test_malformed_vint_is_corruption() {
        let mut input = IndexInput::new("bad", FileSlice::from_vec(vec![0xFF; 6]));
        assert!(matches!(input.read_vint(), Err(TextIndexError::DataCorruption(_))));
    }

    #[test]
    fn test_ram_output_seek_overwrites() {
        let mut out = RamOutput::new();
        out.write_long(0).unwrap();
        out.write_int(9).unwrap();
        out.seek(0);
        out.write_long(77).unwrap();
        assert_eq!(out.file_pointer(), 8);
        assert_eq!(out.len(), 12);
        let mut input = input_of(out);
        assert_eq!(input.read_long().unwrap(), 77);
        assert_eq!(input.read_int().unwrap(), 9);
    }
}
