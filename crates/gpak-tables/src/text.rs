//! Text chunk encoding: each string is an adaptive length followed by its
//! UTF-8 bytes. A string is addressed by the byte offset of its length
//! prefix; offset 0 always holds the empty string.

use gpak_codec::{adaptive, ByteReader};

use crate::error::{TableError, TableResult};

/// Append `s` to a text blob.
pub fn push(out: &mut Vec<u8>, s: &str) {
    adaptive::encode_u32(s.len() as u32, out);
    out.extend_from_slice(s.as_bytes());
}

/// Bytes `push` would append for `s`.
pub fn encoded_len(s: &str) -> usize {
    adaptive::encoded_len_u32(s.len() as u32) + s.len()
}

/// Read the string whose length prefix starts at `offset`.
pub fn read(text: &[u8], offset: u64) -> TableResult<&str> {
    read_entry(text, offset).map(|(s, _)| s)
}

/// The string at `offset` and the offset just past it.
fn read_entry(text: &[u8], offset: u64) -> TableResult<(&str, usize)> {
    let invalid = |reason: String| TableError::InvalidText { offset, reason };
    let start = usize::try_from(offset)
        .ok()
        .filter(|&start| start < text.len())
        .ok_or_else(|| invalid(format!("offset beyond text chunk of {} bytes", text.len())))?;
    let mut r = ByteReader::new(&text[start..]);
    let len = r.read_adaptive_u32().map_err(|e| invalid(e.to_string()))?;
    let bytes = r
        .read_bytes(len as usize)
        .map_err(|e| invalid(e.to_string()))?;
    let s = std::str::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;
    Ok((s, start + r.position()))
}

/// Iterate `(offset, string)` over a whole blob in order.
pub fn entries(text: &[u8]) -> Entries<'_> {
    Entries { text, pos: 0 }
}

pub struct Entries<'a> {
    text: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Entries<'a> {
    type Item = TableResult<(u64, &'a str)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }
        let offset = self.pos as u64;
        let text: &'a [u8] = self.text;
        match read_entry(text, offset) {
            Ok((s, end)) => {
                self.pos = end;
                Some(Ok((offset, s)))
            }
            Err(e) => {
                self.pos = self.text.len();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_address_strings() {
        let mut blob = Vec::new();
        push(&mut blob, "");
        let hello = blob.len() as u64;
        push(&mut blob, "hello");
        let long = blob.len() as u64;
        let big = "x".repeat(200);
        push(&mut blob, &big);

        assert_eq!(blob[0], 0x00);
        assert_eq!(read(&blob, 0).unwrap(), "");
        assert_eq!(read(&blob, hello).unwrap(), "hello");
        assert_eq!(read(&blob, long).unwrap(), big);

        let all: Vec<_> = entries(&blob).map(|e| e.unwrap().0).collect();
        assert_eq!(all, vec![0, hello, long]);
    }

    #[test]
    fn entries_follow_padded_length_prefixes() {
        let mut blob = Vec::new();
        push(&mut blob, "");
        adaptive::encode_u32_padded(2, 3, &mut blob).unwrap();
        blob.extend_from_slice(b"hi");
        let after = blob.len() as u64;
        push(&mut blob, "z");

        let all: Vec<_> = entries(&blob).map(|e| e.unwrap()).collect();
        assert_eq!(all, vec![(0, ""), (1, "hi"), (after, "z")]);
        assert_eq!(after, 6);
    }

    #[test]
    fn invalid_entries_are_reported() {
        let mut blob = Vec::new();
        push(&mut blob, "");
        blob.extend_from_slice(&[0x02, 0xC3, 0x28]);
        assert!(matches!(read(&blob, 1), Err(TableError::InvalidText { offset: 1, .. })));
        assert!(read(&blob, 99).is_err());

        let truncated = [0x05, b'a'];
        assert!(read(&truncated, 0).is_err());
    }
}
