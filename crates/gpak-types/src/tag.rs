use std::fmt;

/// Tag byte that starts every positional opcode in an object body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpcodeTag {
    SkipHeader = 0x01,
    Property = 0x02,
    DataBlock1 = 0x03,
    DataBlock2 = 0x04,
    DataBlock4 = 0x05,
    DataTypeRef = 0x06,
    DataName = 0x07,
    DataObjectPointer = 0x08,
    DataResourceRef = 0x09,
    DataAdaptiveNumber = 0x0A,
    DataInlineBuffer = 0x0B,
}

/// Mode byte following a `DataInlineBuffer` tag.
pub mod inline_mode {
    /// Adaptive length followed by the payload bytes.
    pub const EMBEDDED: u8 = 0;
    /// 64-bit checksum of a payload stored in the buffer region.
    pub const DEFERRED: u8 = 1;
}

impl OpcodeTag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => Self::SkipHeader,
            0x02 => Self::Property,
            0x03 => Self::DataBlock1,
            0x04 => Self::DataBlock2,
            0x05 => Self::DataBlock4,
            0x06 => Self::DataTypeRef,
            0x07 => Self::DataName,
            0x08 => Self::DataObjectPointer,
            0x09 => Self::DataResourceRef,
            0x0A => Self::DataAdaptiveNumber,
            0x0B => Self::DataInlineBuffer,
            _ => return None,
        })
    }

    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for OpcodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_roundtrip() {
        for byte in 0x01..=0x0B {
            let tag = OpcodeTag::from_byte(byte).unwrap();
            assert_eq!(tag.byte(), byte);
        }
        assert_eq!(OpcodeTag::from_byte(0x00), None);
        assert_eq!(OpcodeTag::from_byte(0x0C), None);
    }
}
