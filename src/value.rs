//! Parsed value trees: parser output and encoder input.

use crate::ast::Spec;
use crate::queue::ByteView;
use bytes::Bytes;

/// Sentinel integer instructing the encoder to compute the real value (a
/// payload length, a budget, a repetition count) and back-patch it in place.
///
/// High enough to be recognizable, low enough to leave headroom for the
/// offset arithmetic applied around it.
pub const AUTO: u64 = !0x3fff_ffff;

/// One parsed value. Conforms to the [`Spec`] that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    /// Produced by `Skip`; carries nothing.
    Empty,
    /// The spec declared the input inadmissible: the spec node that halted,
    /// and the selector value that chose it. Never nested inside `Seq`; a
    /// surfacing `Stop` becomes the top-level result.
    Stop(Box<Spec>, u64),
    /// Decoded integers are always plain u64, whatever the wire width.
    Integer(u64),
    /// Raw payload, still referencing the producer's chunks.
    Bytes(ByteView),
    Seq(Vec<Data>),
}

impl Data {
    /// Short noun for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Data::Empty => "empty",
            Data::Stop(..) => "stop",
            Data::Integer(_) => "integer",
            Data::Bytes(_) => "bytes",
            Data::Seq(_) => "seq",
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Data::Stop(..))
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            Data::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&ByteView> {
        match self {
            Data::Bytes(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Data]> {
        match self {
            Data::Seq(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! int_conversions {
    ($($unsigned:ty),* ; $($signed:ty => $bits:ty),*) => {
        $(impl From<$unsigned> for Data {
            fn from(v: $unsigned) -> Data {
                Data::Integer(v as u64)
            }
        })*
        // Signed values keep their width's two's-complement bit pattern:
        // -1i16 becomes 0xffff, not 0xffff_ffff_ffff_ffff.
        $(impl From<$signed> for Data {
            fn from(v: $signed) -> Data {
                Data::Integer(v as $bits as u64)
            }
        })*
    };
}

int_conversions!(u8, u16, u32, u64, usize ; i8 => u8, i16 => u16, i32 => u32, i64 => u64);

impl From<&str> for Data {
    fn from(s: &str) -> Data {
        Data::Bytes(ByteView::from(s.as_bytes()))
    }
}

impl From<String> for Data {
    fn from(s: String) -> Data {
        Data::Bytes(ByteView::from(s.into_bytes()))
    }
}

impl From<&[u8]> for Data {
    fn from(buf: &[u8]) -> Data {
        Data::Bytes(ByteView::from(buf))
    }
}

impl From<Vec<u8>> for Data {
    fn from(buf: Vec<u8>) -> Data {
        Data::Bytes(ByteView::from(buf))
    }
}

impl From<Bytes> for Data {
    fn from(chunk: Bytes) -> Data {
        Data::Bytes(ByteView::from(chunk))
    }
}

impl From<ByteView> for Data {
    fn from(view: ByteView) -> Data {
        Data::Bytes(view)
    }
}

impl From<Vec<Data>> for Data {
    fn from(items: Vec<Data>) -> Data {
        Data::Seq(items)
    }
}
