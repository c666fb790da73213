///
/// ValueTag
///
/// Stable value-variant tag written as the first byte of every encoded key field.
///
/// IMPORTANT:
/// Tag values are part of the on-disk key layout. They must never be zero
/// (zero terminates a field) and must sort strictly between the `Before` and
/// `After` edge markers.
///
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueTag {
    Null = 0x02,
    Bool = 0x03,
    Int = 0x10,
    Uint = 0x11,
    Text = 0x20,
    Blob = 0x30,
}

impl ValueTag {
    /// Stable key byte tag for this variant.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Resolve a key byte back into a value tag.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(Self::Null),
            0x03 => Some(Self::Bool),
            0x10 => Some(Self::Int),
            0x11 => Some(Self::Uint),
            0x20 => Some(Self::Text),
            0x30 => Some(Self::Blob),
            _ => None,
        }
    }

    /// Stable human-readable value kind label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Uint => "Uint",
            Self::Text => "Text",
            Self::Blob => "Blob",
        }
    }
}
