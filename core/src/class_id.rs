use std::fmt;

/// Category flag bits carried in the top nibble of a [`ClassId`].
///
/// A class usually carries exactly one flag, but flags may be combined
/// (e.g. `RESULT | ERROR` for a failed response).
pub mod category {
    pub const EVENT: u8 = 0b0001;
    pub const COMMAND: u8 = 0b0010;
    pub const RESULT: u8 = 0b0100;
    pub const ERROR: u8 = 0b1000;
}

const CATEGORY_SHIFT: u32 = 28;
const SOURCE_SHIFT: u32 = 16;
const CATEGORY_BITS: u32 = 0xF;
const SOURCE_BITS: u32 = 0xFFF;
const METHOD_BITS: u32 = 0xFFFF;

/// Composite 32-bit key identifying the kind of a routed message:
/// 4 category-flag bits, a 12-bit source id, and a 16-bit method id.
///
/// The composite layout lets one flat key space encode a taxonomy without a
/// central registry: producers and consumers only need to agree on the
/// (source, method) pairs they actually exchange.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    /// Composes a key from category flags, a source id (low 12 bits used),
    /// and a method id.
    pub const fn new(category_flags: u8, source_id: u16, method_id: u16) -> Self {
        Self(
            ((category_flags as u32 & CATEGORY_BITS) << CATEGORY_SHIFT)
                | ((source_id as u32 & SOURCE_BITS) << SOURCE_SHIFT)
                | (method_id as u32 & METHOD_BITS),
        )
    }

    pub const fn from_u32(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn category_flags(self) -> u8 {
        ((self.0 >> CATEGORY_SHIFT) & CATEGORY_BITS) as u8
    }

    pub const fn source_id(self) -> u16 {
        ((self.0 >> SOURCE_SHIFT) & SOURCE_BITS) as u16
    }

    pub const fn method_id(self) -> u16 {
        (self.0 & METHOD_BITS) as u16
    }

    pub const fn is_event(self) -> bool {
        self.category_flags() & category::EVENT != 0
    }

    pub const fn is_command(self) -> bool {
        self.category_flags() & category::COMMAND != 0
    }

    pub const fn is_result(self) -> bool {
        self.category_flags() & category::RESULT != 0
    }

    pub const fn is_error(self) -> bool {
        self.category_flags() & category::ERROR != 0
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ClassId(flags={:#06b}, source={}, method={})",
            self.category_flags(),
            self.source_id(),
            self.method_id()
        )
    }
}
