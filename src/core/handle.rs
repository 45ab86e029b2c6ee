//! Opaque engine handles.
//!
//! Every resource the engine hands out is a pointer-sized token. Contexts,
//! documents and pages are never zero once created; expressions are tagged
//! pointers whose low two bits carry the runtime type.

use std::fmt;
use std::num::NonZeroUsize;

/// Low-bit tag of a pair (cons cell). Nil shares this tag.
pub const TAG_PAIR: usize = 0b00;
/// Low-bit tag of a boxed object (string or float).
pub const TAG_OBJECT: usize = 0b01;
/// Low-bit tag of an interned symbol.
pub const TAG_SYMBOL: usize = 0b10;
/// Low-bit tag of an immediate integer.
pub const TAG_INTEGER: usize = 0b11;

const TAG_MASK: usize = 0b11;

/// Smallest integer an expression can carry (30-bit signed).
pub const MIN_INTEGER: i32 = -(1 << 29);
/// Largest integer an expression can carry (30-bit signed).
pub const MAX_INTEGER: i32 = (1 << 29) - 1;

/// A raw `miniexp_t` value.
///
/// Not owned: it points into memory managed by the engine and stays valid
/// while the document or context that produced it is open.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawExpr(usize);

impl RawExpr {
    /// Absence of data, and the empty list.
    pub const NIL: RawExpr = RawExpr(0);

    /// "Not available yet". Only ever seen while a decode is in progress.
    pub const DUMMY: RawExpr = RawExpr(2);

    pub const fn from_bits(bits: usize) -> Self {
        RawExpr(bits)
    }

    pub const fn bits(self) -> usize {
        self.0
    }

    /// The low two bits of the handle.
    pub const fn tag(self) -> usize {
        self.0 & TAG_MASK
    }

    pub const fn is_nil(self) -> bool {
        self.0 == Self::NIL.0
    }

    pub const fn is_dummy(self) -> bool {
        self.0 == Self::DUMMY.0
    }

    /// True for a non-nil pair.
    pub const fn is_pair(self) -> bool {
        self.tag() == TAG_PAIR && !self.is_nil()
    }

    /// Packs an integer as `(n << 2) | 0b11`.
    ///
    /// Values outside [`MIN_INTEGER`, `MAX_INTEGER`] lose their top bits on
    /// the C side; use [`RawExpr::checked_int`] when the input is untrusted.
    pub const fn from_int(n: i32) -> Self {
        RawExpr((((n as isize) << 2) | TAG_INTEGER as isize) as usize)
    }

    /// Packs an integer, rejecting values the encoding cannot carry.
    pub fn checked_int(n: i64) -> Option<Self> {
        if n < MIN_INTEGER as i64 || n > MAX_INTEGER as i64 {
            return None;
        }
        Some(Self::from_int(n as i32))
    }

    /// Arithmetic right shift by two, preserving sign.
    ///
    /// Only meaningful when `tag() == TAG_INTEGER`.
    pub const fn int_value(self) -> i32 {
        ((self.0 as isize) >> 2) as i32
    }
}

impl fmt::Debug for RawExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RawExpr::NIL => write!(f, "RawExpr(nil)"),
            RawExpr::DUMMY => write!(f, "RawExpr(dummy)"),
            _ => write!(f, "RawExpr({:#x})", self.0),
        }
    }
}

macro_rules! resource_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NonZeroUsize);

        impl $name {
            /// Wraps a raw value, `None` for the null handle.
            pub fn from_raw(raw: usize) -> Option<Self> {
                NonZeroUsize::new(raw).map($name)
            }

            pub fn as_raw(self) -> usize {
                self.0.get()
            }
        }
    };
}

resource_handle!(
    /// Handle to an engine context (`ddjvu_context_t*`).
    ContextHandle
);
resource_handle!(
    /// Handle to a document decoder (`ddjvu_document_t*`).
    DocumentHandle
);
resource_handle!(
    /// Handle to a page decoder (`ddjvu_page_t*`).
    PageHandle
);
resource_handle!(
    /// Handle to a garbage collection root (`minivar_t*`).
    RootHandle
);
