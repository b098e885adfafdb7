//! Typed indices.
//!
//! Element and atom indices are kept apart at the type level so an atom
//! index can never be used to look up an element.  Both are plain `u32`
//! positions into a `Vec`.

use std::fmt;

macro_rules! typed_index {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub u32);

        impl $name {
            /// Wrap a `Vec` position.  Positions beyond `u32::MAX` are a bug.
            #[inline]
            pub fn from_index(index: usize) -> Self {
                debug_assert!(index <= u32::MAX as usize, "{} overflow: {index}", stringify!($name));
                $name(index as u32)
            }

            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;

            fn try_from(n: usize) -> Result<$name, Self::Error> {
                u32::try_from(n).map($name)
            }
        }
    };
}

typed_index! {
    /// Position of a simulator element in the scheduler's ownership store.
    pub struct ElementId;
}

typed_index! {
    /// Position of an atom in the state arrays.
    pub struct AtomId;
}
