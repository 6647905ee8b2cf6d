use alloc::borrow::Cow;
use alloc::format;

use serde::{Deserialize, Serialize};

use crate::info::{TypeDescriptor, TypeHash, TypeHeader};

/// Descriptor of a fixed-size array, e.g. `[f32; 3]`.
///
/// # Examples
///
/// ```
/// use vc_serial::info::{ArrayType, FundamentalKind, TypeDescriptor};
///
/// let f32_info = TypeDescriptor::fundamental(FundamentalKind::F32);
/// let info = ArrayType::of(&f32_info, 3);
///
/// assert_eq!(info.header().name(), "[f32; 3]");
/// assert_eq!(info.header().size(), 12);
/// assert_eq!(info.element_count(), 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayType {
    header: TypeHeader,
    element: TypeHash,
    element_count: usize,
}

impl ArrayType {
    /// Create an array descriptor with an explicit name and layout.
    ///
    /// The size saturates at `usize::MAX`, which validation rejects.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        element: TypeHash,
        element_size: usize,
        element_alignment: usize,
        element_count: usize,
    ) -> Self {
        let size = element_size.saturating_mul(element_count);
        Self {
            header: TypeHeader::new(name, size, element_alignment).with_version(1),
            element,
            element_count,
        }
    }

    /// Create `[element; count]`, named after the element type.
    pub fn of(element: &TypeDescriptor, count: usize) -> Self {
        let header = element.header();
        Self::new(
            format!("[{}; {count}]", header.name()),
            header.hash(),
            header.size(),
            header.alignment(),
            count,
        )
    }

    /// Returns the [`TypeHeader`].
    #[inline]
    pub const fn header(&self) -> &TypeHeader {
        &self.header
    }

    /// Returns the element type.
    #[inline]
    pub const fn element(&self) -> TypeHash {
        self.element
    }

    /// Returns the fixed element count.
    #[inline]
    pub const fn element_count(&self) -> usize {
        self.element_count
    }
}
