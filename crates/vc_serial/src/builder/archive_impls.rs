use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::builder::{Archive, ContainerKind, SerializationBuilder};
use crate::error::SerialError;
use crate::ser::FundamentalMut;
use crate::walk::stream_len;

/// Upper bound of elements reserved up front from a streamed count.
const RESERVE_LIMIT: u32 = 4096;

// -----------------------------------------------------------------------------
// Fundamentals

macro_rules! impl_archive_fundamental {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl Archive for $ty {
            #[inline]
            fn archive(
                &mut self,
                builder: &mut SerializationBuilder<'_, '_>,
            ) -> Result<(), SerialError> {
                builder.value(FundamentalMut::$variant(self))
            }
        }
    )*};
}

impl_archive_fundamental! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    i128 => I128,
    u128 => U128,
    f32 => F32,
    f64 => F64,
}

// -----------------------------------------------------------------------------
// Text

impl Archive for String {
    fn archive(&mut self, builder: &mut SerializationBuilder<'_, '_>) -> Result<(), SerialError> {
        let mut scope = builder.nested();
        let mut len = stream_len(self.len())?;
        scope.container(ContainerKind::Text, &mut len)?;
        if scope.is_reading() {
            // The backend has checked `len` against the bytes left in the stream.
            let mut buf = vec![0; len as usize];
            scope.text(&mut buf, len)?;
            *self = String::from_utf8(buf).map_err(|_| SerialError::InvalidUtf8)?;
        } else {
            let mut buf = self.as_bytes().to_vec();
            scope.text(&mut buf, len)?;
        }
        scope.finish()
    }
}

// -----------------------------------------------------------------------------
// Sequences

impl<T: Archive + Default> Archive for Vec<T> {
    fn archive(&mut self, builder: &mut SerializationBuilder<'_, '_>) -> Result<(), SerialError> {
        let mut scope = builder.nested();
        let mut len = stream_len(self.len())?;
        scope.container(ContainerKind::Sequential, &mut len)?;
        if scope.is_reading() {
            self.clear();
            self.reserve(len.min(RESERVE_LIMIT) as usize);
            for _ in 0..len {
                let mut item = T::default();
                scope.element(&mut item)?;
                self.push(item);
            }
        } else {
            for item in self.iter_mut() {
                scope.element(item)?;
            }
        }
        scope.finish()
    }
}

impl<T: Archive, const N: usize> Archive for [T; N] {
    /// A shorter streamed array fills a prefix, a longer one is an error.
    fn archive(&mut self, builder: &mut SerializationBuilder<'_, '_>) -> Result<(), SerialError> {
        let mut scope = builder.nested();
        let mut len = stream_len(N)?;
        scope.container(ContainerKind::Sequential, &mut len)?;
        let len = len as usize;
        if len > N {
            return Err(SerialError::Capacity {
                needed: len,
                capacity: N,
            });
        }
        for item in &mut self[..len] {
            scope.element(item)?;
        }
        scope.finish()
    }
}

impl<T: Archive + Default> Archive for Option<T> {
    /// A sequence of zero or one element.
    fn archive(&mut self, builder: &mut SerializationBuilder<'_, '_>) -> Result<(), SerialError> {
        let mut scope = builder.nested();
        let mut len = u32::from(self.is_some());
        scope.container(ContainerKind::Sequential, &mut len)?;
        if scope.is_reading() {
            *self = match len {
                0 => None,
                1 => {
                    let mut value = T::default();
                    scope.element(&mut value)?;
                    Some(value)
                }
                n => return Err(SerialError::malformed(format!("option with {n} elements"))),
            };
        } else if let Some(value) = self {
            scope.element(value)?;
        }
        scope.finish()
    }
}

// -----------------------------------------------------------------------------
// Maps

fn write_entries<'v, K, V>(
    scope: &mut SerializationBuilder<'_, '_>,
    entries: impl Iterator<Item = (&'v K, &'v mut V)>,
) -> Result<(), SerialError>
where
    K: Archive + Clone + 'v,
    V: Archive + 'v,
{
    for (key, value) in entries {
        let mut key = key.clone();
        scope.key(&mut key)?;
        scope.element(value)?;
    }
    Ok(())
}

fn read_entries<K, V>(
    scope: &mut SerializationBuilder<'_, '_>,
    len: u32,
    mut insert: impl FnMut(K, V),
) -> Result<(), SerialError>
where
    K: Archive + Default,
    V: Archive + Default,
{
    for _ in 0..len {
        let mut key = K::default();
        let mut value = V::default();
        scope.key(&mut key)?;
        scope.element(&mut value)?;
        insert(key, value);
    }
    Ok(())
}

impl<K, V> Archive for BTreeMap<K, V>
where
    K: Archive + Default + Clone + Ord,
    V: Archive + Default,
{
    fn archive(&mut self, builder: &mut SerializationBuilder<'_, '_>) -> Result<(), SerialError> {
        let mut scope = builder.nested();
        let mut len = stream_len(self.len())?;
        scope.container(ContainerKind::KeyValue, &mut len)?;
        if scope.is_reading() {
            self.clear();
            read_entries(&mut scope, len, |k, v| {
                self.insert(k, v);
            })?;
        } else {
            write_entries(&mut scope, self.iter_mut())?;
        }
        scope.finish()
    }
}

// -----------------------------------------------------------------------------
// std

#[cfg(feature = "std")]
mod std_impls {
    use alloc::borrow::ToOwned;
    use alloc::string::String;
    use core::hash::{BuildHasher, Hash};
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::{RESERVE_LIMIT, read_entries, write_entries};
    use crate::builder::{Archive, ContainerKind, SerializationBuilder};
    use crate::error::SerialError;
    use crate::walk::stream_len;

    impl Archive for PathBuf {
        fn archive(
            &mut self,
            builder: &mut SerializationBuilder<'_, '_>,
        ) -> Result<(), SerialError> {
            if builder.is_reading() {
                let mut text = String::new();
                text.archive(builder)?;
                *self = PathBuf::from(text);
                Ok(())
            } else {
                let mut text = self.to_str().ok_or(SerialError::InvalidUtf8)?.to_owned();
                text.archive(builder)
            }
        }
    }

    impl<K, V, S> Archive for HashMap<K, V, S>
    where
        K: Archive + Default + Clone + Eq + Hash,
        V: Archive + Default,
        S: BuildHasher,
    {
        /// Entries are written in iteration order, which is unspecified.
        fn archive(
            &mut self,
            builder: &mut SerializationBuilder<'_, '_>,
        ) -> Result<(), SerialError> {
            let mut scope = builder.nested();
            let mut len = stream_len(self.len())?;
            scope.container(ContainerKind::KeyValue, &mut len)?;
            if scope.is_reading() {
                self.clear();
                self.reserve(len.min(RESERVE_LIMIT) as usize);
                read_entries(&mut scope, len, |k, v| {
                    self.insert(k, v);
                })?;
            } else {
                write_entries(&mut scope, self.iter_mut())?;
            }
            scope.finish()
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
