// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Element types that file reads and writes are measured in.
//!
//! Offsets and counts passed to [`crate::FileHandle::read`] and
//! [`crate::FileHandle::write`] are in units of the buffer's element width,
//! never raw bytes. Values are laid out in native byte order.

use bytes::Bytes;

/// A fixed-width element that can be copied in and out of file content.
pub trait Unit: Copy + Default + Send + Sync + 'static {
    const WIDTH: usize;

    fn from_ne_slice(bytes: &[u8]) -> Self;

    fn extend_ne(self, out: &mut Vec<u8>);
}

macro_rules! impl_unit {
    ($($t:ty),* $(,)?) => {
        $(
            impl Unit for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn from_ne_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$t>::from_ne_bytes(raw)
                }

                fn extend_ne(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_unit!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Data that can be written to a file.
pub trait Units: Send + Sync {
    /// Width in bytes of one element.
    fn unit_width(&self) -> usize;

    fn to_bytes(&self) -> Bytes;
}

impl Units for str {
    fn unit_width(&self) -> usize {
        1
    }

    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl Units for String {
    fn unit_width(&self) -> usize {
        1
    }

    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl Units for Bytes {
    fn unit_width(&self) -> usize {
        1
    }

    fn to_bytes(&self) -> Bytes {
        self.clone()
    }
}

impl<T: Unit> Units for [T] {
    fn unit_width(&self) -> usize {
        T::WIDTH
    }

    fn to_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.len() * T::WIDTH);
        for value in self {
            value.extend_ne(&mut out);
        }
        Bytes::from(out)
    }
}

impl<T: Unit> Units for Vec<T> {
    fn unit_width(&self) -> usize {
        T::WIDTH
    }

    fn to_bytes(&self) -> Bytes {
        self.as_slice().to_bytes()
    }
}

impl<T: Unit, const N: usize> Units for [T; N] {
    fn unit_width(&self) -> usize {
        T::WIDTH
    }

    fn to_bytes(&self) -> Bytes {
        self.as_slice().to_bytes()
    }
}

/// Copy whole elements from `bytes` into `buf`, returning how many were copied.
pub(crate) fn fill<T: Unit>(buf: &mut [T], bytes: &[u8]) -> u64 {
    let mut copied = 0;
    for (slot, chunk) in buf.iter_mut().zip(bytes.chunks_exact(T::WIDTH)) {
        *slot = T::from_ne_slice(chunk);
        copied += 1;
    }
    copied
}

/// Replace bytes `[start, end)` of `content` with `data`.
///
/// Both bounds are clipped to the content, so writes past the end append.
pub fn splice_bytes(content: &[u8], start: u64, end: u64, data: &[u8]) -> Vec<u8> {
    let len = content.len();
    let start = usize::try_from(start).unwrap_or(usize::MAX).min(len);
    let end = usize::try_from(end).unwrap_or(usize::MAX).clamp(start, len);
    let mut out = Vec::with_capacity(start + data.len() + (len - end));
    out.extend_from_slice(&content[..start]);
    out.extend_from_slice(data);
    out.extend_from_slice(&content[end..]);
    out
}
