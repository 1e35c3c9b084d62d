use core::ops::{Deref, DerefMut};

/// Fixed capacity byte buffer owned by a transfer channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferBuffer<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> TransferBuffer<N> {
    pub const CAPACITY: usize = N;

    pub const fn new() -> Self {
        Self { data: [0; N] }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Zero fill.
    #[inline]
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Copies as much of `src` as fits to the front of the buffer.
    /// Returns the number of bytes copied.
    pub fn copy_from(&mut self, src: &[u8]) -> usize {
        let len = src.len().min(N);
        self.data[..len].copy_from_slice(&src[..len]);
        len
    }

    /// Copies the front of the buffer into `dst`.
    /// Returns the number of bytes copied.
    pub fn copy_to(&self, dst: &mut [u8]) -> usize {
        let len = dst.len().min(N);
        dst[..len].copy_from_slice(&self.data[..len]);
        len
    }
}

impl<const N: usize> Default for TransferBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Deref for TransferBuffer<N> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl<const N: usize> DerefMut for TransferBuffer<N> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl<const N: usize> From<[u8; N]> for TransferBuffer<N> {
    fn from(data: [u8; N]) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_in_and_out() {
        let mut b = TransferBuffer::<4>::new();
        assert_eq!(b.capacity(), 4);
        assert_eq!(b.copy_from(&[1, 2, 3, 4, 5, 6]), 4);
        assert_eq!(&b[..], &[1, 2, 3, 4]);

        let mut out = [0; 2];
        assert_eq!(b.copy_to(&mut out), 2);
        assert_eq!(out, [1, 2]);

        b[3] = 9;
        assert_eq!(&b[..], &[1, 2, 3, 9]);
        b.clear();
        assert_eq!(b, TransferBuffer::default());
    }
}
