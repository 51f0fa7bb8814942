//! Page-aligned allocation
//!
//! State that migrates with a thread is shipped page by page, so anything a
//! migrating thread writes should sit on pages it does not share with other
//! threads. [`PageBox`] gives a value its own page-aligned, page-padded
//! allocation and reports allocation failure instead of aborting.

use core::fmt;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use std::alloc::{self, Layout};

/// Page size (4KB on x86_64 and the default arm64 configuration)
pub const PAGE_SIZE: usize = 4096;

/// Allocation failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("failed to allocate {size} page-aligned bytes")]
pub struct AllocError {
    pub size: usize,
}

impl AllocError {
    /// Raw error code, as `posix_memalign` would report it
    pub const fn code(&self) -> i32 {
        -libc::ENOMEM
    }
}

/// Owned, page-aligned heap value
pub struct PageBox<T> {
    ptr: NonNull<T>,
}

// SAFETY: PageBox owns its value exclusively, like Box
unsafe impl<T: Send> Send for PageBox<T> {}
// SAFETY: shared access only hands out &T
unsafe impl<T: Sync> Sync for PageBox<T> {}

impl<T> PageBox<T> {
    fn layout() -> Result<Layout, AllocError> {
        let size = core::mem::size_of::<T>().max(1);
        let padded = size.div_ceil(PAGE_SIZE) * PAGE_SIZE;
        let align = core::mem::align_of::<T>().max(PAGE_SIZE);
        Layout::from_size_align(padded, align).map_err(|_| AllocError { size })
    }

    /// Move `value` into its own page-aligned allocation
    pub fn try_new(value: T) -> Result<Self, AllocError> {
        let layout = Self::layout()?;

        // SAFETY: layout has non-zero size
        let raw = unsafe { alloc::alloc(layout) } as *mut T;
        let ptr = NonNull::new(raw).ok_or(AllocError {
            size: layout.size(),
        })?;

        // SAFETY: ptr is freshly allocated, aligned for T and large enough
        unsafe { ptr.as_ptr().write(value) };
        Ok(Self { ptr })
    }

    /// Address of the value (always a multiple of `PAGE_SIZE`)
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Bytes reserved for the value
    pub fn reserved(&self) -> usize {
        Self::layout().map(|l| l.size()).unwrap_or(0)
    }
}

impl<T> Deref for PageBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: ptr is valid and initialized for the lifetime of self
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for PageBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: ptr is valid, initialized and uniquely owned
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for PageBox<T> {
    fn drop(&mut self) {
        // Layout was valid when the value was allocated
        if let Ok(layout) = Self::layout() {
            // SAFETY: ptr came from alloc::alloc with this layout
            unsafe {
                core::ptr::drop_in_place(self.ptr.as_ptr());
                alloc::dealloc(self.ptr.as_ptr() as *mut u8, layout);
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PageBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_alignment() {
        let boxed = PageBox::try_new(7u32).unwrap();
        assert_eq!(boxed.addr() % PAGE_SIZE, 0);
        assert_eq!(*boxed, 7);
        assert_eq!(boxed.reserved(), PAGE_SIZE);
    }

    #[test]
    fn test_large_values_are_padded_to_pages() {
        let boxed = PageBox::try_new([0u8; PAGE_SIZE + 1]).unwrap();
        assert_eq!(boxed.reserved(), 2 * PAGE_SIZE);
    }

    #[test]
    fn test_mutation_and_drop() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct Counted(Arc<AtomicUsize>);
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let mut boxed = PageBox::try_new((Counted(drops.clone()), 1)).unwrap();
        boxed.1 = 2;
        assert_eq!(boxed.1, 2);
        drop(boxed);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_alloc_error_code() {
        assert_eq!(AllocError { size: 1 }.code(), -libc::ENOMEM);
    }
}
