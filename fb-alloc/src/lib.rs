// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # Framebuffer Scratch Arena
//!
//! A fixed-capacity, stack-discipline arena for the short-lived line buffers
//! used while compositing. Memory is reserved once up front and handed out in
//! LIFO order: every [`Frame`] marks the arena when it is opened and frees
//! everything allocated through it when it is dropped.
//!
//! Frames may be nested, but only strictly: a child frame borrows its parent
//! mutably, so the borrow checker rejects interleaved lifetimes.
//!
//! ## Example
//!
//! ```
//! use fb_alloc::FbAlloc;
//!
//! let mut arena = FbAlloc::new(4096);
//! {
//!     let mut frame = arena.frame();
//!     let line: &mut [u16] = frame.alloc(320).unwrap();
//!     let mask = frame.alloc_bytes(40).unwrap();
//!     line[0] = 0xffff;
//!     mask[0] = 1;
//! }
//! assert_eq!(arena.used(), 0);
//! ```

pub use bytemuck::Pod;
use std::{
    cell::RefCell,
    mem::{align_of, size_of},
    sync::atomic::{AtomicUsize, Ordering},
};
use thiserror::Error;
use tracing::{debug, trace};

/// Capacity of the per-thread default arena unless overridden with
/// [`set_default_capacity`].
pub const FB_ALLOC_DEFAULT_SIZE: usize = 512 * 1024;

/// Allocation granule. Every allocation starts on this boundary, which keeps
/// typed casts to `u16` and `u32` aligned.
const GRANULE: usize = 8;

static DEFAULT_CAPACITY: AtomicUsize = AtomicUsize::new(FB_ALLOC_DEFAULT_SIZE);

thread_local! {
    static DEFAULT_ARENA: RefCell<Option<FbAlloc>> = const { RefCell::new(None) };
}

/// Errors reported by the scratch arena.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FbAllocError {
    /// The request does not fit in the remaining free region.
    #[error("scratch arena exhausted: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },
}

/// Fixed-capacity scratch arena.
///
/// # Thread Safety
///
/// `FbAlloc` is not shared between threads. Each thread that uses the
/// convenience entry points gets its own default arena through
/// [`with_default`].
#[derive(Debug)]
pub struct FbAlloc {
    storage: Box<[u64]>,
    used: usize,
    depth: usize,
    peak: usize,
}

impl FbAlloc {
    /// Reserves `capacity` bytes (rounded up to the allocation granule).
    pub fn new(capacity: usize) -> Self {
        let words = capacity.div_ceil(GRANULE);
        debug!("fb_alloc reserved {} bytes", words * GRANULE);
        Self {
            storage: vec![0u64; words].into_boxed_slice(),
            used: 0,
            depth: 0,
            peak: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len() * GRANULE
    }

    /// Bytes currently held by live frames.
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn available(&self) -> usize {
        self.capacity() - self.used
    }

    /// Number of live frames. Always zero when no frame is borrowed.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// High-water mark in bytes since creation or the last [`reset_peak`].
    ///
    /// [`reset_peak`]: FbAlloc::reset_peak
    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn reset_peak(&mut self) {
        self.peak = self.used;
    }

    /// Marks the arena and returns a frame that frees back to the mark when
    /// dropped.
    pub fn frame(&mut self) -> Frame<'_> {
        let FbAlloc {
            storage,
            used,
            depth,
            peak,
        } = self;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut storage[..]);
        let mark = *used;
        *depth += 1;
        trace!("fb_alloc mark {} depth {}", mark, *depth);
        Frame {
            used,
            depth,
            peak,
            mark,
            free: &mut bytes[mark..],
        }
    }
}

/// A marked region of the arena.
///
/// Slices handed out by [`Frame::alloc`] stay valid while the arena remains
/// borrowed; the space they occupy is returned when the frame is dropped.
#[derive(Debug)]
pub struct Frame<'a> {
    used: &'a mut usize,
    depth: &'a mut usize,
    peak: &'a mut usize,
    mark: usize,
    free: &'a mut [u8],
}

impl<'a> Frame<'a> {
    /// Allocates `len` zeroed bytes.
    pub fn alloc_bytes(&mut self, len: usize) -> Result<&'a mut [u8], FbAllocError> {
        let rounded = len.div_ceil(GRANULE) * GRANULE;
        if rounded > self.free.len() {
            return Err(FbAllocError::OutOfMemory {
                requested: len,
                available: self.free.len(),
            });
        }

        let free = std::mem::take(&mut self.free);
        let (head, tail) = free.split_at_mut(rounded);
        self.free = tail;
        *self.used += rounded;
        *self.peak = (*self.peak).max(*self.used);

        let block = &mut head[..len];
        block.fill(0);
        Ok(block)
    }

    /// Allocates `len` zeroed elements of `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` requires an alignment above 8 bytes.
    pub fn alloc<T: Pod>(&mut self, len: usize) -> Result<&'a mut [T], FbAllocError> {
        assert!(align_of::<T>() <= GRANULE, "fb_alloc alignment too large");
        let bytes = self.alloc_bytes(len * size_of::<T>())?;
        Ok(bytemuck::cast_slice_mut(bytes))
    }

    /// Opens a nested frame on the remaining free region.
    pub fn frame(&mut self) -> Frame<'_> {
        let mark = *self.used;
        *self.depth += 1;
        trace!("fb_alloc mark {} depth {}", mark, *self.depth);
        Frame {
            used: &mut *self.used,
            depth: &mut *self.depth,
            peak: &mut *self.peak,
            mark,
            free: &mut *self.free,
        }
    }

    /// Bytes still available to this frame.
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        *self.used = self.mark;
        *self.depth -= 1;
        trace!("fb_alloc free till mark {} depth {}", self.mark, *self.depth);
    }
}

/// Sets the capacity used by default arenas created (or re-created) after
/// this call.
pub fn set_default_capacity(bytes: usize) {
    DEFAULT_CAPACITY.store(bytes, Ordering::Relaxed);
}

pub fn default_capacity() -> usize {
    DEFAULT_CAPACITY.load(Ordering::Relaxed)
}

/// Runs `f` with this thread's default arena, creating it on first use.
///
/// The arena is rebuilt if the configured default capacity changed since it
/// was created.
///
/// # Panics
///
/// Panics if called re-entrantly from within `f`; the default arena is not
/// re-entrant.
pub fn with_default<R>(f: impl FnOnce(&mut FbAlloc) -> R) -> R {
    DEFAULT_ARENA.with(|cell| {
        let mut slot = cell.borrow_mut();
        let wanted = default_capacity().div_ceil(GRANULE) * GRANULE;
        let arena = match slot.take() {
            Some(arena) if arena.capacity() == wanted => slot.insert(arena),
            _ => slot.insert(FbAlloc::new(wanted)),
        };
        f(arena)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_frees_to_mark() {
        let mut arena = FbAlloc::new(1024);
        {
            let mut frame = arena.frame();
            frame.alloc_bytes(10).unwrap();
            frame.alloc_bytes(100).unwrap();
        }
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.depth(), 0);
        assert_eq!(arena.peak(), 16 + 104);
    }

    #[test]
    fn nested_frames_are_lifo() {
        let mut arena = FbAlloc::new(1024);
        {
            let mut outer = arena.frame();
            let a = outer.alloc::<u32>(4).unwrap();
            a.fill(7);
            {
                let mut inner = outer.frame();
                let b = inner.alloc::<u32>(4).unwrap();
                assert!(b.iter().all(|&v| v == 0));
                b.fill(9);
            }
            assert_eq!(outer.available(), 1024 - 16);
            assert!(a.iter().all(|&v| v == 7));
        }
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.peak(), 32);
    }

    #[test]
    fn exhaustion_reports_sizes() {
        let mut arena = FbAlloc::new(64);
        let mut frame = arena.frame();
        frame.alloc_bytes(60).unwrap();
        let err = frame.alloc_bytes(8).unwrap_err();
        assert_eq!(
            err,
            FbAllocError::OutOfMemory {
                requested: 8,
                available: 0
            }
        );
    }

    #[test]
    fn typed_allocations_are_aligned() {
        let mut arena = FbAlloc::new(256);
        let mut frame = arena.frame();
        frame.alloc_bytes(3).unwrap();
        let words = frame.alloc::<u32>(5).unwrap();
        assert_eq!(words.as_ptr() as usize % align_of::<u32>(), 0);
        let halves = frame.alloc::<u16>(3).unwrap();
        assert_eq!(halves.len(), 3);
    }

    #[test]
    fn reused_memory_is_zeroed() {
        let mut arena = FbAlloc::new(64);
        arena.frame().alloc_bytes(32).unwrap().fill(0xaa);
        let mut frame = arena.frame();
        assert!(frame.alloc_bytes(32).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn default_arena_is_balanced() {
        let used = with_default(|arena| {
            let mut frame = arena.frame();
            frame.alloc_bytes(128).unwrap();
            drop(frame);
            arena.used()
        });
        assert_eq!(used, 0);
        assert_eq!(with_default(|arena| arena.depth()), 0);
    }
}
