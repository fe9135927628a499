//! A byte FIFO with fixed capacity, shared between an interrupt handler and
//! the main loop.
//!
//! The buffer lives in caller-supplied storage and never allocates. One side
//! (typically a USB endpoint or UART receive interrupt) writes, the other side
//! reads, and every update of the shared indices happens with the associated
//! interrupt suppressed through a [`Gate`].
//!
//! # Feature Flags
//! The **irqfifo** crate has the following cargo feature flags:
//!
//! - `std`
//!   - Optional, enabled by default
//!   - Use libstd and implement `std::error::Error` for [`Error`]
//!
//!
//! - `defmt`
//!   - Optional
//!   - Derive `defmt::Format` for [`Error`] and emit trace events on
//!     construction failures and overwrites
//!
//!
//! - `cortex-m`
//!   - Optional
//!   - Provide `NvicLine`, a gate that masks a single NVIC interrupt line
//!
//! # Usage
//!
//! First, add the following to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! irqfifo = { version = "0.1", default-features = false }
//! ```
//!
//! # Capacity
//!
//! Unlike the classic "one slot always free" ring buffer, the length is
//! tracked on its own, so `capacity()` is exactly the number of bytes of
//! storage handed in.
//!
//! # Examples
//! ```
//! use irqfifo::{CriticalSection, Error, Fifo, Saturating};
//!
//! let mut storage = [0u8; 4];
//! let fifo: Fifo<_, Saturating> = Fifo::new(&mut storage, CriticalSection).unwrap();
//!
//! fifo.write(1).unwrap();
//! fifo.write(2).unwrap();
//! assert_eq!(fifo.len(), 2);
//!
//! assert_eq!(fifo.read(), Ok(1));
//! assert_eq!(fifo.read(), Ok(2));
//! assert_eq!(fifo.read(), Err(Error::BufferEmpty));
//! ```
//!
//! # Overwriting
//! ```
//! use irqfifo::{CriticalSection, Fifo, Wrapping};
//!
//! let mut storage = [0u8; 4];
//! let fifo: Fifo<_, Wrapping> = Fifo::new(&mut storage, CriticalSection).unwrap();
//!
//! for byte in 0..6 {
//!     fifo.write(byte).unwrap();
//! }
//!
//! let mut out = [0u8; 4];
//! assert_eq!(fifo.read_slice(&mut out), 4);
//! assert_eq!(out, [2, 3, 4, 5]);
//! ```
//!
//! # Interrupt Handlers
//!
//! The fifo only needs `&self`, so it can sit in a `static` shared by the
//! handler and the main loop:
//!
//! ```ignore
//! static RX: StaticCell<Fifo<'static, NvicLine<Interrupt>, Wrapping>> = StaticCell::new();
//!
//! #[interrupt]
//! fn USBCTRL_IRQ() {
//!     while let Some(byte) = endpoint_next_byte() {
//!         let _ = rx().write(byte);
//!     }
//! }
//!
//! fn poll(out: &mut [u8]) -> usize {
//!     rx().read_array(out, 16)
//! }
//! ```

#![cfg_attr(not(any(feature="std", test)), no_std)]

#![deny(missing_docs)]

#[cfg(not(any(feature="std", test)))]
extern crate core as std;

use std::cmp;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use portable_atomic::{AtomicUsize, Ordering};

#[macro_use]
mod fmt;

mod behavior;
pub mod error;
pub mod gate;
mod utils;

pub use behavior::{Behavior, Saturating, Wrapping};
pub use error::Error;
pub use gate::{CriticalSection, Gate};
#[cfg(feature = "cortex-m")]
pub use gate::NvicLine;

use gate::Suppressed;
use utils::wrap_add;

/// A fixed capacity byte FIFO over borrowed storage.
///
/// `write` appends at the back, `read` and `read_array` take from the front.
/// All operations take `&self`: one context writes, the other reads, and the
/// gate `G` keeps them from interleaving. Whether a write to a full fifo
/// evicts the oldest byte is chosen by `B`.
///
/// The length is stored separately from the two indices because
/// `write_index == read_index` holds both when empty and when full.
pub struct Fifo<'a, G: Gate, B: Behavior = Saturating> {
    buf: NonNull<u8>,
    size: usize,
    len: AtomicUsize,
    wr: AtomicUsize,
    rd: AtomicUsize,
    gate: G,
    phantom: PhantomData<(&'a mut [u8], B)>,
}

// Storage is only touched while `gate` is suppressed.
unsafe impl<'a, G: Gate + Send, B: Behavior> Send for Fifo<'a, G, B> {}
unsafe impl<'a, G: Gate + Sync, B: Behavior> Sync for Fifo<'a, G, B> {}

impl<'a, G: Gate, B: Behavior> Fifo<'a, G, B> {
    /// Creates an empty fifo using all of `storage`.
    ///
    /// Fails with `Error::InvalidArgument` if `storage` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use irqfifo::{CriticalSection, Error, Fifo, Saturating};
    ///
    /// let mut storage = [0u8; 8];
    /// let fifo: Fifo<_, Saturating> = Fifo::new(&mut storage, CriticalSection).unwrap();
    /// assert_eq!(fifo.capacity(), 8);
    ///
    /// let none: Result<Fifo<_, Saturating>, _> = Fifo::new(&mut [], CriticalSection);
    /// assert_eq!(none.err(), Some(Error::InvalidArgument));
    /// ```
    pub fn new(storage: &'a mut [u8], gate: G) -> Result<Self, Error> {
        let capacity = storage.len();
        Self::with_capacity(storage, capacity, gate)
    }

    /// Creates an empty fifo over the first `capacity` bytes of `storage`.
    ///
    /// Fails with `Error::InvalidArgument` if `capacity` is zero or larger
    /// than `storage`. The gate is stored but not touched.
    pub fn with_capacity(storage: &'a mut [u8], capacity: usize, gate: G) -> Result<Self, Error> {
        if capacity == 0 || capacity > storage.len() {
            debug!("fifo: rejected capacity {} over {} bytes", capacity, storage.len());
            return Err(Error::InvalidArgument);
        }
        let storage = &mut storage[..capacity];

        Ok(Fifo {
            buf: NonNull::from(storage).cast(),
            size: capacity,
            len: AtomicUsize::new(0),
            wr: AtomicUsize::new(0),
            rd: AtomicUsize::new(0),
            gate,
            phantom: PhantomData,
        })
    }

    /// Returns the number of bytes the fifo can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// Returns the number of bytes in the fifo.
    ///
    /// A single atomic load; it never observes a half-finished update.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns true if the fifo holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the fifo is full.
    ///
    /// # Examples
    ///
    /// ```
    /// use irqfifo::{CriticalSection, Fifo, Saturating};
    ///
    /// let mut storage = [0u8; 2];
    /// let fifo: Fifo<_, Saturating> = Fifo::new(&mut storage, CriticalSection).unwrap();
    ///
    /// fifo.write(1).unwrap();
    /// assert!(!fifo.is_full());
    /// fifo.write(2).unwrap();
    /// assert!(fifo.is_full());
    /// ```
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.size
    }

    /// Returns the number of bytes that can be written before the fifo is full.
    #[inline]
    pub fn free(&self) -> usize {
        self.size - self.len()
    }

    /// Returns true if writes to a full fifo evict the oldest byte.
    #[inline]
    pub fn is_overwritable(&self) -> bool {
        B::OVERWRITE
    }

    /// Returns the gate guarding this fifo.
    #[inline]
    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Appends `byte` to the back of the fifo.
    ///
    /// When the fifo is full, a `Saturating` fifo drops `byte` and returns
    /// `Error::BufferFull`; a `Wrapping` fifo stores it over the oldest byte
    /// and succeeds.
    ///
    /// ```text
    /// Saturating  [1, 2, 3] <-(+)- 4 => [1, 2, 3] -> Err(BufferFull)
    /// Wrapping    [1, 2, 3] <-(+)- 4 => [2, 3, 4] -> Ok(())
    /// ```
    pub fn write(&self, byte: u8) -> Result<(), Error> {
        let _cs = Suppressed::new(&self.gate);

        let len = self.len.load(Ordering::Acquire);
        if len == self.size && !B::OVERWRITE {
            return Err(Error::BufferFull);
        }

        unsafe { self.push_locked(len, byte) };
        Ok(())
    }

    /// Removes the byte at the front of the fifo and returns it.
    ///
    /// Returns `Error::BufferEmpty` if there is nothing to read.
    pub fn read(&self) -> Result<u8, Error> {
        let _cs = Suppressed::new(&self.gate);

        let len = self.len.load(Ordering::Acquire);
        if len == 0 {
            return Err(Error::BufferEmpty);
        }

        let rd = self.rd.load(Ordering::Relaxed);
        let byte = unsafe { self.buffer_read(rd) };
        self.rd.store(wrap_add(rd, 1, self.size), Ordering::Relaxed);
        self.len.store(len - 1, Ordering::Release);
        Ok(byte)
    }

    /// Returns the byte at the front of the fifo without removing it.
    pub fn peek(&self) -> Result<u8, Error> {
        let _cs = Suppressed::new(&self.gate);

        if self.len.load(Ordering::Acquire) == 0 {
            return Err(Error::BufferEmpty);
        }
        let rd = self.rd.load(Ordering::Relaxed);
        Ok(unsafe { self.buffer_read(rd) })
    }

    /// Moves up to `max_len` bytes from the front of the fifo into `output`,
    /// oldest first, and returns how many were moved.
    ///
    /// The whole batch runs in one critical section, so `max_len` bounds how
    /// long the interrupt is held off. Never fails: an empty fifo or a
    /// `max_len` of zero yields 0. `output.len()` also bounds the count.
    ///
    /// # Examples
    ///
    /// ```
    /// use irqfifo::{CriticalSection, Fifo, Saturating};
    ///
    /// let mut storage = [0u8; 8];
    /// let fifo: Fifo<_, Saturating> = Fifo::new(&mut storage, CriticalSection).unwrap();
    /// fifo.write_array(b"hello");
    ///
    /// let mut out = [0u8; 8];
    /// assert_eq!(fifo.read_array(&mut out, 3), 3);
    /// assert_eq!(&out[..3], b"hel");
    /// assert_eq!(fifo.read_array(&mut out, 8), 2);
    /// assert_eq!(&out[..2], b"lo");
    /// ```
    pub fn read_array(&self, output: &mut [u8], max_len: usize) -> usize {
        let max_len = cmp::min(max_len, output.len());
        if max_len == 0 {
            return 0;
        }

        let _cs = Suppressed::new(&self.gate);

        let len = self.len.load(Ordering::Acquire);
        let count = cmp::min(max_len, len);
        let rd = self.rd.load(Ordering::Relaxed);
        for (i, slot) in output[..count].iter_mut().enumerate() {
            *slot = unsafe { self.buffer_read(wrap_add(rd, i, self.size)) };
        }

        if count > 0 {
            self.rd.store(wrap_add(rd, count, self.size), Ordering::Relaxed);
            self.len.store(len - count, Ordering::Release);
        }
        count
    }

    /// Same as `read_array(output, output.len())`.
    #[inline]
    pub fn read_slice(&self, output: &mut [u8]) -> usize {
        self.read_array(output, output.len())
    }

    /// Empties the fifo.
    ///
    /// The stored bytes are left in place but can no longer be read.
    ///
    /// # Examples
    ///
    /// ```
    /// use irqfifo::{CriticalSection, Fifo, Saturating};
    ///
    /// let mut storage = [0u8; 4];
    /// let fifo: Fifo<_, Saturating> = Fifo::new(&mut storage, CriticalSection).unwrap();
    /// fifo.write(1).unwrap();
    /// fifo.clear();
    /// assert!(fifo.is_empty());
    /// ```
    pub fn clear(&self) {
        let _cs = Suppressed::new(&self.gate);

        self.wr.store(0, Ordering::Relaxed);
        self.rd.store(0, Ordering::Relaxed);
        self.len.store(0, Ordering::Release);
    }

    /// Stores `byte` at the write index. Evicts the oldest byte when `len`
    /// is already the capacity.
    ///
    /// Caller holds the gate and passes the current length.
    #[inline]
    unsafe fn push_locked(&self, len: usize, byte: u8) -> usize {
        let wr = self.wr.load(Ordering::Relaxed);
        self.buffer_write(wr, byte);
        self.wr.store(wrap_add(wr, 1, self.size), Ordering::Relaxed);

        if len == self.size {
            let rd = self.rd.load(Ordering::Relaxed);
            self.rd.store(wrap_add(rd, 1, self.size), Ordering::Relaxed);
            trace!("fifo: overwrote oldest byte");
            len
        } else {
            self.len.store(len + 1, Ordering::Release);
            len + 1
        }
    }

    #[inline]
    unsafe fn buffer_read(&self, offset: usize) -> u8 {
        debug_assert!(offset < self.size);
        ptr::read_volatile(self.buf.as_ptr().add(offset))
    }

    #[inline]
    unsafe fn buffer_write(&self, offset: usize, byte: u8) {
        debug_assert!(offset < self.size);
        ptr::write_volatile(self.buf.as_ptr().add(offset), byte)
    }

    fn with_behavior<C: Behavior>(self) -> Fifo<'a, G, C> {
        Fifo {
            buf: self.buf,
            size: self.size,
            len: self.len,
            wr: self.wr,
            rd: self.rd,
            gate: self.gate,
            phantom: PhantomData,
        }
    }
}

impl<'a, G: Gate> Fifo<'a, G, Saturating> {
    /// Converts `self` into a `Fifo<'a, G, Wrapping>`, keeping its contents.
    pub fn wrapping(self) -> Fifo<'a, G, Wrapping> {
        self.with_behavior()
    }

    /// Appends bytes from `input` until the fifo is full and returns how many
    /// were accepted.
    ///
    /// One critical section covers the whole batch.
    ///
    /// ```text
    /// [1, _, _] <-(+)- [2, 3, 4] => [1, 2, 3] -> 2
    /// ```
    pub fn write_array(&self, input: &[u8]) -> usize {
        if input.is_empty() {
            return 0;
        }

        let _cs = Suppressed::new(&self.gate);

        let mut len = self.len.load(Ordering::Acquire);
        let count = cmp::min(input.len(), self.size - len);
        for &byte in &input[..count] {
            len = unsafe { self.push_locked(len, byte) };
        }
        count
    }
}

impl<'a, G: Gate> Fifo<'a, G, Wrapping> {
    /// Converts `self` into a `Fifo<'a, G, Saturating>`, keeping its contents.
    pub fn saturating(self) -> Fifo<'a, G, Saturating> {
        self.with_behavior()
    }

    /// Appends every byte of `input`, evicting the oldest bytes as needed,
    /// and returns `input.len()`.
    ///
    /// One critical section covers the whole batch.
    ///
    /// ```text
    /// [1, 2, _] <-(+)- [3, 4, 5] => [3, 4, 5] -> 3
    /// ```
    pub fn write_array(&self, input: &[u8]) -> usize {
        if input.is_empty() {
            return 0;
        }

        let _cs = Suppressed::new(&self.gate);

        let mut len = self.len.load(Ordering::Acquire);
        for &byte in input {
            len = unsafe { self.push_locked(len, byte) };
        }
        input.len()
    }
}

impl<'a, G: Gate, B: Behavior> std::fmt::Debug for Fifo<'a, G, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Fifo")
            .field("capacity", &self.size)
            .field("len", &self.len())
            .field("overwritable", &B::OVERWRITE)
            .finish()
    }
}
