// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static trace ring buffers for debugging the startup path and drivers.
//!
//! A ring buffer is a fixed-size static that records the most recent events
//! of interest in a module, for inspection with a debugger attached to a
//! live or wedged board. Entries carry the source line, a wrap generation,
//! and a repeat count; recording the same payload from the same line twice
//! in a row bumps the count instead of burning a slot.
//!
//! Payload types must implement both `Copy` and `PartialEq`.
//!
//! Buffers are declared with [`ringbuf!`] and written with
//! [`ringbuf_entry!`]:
//!
//! ```
//! ringbuf!(Trace, 16, Trace::None);
//!
//! // ...
//!
//! ringbuf_entry!(Trace::PinEvent(pin));
//! ```
//!
//! If you omit the name, the buffer is called `__RINGBUF` and you can only
//! have one per module; provide a name to have several.
//!
//! Recording never blocks: the buffer is guarded by a spinlock that writers
//! take with `try_lock`, and an entry that loses the race is dropped rather
//! than spun on. That makes `ringbuf_entry!` safe to use from interrupt
//! context against a preempted writer, at the cost of occasionally missing
//! an event under contention. Slot reuse keeps the rest of the story intact:
//! the generation field tells a reader how many times a slot has wrapped, so
//! a gap is visible as a generation skip rather than silent.
//!
//! Building with the `disabled` feature compiles all of this to nothing
//! while still type-checking payload expressions.

#![cfg_attr(not(test), no_std)]

/// Declares a ring buffer in the current module or context.
///
/// `ringbuf!(NAME, Type, N, expr)` makes a ring buffer named `NAME`,
/// containing entries of type `Type`, with room for `N` such entries, all of
/// which are initialized to `expr`.
///
/// The resulting buffer is a static, so `NAME` should be uppercase. Omitting
/// the name declares `__RINGBUF`, which covers the common one-per-module
/// case.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[used]
        static $name: $crate::TraceBuf<$t, $n> = $crate::TraceBuf::new($init);
    };
    ($t:ty, $n:expr, $init:expr) => {
        $crate::ringbuf!(__RINGBUF, $t, $n, $init);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
    ($t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
}

/// Records an entry in a ring buffer declared with [`ringbuf!`].
///
/// `ringbuf_entry!(NAME, expr)` records into `NAME`;
/// `ringbuf_entry!(expr)` records into the module's `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate the payload before touching the buffer, so a payload
        // expression can't observe the binding we take on the buffer.
        let (p, buf) = ($payload, &$buf);
        $crate::TraceBuf::record(buf, line!() as u16, p);
    }};
    ($payload:expr) => {
        $crate::ringbuf_entry!(__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$buf;
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

/// Records an entry in a ring buffer declared at the root of the current
/// crate, from any module within it.
#[cfg(not(feature = "disabled"))]
#[allow(clippy::crate_in_macro_def)]
#[macro_export]
macro_rules! ringbuf_entry_root {
    ($buf:ident, $payload:expr) => {
        $crate::ringbuf_entry!(crate::$buf, $payload);
    };
    ($payload:expr) => {
        $crate::ringbuf_entry!(crate::__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry_root {
    ($buf:ident, $payload:expr) => {{
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

/// One slot of a [`Ringbuf`].
///
/// An entry whose `line` and `payload` match the most recent insertion is
/// coalesced into it by incrementing `count` instead of taking a new slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

/// The ring itself. Fields are public so debuggers can walk a buffer from a
/// RAM image; firmware code goes through [`TraceBuf`] instead.
#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    pub last: Option<usize>,
    pub buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, N> {
    pub const fn new(init: T) -> Self {
        Self {
            last: None,
            buffer: [RingbufEntry {
                line: 0,
                generation: 0,
                count: 0,
                payload: init,
            }; N],
        }
    }

    pub fn entry(&mut self, line: u16, payload: T) {
        // Coalesce a repeat of the most recent entry, unless its count would
        // overflow. get_mut also covers a corrupted index: out of range just
        // means no coalescing.
        if let Some(ent) =
            self.last.and_then(|last| self.buffer.get_mut(last))
        {
            if ent.line == line && ent.payload == payload {
                if let Some(count) = ent.count.checked_add(1) {
                    ent.count = count;
                    return;
                }
            }
        }

        // wrapping_add rather than +1 so a corrupted index cannot panic us;
        // it lands out of range and restarts the ring at slot zero.
        let ndx = match self.last {
            Some(last) => {
                let next = last.wrapping_add(1);
                if next >= N {
                    0
                } else {
                    next
                }
            }
            None => 0,
        };

        let ent = &mut self.buffer[ndx];
        *ent = RingbufEntry {
            line,
            payload,
            count: 1,
            generation: ent.generation.wrapping_add(1),
        };
        self.last = Some(ndx);
    }
}

/// A [`Ringbuf`] behind a spinlock, suitable for a static.
///
/// In practice you do not name this type: [`ringbuf!`] declares one and
/// [`ringbuf_entry!`] records into it.
pub struct TraceBuf<T: Copy + PartialEq, const N: usize> {
    inner: spin::Mutex<Ringbuf<T, N>>,
}

impl<T: Copy + PartialEq, const N: usize> TraceBuf<T, N> {
    pub const fn new(init: T) -> Self {
        Self {
            inner: spin::Mutex::new(Ringbuf::new(init)),
        }
    }

    /// Records an entry, or drops it if the buffer is locked by a preempted
    /// writer. Never blocks, so this is callable from interrupt context.
    pub fn record(&self, line: u16, payload: T) {
        if let Some(mut buf) = self.inner.try_lock() {
            buf.entry(line, payload);
        }
    }

    /// Runs `f` against the buffer contents. This one does block on the
    /// lock; it is for tests and thread-context introspection, not for
    /// interrupt handlers.
    pub fn with<R>(&self, f: impl FnOnce(&Ringbuf<T, N>) -> R) -> R {
        f(&self.inner.lock())
    }
}
