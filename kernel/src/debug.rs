// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Support for in-kernel debugging.
//!
//! The `debug!` macro formats its arguments and hands the resulting text to
//! the debug writer registered by the board. Before a writer is registered,
//! and whenever `CONFIG.debug_output` is false, output is silently dropped.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! debug!("Yes the code gets here with value {}", i);
//! debug!("RESET");
//! ```
//!
//! The writer itself is synchronous: on this target `debug!` is only used from
//! the USB interrupt handler and from initialization, so there is no queue and
//! no deferred flushing.

use core::fmt::{self, Write};
use core::ptr::addr_of_mut;

use crate::config::CONFIG;

/// Byte sink for debug output, usually a blocking UART transmitter.
pub trait IoWrite {
    /// Write as many bytes of `buf` as possible, returning how many were
    /// written.
    fn write(&mut self, buf: &[u8]) -> usize;
}

static mut DEBUG_WRITER: Option<&'static mut dyn IoWrite> = None;

/// Register the writer used by `debug!`.
///
/// # Safety
///
/// Must be called before interrupts are enabled, and not concurrently with any
/// `debug!` invocation.
pub unsafe fn set_debug_writer(writer: &'static mut dyn IoWrite) {
    *addr_of_mut!(DEBUG_WRITER) = Some(writer);
}

struct DebugWriterWrapper<'a> {
    writer: &'a mut dyn IoWrite,
}

impl Write for DebugWriterWrapper<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut bytes = s.as_bytes();
        while !bytes.is_empty() {
            let written = self.writer.write(bytes);
            if written == 0 {
                return Err(fmt::Error);
            }
            bytes = &bytes[written.min(bytes.len())..];
        }
        Ok(())
    }
}

fn with_writer<F: FnOnce(&mut DebugWriterWrapper)>(f: F) {
    if !CONFIG.debug_output {
        return;
    }
    // Single core, and `debug!` is only used from one execution context at a
    // time.
    let slot = unsafe { &mut *addr_of_mut!(DEBUG_WRITER) };
    if let Some(writer) = slot.as_deref_mut() {
        f(&mut DebugWriterWrapper { writer });
    }
}

/// Write a formatted line to the debug writer, if one is registered.
pub fn debug_println(args: fmt::Arguments) {
    with_writer(|writer| {
        let _ = writer.write_fmt(args);
        let _ = writer.write_str("\r\n");
    });
}

/// In-kernel `println()` debugging.
#[macro_export]
macro_rules! debug {
    () => ({
        // Allow an empty debug!() to print the location when hit
        debug!("")
    });
    ($msg:expr $(,)?) => ({
        $crate::debug::debug_println(format_args!($msg));
    });
    ($fmt:expr, $($arg:tt)+) => ({
        $crate::debug::debug_println(format_args!($fmt, $($arg)+));
    });
}
