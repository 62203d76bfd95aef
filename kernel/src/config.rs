// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Data structure for storing compile-time configuration options in the kernel.
//!
//! Configuration lives in a typed `const` object rather than in scattered
//! `#[cfg(feature = ...)]` attributes. All code paths are type-checked by the
//! compiler, even those that end up disabled, and after type-checking the
//! compiler folds the constants so a disabled branch costs nothing in the
//! resulting binary.
//!
//! Boards select values through the cargo features of the kernel crate listed
//! in `kernel/Cargo.toml`.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, modify the relevant values in the `CONFIG`
/// constant object defined at the end of this file.
pub struct Config {
    /// Whether `debug!` output is forwarded to the registered debug writer.
    ///
    /// Disabling this removes all formatting code reachable from `debug!`
    /// call sites, which matters on a bootloader that must fit in a few
    /// kilobytes of flash.
    pub debug_output: bool,

    /// Whether the USB driver should dump every received setup packet.
    ///
    /// If enabled, each SETUP stage is printed field by field (request type,
    /// request, value, index and length) before it is dispatched. This is
    /// useful when bringing up enumeration against a new host stack.
    pub trace_setup: bool,
}

/// A unique instance of `Config` where compile-time configuration options are
/// defined. These options are available in the kernel crate to be used for
/// relevant configuration. Notably, this is the only location in the Tock
/// kernel where we permit `#[cfg(x)]` to be used to configure code based on
/// Cargo features.
pub const CONFIG: Config = Config {
    debug_output: !cfg!(feature = "no_debug_output"),
    trace_setup: cfg!(feature = "trace_setup"),
};
