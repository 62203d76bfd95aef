// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Core kernel crate for the USB device firmware.
//!
//! The kernel crate holds the Hardware Interface Layer (HIL) definitions that
//! chips and capsules agree on, plus the shared utilities they use: the
//! register interface re-exports, `StaticRef`, the `debug!` macro and the
//! `ErrorCode` type.
//!
//! Most `unsafe` code is in this kernel crate.

#![warn(unreachable_pub)]
#![no_std]

// This is used to run the tests on a host
#[cfg(test)]
#[macro_use]
extern crate std;

pub mod config;
#[macro_use]
pub mod debug;
pub mod errorcode;
pub mod hil;
pub mod platform;
pub mod utilities;

pub use crate::errorcode::ErrorCode;
