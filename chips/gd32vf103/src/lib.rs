// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Peripheral implementations for the GigaDevice GD32VF103 MCU.

#![no_std]
#![crate_name = "gd32vf103"]
#![crate_type = "rlib"]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod chip;
pub mod dbg;
pub mod eclic;
pub mod interrupts;
pub mod mtimer;
pub mod usbfs;
