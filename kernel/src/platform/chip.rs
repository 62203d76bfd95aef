// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Interfaces for implementing microcontrollers in Tock.

/// Interface for handling interrupts on a hardware chip.
///
/// Each chip crate implements this for the set of peripherals it owns, so the
/// trap handler can hand a pending interrupt number to the driver that
/// registered for it.
pub trait InterruptService {
    /// Service an interrupt, if supported by this chip. If this interrupt
    /// number is not supported, return false.
    ///
    /// # Safety
    ///
    /// Must be called from the interrupt context the peripheral's state is
    /// owned by, never concurrently with itself.
    unsafe fn service_interrupt(&self, interrupt: u32) -> bool;
}
