// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Hardware agnostic interfaces for time.

/// Busy-wait delays.
///
/// Drivers use this while polling hardware-ready bits during initialization
/// and reset sequences, where the datasheet specifies a settling time in
/// microseconds. It must never be used on a data path.
pub trait Delay {
    /// Spin for at least `us` microseconds.
    fn delay_us(&self, us: u32);
}
