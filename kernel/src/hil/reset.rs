// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Interface for resetting the whole system.

pub trait ResetTrigger {
    /// Request an unconditional system reset. Does not return.
    fn reset(&self) -> !;
}
