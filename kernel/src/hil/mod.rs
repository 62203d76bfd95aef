// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Public traits for interfaces between the USB controller driver, the
//! request-handling capsules and the chip.

pub mod reset;
pub mod time;
pub mod usb;
pub mod usb_dfu;
