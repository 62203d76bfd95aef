// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Interface for the USB DFU (Device Firmware Upgrade) class protocol.
//!
//! The USB stack forwards every DFU class request on the DFU interface to an
//! implementation of [`DfuProtocol`]. The implementation owns the DFU state
//! machine (dfuIDLE, dfuDNLOAD-SYNC, ...) and the flash it writes to; the USB
//! stack only moves bytes.
//!
//! Every entry point receives the decoded SETUP packet and the reply buffer.
//! Host-to-device requests additionally receive the data stage, exactly
//! `setup.length` bytes long. On success the implementation returns the
//! number of bytes it wrote into `reply`, which is `0` for requests without a
//! device-to-host data stage. Any error stalls the control transfer.

use core::cell::Cell;

use crate::hil::usb::SetupData;
use crate::ErrorCode;

/// `DFU_DETACH`
pub const DFU_DETACH: u8 = 0;
/// `DFU_DNLOAD`
pub const DFU_DNLOAD: u8 = 1;
/// `DFU_UPLOAD`
pub const DFU_UPLOAD: u8 = 2;
/// `DFU_GETSTATUS`
pub const DFU_GETSTATUS: u8 = 3;
/// `DFU_CLRSTATUS`
pub const DFU_CLRSTATUS: u8 = 4;
/// `DFU_GETSTATE`
pub const DFU_GETSTATE: u8 = 5;
/// `DFU_ABORT`
pub const DFU_ABORT: u8 = 6;

pub trait DfuProtocol {
    fn detach(&self, setup: &SetupData) -> Result<usize, ErrorCode>;

    /// A firmware block, `data` is the block (empty for the final,
    /// zero-length download that starts manifestation).
    fn download(&self, setup: &SetupData, data: &[Cell<u8>]) -> Result<usize, ErrorCode>;

    fn upload(&self, setup: &SetupData, reply: &[Cell<u8>]) -> Result<usize, ErrorCode>;

    /// Write the 6-byte DFU status record into `reply`.
    fn get_status(&self, setup: &SetupData, reply: &[Cell<u8>]) -> Result<usize, ErrorCode>;

    fn clear_status(&self, setup: &SetupData) -> Result<usize, ErrorCode>;

    /// Write the 1-byte DFU state into `reply`.
    fn get_state(&self, setup: &SetupData, reply: &[Cell<u8>]) -> Result<usize, ErrorCode>;

    fn abort(&self, setup: &SetupData) -> Result<usize, ErrorCode>;

    /// Whether the protocol wants the device reset once the current control
    /// transfer has been acknowledged, for example after manifestation.
    fn reset_requested(&self) -> bool;
}
