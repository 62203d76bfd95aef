// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Forwards DFU class requests to a `DfuProtocol` implementation.

use core::cell::Cell;

use kernel::hil::usb::SetupData;
use kernel::hil::usb_dfu::DfuProtocol;
use kernel::ErrorCode;

/// Largest block accepted per DFU_DNLOAD, and therefore the size of the
/// controller's receive buffer.
pub const DFU_TRANSFER_SIZE: usize = 1024;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DfuRequest {
    Detach,
    Download,
    Upload,
    GetStatus,
    ClearStatus,
    GetState,
    Abort,
}

pub struct DfuClassBridge<'a> {
    protocol: &'a dyn DfuProtocol,
}

impl<'a> DfuClassBridge<'a> {
    pub fn new(protocol: &'a dyn DfuProtocol) -> Self {
        DfuClassBridge { protocol }
    }

    /// Hand `request` to the protocol. `data` is the received data stage of a
    /// host-to-device request, `reply` receives the device-to-host data stage.
    pub fn forward(
        &self,
        request: DfuRequest,
        setup: &SetupData,
        data: &[Cell<u8>],
        reply: &[Cell<u8>],
    ) -> Result<usize, ErrorCode> {
        match request {
            DfuRequest::Detach => self.protocol.detach(setup),
            DfuRequest::Download => self.protocol.download(setup, data),
            DfuRequest::Upload => self.protocol.upload(setup, reply),
            DfuRequest::GetStatus => self.protocol.get_status(setup, reply),
            DfuRequest::ClearStatus => self.protocol.clear_status(setup),
            DfuRequest::GetState => self.protocol.get_state(setup, reply),
            DfuRequest::Abort => self.protocol.abort(setup),
        }
    }

    pub fn reset_requested(&self) -> bool {
        self.protocol.reset_requested()
    }
}
