// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Interface to USB device controller hardware.
//!
//! A controller driver owns endpoint 0 and the control-transfer state
//! machine. Whenever a control request needs an answer it calls into its
//! [`Client`], which decides what the request means and writes any response
//! bytes into the buffer it is handed.

use core::cell::Cell;
use core::fmt;

/// Maximum packet size of endpoint 0 on a full-speed device.
pub const CTRL_MAX_PACKET_SIZE: usize = 64;

/// The data structure sent in a SETUP handshake.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SetupData {
    pub request_type: DeviceRequestType,
    pub request_code: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupData {
    /// Decode a SETUP packet as received from the wire.
    pub fn from_bytes(p: &[u8; 8]) -> Self {
        SetupData {
            request_type: DeviceRequestType(p[0]),
            request_code: p[1],
            value: u16::from_le_bytes([p[2], p[3]]),
            index: u16::from_le_bytes([p[4], p[5]]),
            length: u16::from_le_bytes([p[6], p[7]]),
        }
    }

    /// Combined request code, `bRequest` in the high byte and
    /// `bmRequestType` in the low byte.
    pub fn request(&self) -> u16 {
        (u16::from(self.request_code) << 8) | u16::from(self.request_type.0)
    }

    /// Whether the data stage, if any, flows from the device to the host.
    pub fn is_device_to_host(&self) -> bool {
        matches!(
            self.request_type.transfer_direction(),
            TransferDirection::DeviceToHost
        )
    }
}

/// The `bmRequestType` field of a SETUP packet.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct DeviceRequestType(pub u8);

impl DeviceRequestType {
    pub fn transfer_direction(self) -> TransferDirection {
        match self.0 & (1 << 7) {
            0 => TransferDirection::HostToDevice,
            _ => TransferDirection::DeviceToHost,
        }
    }

    pub fn request_type(self) -> RequestType {
        match (self.0 & (0b11 << 5)) >> 5 {
            0 => RequestType::Standard,
            1 => RequestType::Class,
            2 => RequestType::Vendor,
            _ => RequestType::Reserved,
        }
    }

    pub fn recipient(self) -> Recipient {
        match self.0 & 0b11111 {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            3 => Recipient::Other,
            _ => Recipient::Reserved,
        }
    }
}

impl fmt::Debug for DeviceRequestType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{{:?}, {:?}, {:?}}}",
            self.transfer_direction(),
            self.request_type(),
            self.recipient()
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferDirection {
    HostToDevice = 0,
    DeviceToHost = 1,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestType {
    Standard,
    Class,
    Vendor,
    Reserved,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
    Reserved,
}

/// USB controller interface
pub trait UsbController<'a> {
    fn set_client(&self, client: &'a dyn Client<'a>);

    /// Signal a connection to the host (soft connect).
    fn attach(&self);

    /// Remove the device from the bus (soft disconnect).
    fn detach(&self);

    /// Program the address assigned by the host with SET_ADDRESS.
    fn set_address(&self, addr: u16);
}

/// USB controller client interface
pub trait Client<'a> {
    /// Handle a control request.
    ///
    /// Device-to-host requests and requests without a data stage are
    /// delivered once, as soon as the SETUP packet arrives, with an empty
    /// `data`. Host-to-device requests with a data stage are delivered once
    /// the whole payload has been received, with `data` holding exactly
    /// `setup.length` bytes.
    ///
    /// Response bytes go into `reply`; `Ok(n)` reports how many were written.
    /// The controller never sends more than `setup.length` bytes.
    fn ctrl_request(
        &'a self,
        setup: &SetupData,
        data: &[Cell<u8>],
        reply: &[Cell<u8>],
    ) -> CtrlSetupResult;

    /// Whether the device must be reset once the current status stage has
    /// been acknowledged.
    fn reboot_on_ack(&'a self) -> bool {
        false
    }

    /// The host reset the bus.
    fn bus_reset(&'a self) {}
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CtrlSetupResult {
    /// The request was handled; the response is this many bytes long
    Ok(usize),

    // The request cannot be handled; abort this transfer with STALL
    ErrBadLength,
    ErrUnrecognizedDescriptorType,
    ErrUnrecognizedRequestType,
    ErrNoDeviceQualifier,
    ErrInvalidDeviceIndex,
    ErrInvalidConfigurationIndex,
    ErrInvalidInterfaceIndex,
    ErrInvalidStringIndex,

    ErrGeneric,
}
