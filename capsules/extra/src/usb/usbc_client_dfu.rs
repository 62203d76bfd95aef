// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! USB client for a DFU-only device.
//!
//! Answers the standard requests a host issues during enumeration out of a
//! [`DescriptorCatalog`], and forwards DFU class requests to the board's
//! [`DfuProtocol`] implementation. Which handler runs is decided by the
//! request table in [`super::dispatch`].
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let usb_client = static_init!(
//!     capsules_extra::usb::usbc_client_dfu::DfuClientCtrl<'static, Usbfs<'static, StaticRef<UsbfsRegisters>>>,
//!     capsules_extra::usb::usbc_client_dfu::DfuClientCtrl::new(
//!         &peripherals.usbfs,
//!         DescriptorCatalog::dfu_bootloader(DFU_TRANSFER_SIZE as u16),
//!         dfu,
//!     )
//! );
//! peripherals.usbfs.set_client(usb_client);
//! ```

use core::cell::Cell;

use kernel::debug;
use kernel::hil;
use kernel::hil::usb::{CtrlSetupResult, SetupData};
use kernel::hil::usb_dfu::DfuProtocol;

use super::descriptors::{put_u16, DescriptorCatalog, DescriptorType};
use super::dfu::DfuClassBridge;
use super::dispatch::{self, Request};

/// Device-wide status that survives individual control transfers.
pub struct DeviceRuntimeStatus {
    /// GET_STATUS(device) word: bit 0 self powered, bit 1 remote wakeup
    status: Cell<u16>,
    /// Reset once the current status stage is acknowledged
    reboot_pending: Cell<bool>,
}

impl DeviceRuntimeStatus {
    pub const fn new() -> Self {
        DeviceRuntimeStatus {
            status: Cell::new(0),
            reboot_pending: Cell::new(false),
        }
    }
}

pub struct DfuClientCtrl<'a, C: hil::usb::UsbController<'a>> {
    controller: &'a C,
    descriptors: DescriptorCatalog<'a>,
    dfu: DfuClassBridge<'a>,
    status: DeviceRuntimeStatus,
}

impl<'a, C: hil::usb::UsbController<'a>> DfuClientCtrl<'a, C> {
    pub fn new(
        controller: &'a C,
        descriptors: DescriptorCatalog<'a>,
        dfu: &'a dyn DfuProtocol,
    ) -> Self {
        DfuClientCtrl {
            controller,
            descriptors,
            dfu: DfuClassBridge::new(dfu),
            status: DeviceRuntimeStatus::new(),
        }
    }

    fn handle_request(
        &self,
        request: Request,
        setup: &SetupData,
        data: &[Cell<u8>],
        reply: &[Cell<u8>],
    ) -> CtrlSetupResult {
        match request {
            Request::GetStatus => {
                if reply.len() < 2 {
                    return CtrlSetupResult::ErrBadLength;
                }
                put_u16(reply, self.status.status.get());
                CtrlSetupResult::Ok(2)
            }
            Request::SetAddress => {
                debug!("SET_ADDRESS: wValue = {}", setup.value);
                self.controller.set_address(setup.value);
                CtrlSetupResult::Ok(0)
            }
            Request::GetDescriptor => self.get_descriptor(setup, reply),
            Request::GetConfiguration => match reply.first() {
                Some(byte) => {
                    byte.set(self.descriptors.configuration_value());
                    CtrlSetupResult::Ok(1)
                }
                None => CtrlSetupResult::ErrBadLength,
            },
            Request::SetConfiguration => {
                if setup.value == u16::from(self.descriptors.configuration_value()) {
                    CtrlSetupResult::Ok(0)
                } else {
                    debug!("SET_CONFIGURATION: unknown configuration {}", setup.value);
                    CtrlSetupResult::ErrInvalidConfigurationIndex
                }
            }
            Request::SetInterface => {
                if setup.value == 0 {
                    CtrlSetupResult::Ok(0)
                } else {
                    debug!(
                        "SET_INTERFACE: wIndex = {}, wValue = {}",
                        setup.index, setup.value
                    );
                    CtrlSetupResult::ErrInvalidInterfaceIndex
                }
            }
            Request::ClearFeatureEndpoint => {
                debug!("CLEAR_FEATURE endpoint {}", setup.index);
                CtrlSetupResult::ErrGeneric
            }
            Request::Dfu(request) => {
                let result = self.dfu.forward(request, setup, data, reply);
                if self.dfu.reset_requested() {
                    self.status.reboot_pending.set(true);
                }
                match result {
                    Ok(len) => CtrlSetupResult::Ok(len),
                    Err(e) => {
                        debug!("DFU {:?} failed: {:?}", request, e);
                        CtrlSetupResult::ErrGeneric
                    }
                }
            }
        }
    }

    fn get_descriptor(&self, setup: &SetupData, reply: &[Cell<u8>]) -> CtrlSetupResult {
        let descriptor_type = (setup.value >> 8) as u8;
        let index = (setup.value & 0xff) as u8;

        match DescriptorType::from_u8(descriptor_type) {
            Some(DescriptorType::Device) => match index {
                0 => match self.descriptors.write_device(reply) {
                    0 => CtrlSetupResult::ErrBadLength,
                    len => CtrlSetupResult::Ok(len),
                },
                _ => {
                    debug!("GET_DESCRIPTOR: type = 0x01, but index = 0x{:02x}", index);
                    CtrlSetupResult::ErrInvalidDeviceIndex
                }
            },
            Some(DescriptorType::Configuration) => match index {
                0 => match self.descriptors.write_configuration(reply) {
                    0 => CtrlSetupResult::ErrBadLength,
                    len => CtrlSetupResult::Ok(len),
                },
                _ => {
                    debug!("GET_DESCRIPTOR: unknown configuration {}", index);
                    CtrlSetupResult::ErrInvalidConfigurationIndex
                }
            },
            Some(DescriptorType::String) => match self.descriptors.write_string(index, reply) {
                Some(0) => CtrlSetupResult::ErrBadLength,
                Some(len) => CtrlSetupResult::Ok(len),
                None => {
                    debug!("GET_DESCRIPTOR: unknown string {}", index);
                    CtrlSetupResult::ErrInvalidStringIndex
                }
            },
            Some(DescriptorType::DeviceQualifier) => {
                // We are full-speed only, so we must respond with a request
                // error
                debug!("DEVICE_QUALIFIER");
                CtrlSetupResult::ErrNoDeviceQualifier
            }
            _ => {
                debug!("GET_DESCRIPTOR: unknown type 0x{:02x}", descriptor_type);
                CtrlSetupResult::ErrUnrecognizedDescriptorType
            }
        }
    }
}

impl<'a, C: hil::usb::UsbController<'a>> hil::usb::Client<'a> for DfuClientCtrl<'a, C> {
    fn ctrl_request(
        &'a self,
        setup: &SetupData,
        data: &[Cell<u8>],
        reply: &[Cell<u8>],
    ) -> CtrlSetupResult {
        match dispatch::resolve(setup) {
            Some(request) => self.handle_request(request, setup, data, reply),
            None => {
                debug!("unknown request 0x{:04x}", setup.request());
                CtrlSetupResult::ErrUnrecognizedRequestType
            }
        }
    }

    fn reboot_on_ack(&'a self) -> bool {
        self.status.reboot_pending.replace(false)
    }
}
