// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Chip trait setup.

use core::cell::Cell;

use kernel::hil::reset::ResetTrigger;
use kernel::hil::time::Delay;
use kernel::platform::chip::InterruptService;
use kernel::utilities::StaticRef;
use kernel::ErrorCode;

use crate::dbg::{Dbg, DBG_BASE};
use crate::eclic::{Eclic, ECLIC_BASE};
use crate::interrupts;
use crate::usbfs::{Action, Usbfs, UsbfsRegisters, USBFS_BASE};

/// ECLIC level of the USBFS interrupt.
const USBFS_INTERRUPT_LEVEL: u8 = 4;

/// The peripherals the USB device firmware uses.
pub struct Gd32vf103DefaultPeripherals<'a> {
    pub usbfs: Usbfs<'a, StaticRef<UsbfsRegisters>>,
    pub eclic: Eclic,
    pub dbg: Dbg,
}

impl<'a> Gd32vf103DefaultPeripherals<'a> {
    pub fn new(
        delay: &'a dyn Delay,
        usb_rx_buffer: &'a [Cell<u8>],
        usb_tx_buffer: &'a [Cell<u8>],
    ) -> Self {
        Self {
            usbfs: Usbfs::new(USBFS_BASE, delay, usb_rx_buffer, usb_tx_buffer),
            eclic: Eclic::new(ECLIC_BASE),
            dbg: Dbg::new(DBG_BASE),
        }
    }

    /// Route the USBFS interrupt and bring up the controller.
    pub fn init(&self) -> Result<(), ErrorCode> {
        self.eclic
            .configure_level_triggered(interrupts::USBFS, USBFS_INTERRUPT_LEVEL);
        self.eclic.enable(interrupts::USBFS);
        self.usbfs.enable().inspect_err(|_| {
            self.eclic.disable(interrupts::USBFS);
        })
    }
}

impl InterruptService for Gd32vf103DefaultPeripherals<'_> {
    unsafe fn service_interrupt(&self, interrupt: u32) -> bool {
        match interrupt {
            interrupts::USBFS => {
                if self.usbfs.handle_interrupt() == Action::SystemReset {
                    self.dbg.reset();
                }
            }
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    struct NoDelay;

    impl Delay for NoDelay {
        fn delay_us(&self, _us: u32) {}
    }

    #[test]
    fn other_interrupts_are_not_claimed() {
        let rx: Vec<Cell<u8>> = (0..64).map(|_| Cell::new(0)).collect();
        let tx: Vec<Cell<u8>> = (0..64).map(|_| Cell::new(0)).collect();
        let peripherals = Gd32vf103DefaultPeripherals::new(&NoDelay, &rx, &tx);
        assert!(!unsafe { peripherals.service_interrupt(interrupts::USBFS + 1) });
        assert!(!unsafe { peripherals.service_interrupt(7) });
    }
}
