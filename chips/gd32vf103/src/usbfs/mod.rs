// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! USBFS full-speed device controller.
//!
//! Only endpoint 0 is used. The driver runs the control-transfer state
//! machine for it: it drains the shared receive FIFO, hands each SETUP
//! packet to its [`Client`](hil::usb::Client), and moves the data stage in
//! and out in 64-byte packets. Everything is driven from
//! [`Usbfs::handle_interrupt`]; nothing here blocks except the bounded polls
//! during initialization and FIFO flushes.
//!
//! Control transfers go through these stages:
//!
//! ```text
//!  SETUP ──> dispatch ──> data IN  ──> status OUT ──┐
//!                    ├──> data OUT ──> status IN  ──┤
//!                    └──> status IN ────────────────┴──> wait for SETUP
//! ```
//!
//! A SETUP packet always restarts the machine, whatever stage it was in.

use core::cell::Cell;

use kernel::config::CONFIG;
use kernel::debug;
use kernel::hil;
use kernel::hil::time::Delay;
use kernel::hil::usb::{CtrlSetupResult, SetupData, CTRL_MAX_PACKET_SIZE};
use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::ErrorCode;

#[cfg(test)]
mod fake;
pub mod registers;

pub use self::registers::{UsbfsHardware, UsbfsRegisters, N_ENDPOINTS, USBFS_BASE};
use self::registers::{
    DAEPINT, DCFG, DCTL, DEPCTL, DIEPINTF, DIEPLEN, DOEPINTF, DOEPLEN, DSTAT, GAHBCS, GCCFG,
    GINTF, GRFLEN, GRSTAT, GRSTCTL, GUSBCS, TFLEN,
};

/// Receive FIFO size in bytes. It is shared by all OUT endpoints.
pub const RX_FIFO_SIZE: usize = 512;

/// Transmit FIFO sizes in bytes, one per IN endpoint.
pub const TX_FIFO_SIZES: [usize; N_ENDPOINTS] = [128, 0, 0, 0];

/// Upper bound on the iterations of a register poll, one microsecond apart.
const POLL_LIMIT: u32 = 10_000;

/// What the caller of [`Usbfs::handle_interrupt`] must do next.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Continue,
    /// The client asked for a reset and the host has acknowledged the
    /// transfer that asked for it.
    SystemReset,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Ep0State {
    /// Waiting for a SETUP packet, or for the status stage of a transfer
    /// without pending data.
    Idle,

    /// Sending a response. `offset` is where the next packet starts in the
    /// transmit buffer and `last` is the length of the packet in flight.
    /// `short` is set when the response is shorter than `wLength`, so the
    /// host needs a short packet to see where it ends.
    DataIn {
        offset: usize,
        remaining: usize,
        last: usize,
        short: bool,
    },

    /// Receiving `length` bytes from the host, `remaining` of which have not
    /// arrived yet.
    DataOut { length: usize, remaining: usize },
}

fn words(bytes: usize) -> usize {
    bytes.div_ceil(4)
}

pub struct Usbfs<'a, H: UsbfsHardware> {
    registers: H,
    delay: &'a dyn Delay,
    client: Cell<Option<&'a dyn hil::usb::Client<'a>>>,
    setup: Cell<[u8; 8]>,
    ep0: Cell<Ep0State>,
    rx_cursor: Cell<usize>,
    rx_buffer: &'a [Cell<u8>],
    tx_buffer: &'a [Cell<u8>],
}

impl<'a, H: UsbfsHardware> Usbfs<'a, H> {
    /// `rx_buffer` holds the data stage of host-to-device requests and
    /// bounds the largest one accepted. `tx_buffer` is where the client
    /// writes its responses.
    pub const fn new(
        registers: H,
        delay: &'a dyn Delay,
        rx_buffer: &'a [Cell<u8>],
        tx_buffer: &'a [Cell<u8>],
    ) -> Self {
        Usbfs {
            registers,
            delay,
            client: Cell::new(None),
            setup: Cell::new([0; 8]),
            ep0: Cell::new(Ep0State::Idle),
            rx_cursor: Cell::new(0),
            rx_buffer,
            tx_buffer,
        }
    }

    /// Bring the core up in device mode and connect to the bus.
    ///
    /// The USBFS clock must already be running. The ECLIC line is left to the
    /// caller, and must be configured before this is called since the last
    /// steps unmask the core's interrupt.
    pub fn enable(&self) -> Result<(), ErrorCode> {
        let regs = &self.registers;

        regs.gahbcs().set(0);
        regs.gccfg().write(GCCFG::VBUSIG::SET);

        debug!("USBFS: core reset");
        regs.grstctl().write(GRSTCTL::CSRST::SET);
        self.poll_until("core reset", || !regs.grstctl().is_set(GRSTCTL::CSRST))?;
        self.delay.delay_us(3);

        debug!("USBFS: forcing device mode");
        regs.gusbcs().modify(GUSBCS::FDM::SET);
        self.poll_until("device mode", || !regs.gintf().is_set(GINTF::COPM))?;
        self.delay.delay_us(25_000);

        regs.dcfg().write(DCFG::EOPFT::Percent80 + DCFG::DS::FullSpeed);
        regs.dctl().write(DCTL::SD::SET);
        regs.gccfg()
            .write(GCCFG::VBUSIG::SET + GCCFG::VBUSBCEN::SET + GCCFG::PWRON::SET);

        self.allocate_fifos();
        self.flush_tx_fifos()?;
        self.flush_rx_fifo()?;

        regs.diepinten().set(0);
        regs.doepinten().set(0);
        regs.daepinten().set(0);
        self.reset_endpoints();

        regs.gintf().write(
            GINTF::WKUPIF::SET
                + GINTF::SESIF::SET
                + GINTF::DISCIF::SET
                + GINTF::IDPSC::SET
                + GINTF::ISOONCIF::SET
                + GINTF::ISOINCIF::SET
                + GINTF::EOPFIF::SET
                + GINTF::ISOOPDIF::SET
                + GINTF::ENUMF::SET
                + GINTF::RST::SET
                + GINTF::SP::SET
                + GINTF::ESP::SET
                + GINTF::SOF::SET
                + GINTF::MFIF::SET,
        );
        regs.ginten().write(
            GINTF::WKUPIF::SET
                + GINTF::OEPIF::SET
                + GINTF::IEPIF::SET
                + GINTF::ENUMF::SET
                + GINTF::RST::SET
                + GINTF::RXFNEIF::SET
                + GINTF::SP::SET,
        );
        regs.gahbcs().modify(GAHBCS::GINTEN::SET);

        debug!("USBFS: connecting");
        regs.dctl().modify(DCTL::SD::CLEAR);
        Ok(())
    }

    /// Service the USBFS interrupt.
    pub fn handle_interrupt(&self) -> Action {
        let regs = &self.registers;

        let mut flags = regs.gintf().extract();
        while flags.is_set(GINTF::RXFNEIF) {
            self.receive_packet();
            flags = regs.gintf().extract();
        }

        if flags.is_set(GINTF::OEPIF) || flags.is_set(GINTF::IEPIF) {
            if self.handle_endpoints() == Action::SystemReset {
                return Action::SystemReset;
            }
        }

        if flags.is_set(GINTF::SP) {
            regs.gintf().write(GINTF::SP::SET);
            debug!("USBFS: suspend");
            return Action::Continue;
        }

        if flags.is_set(GINTF::WKUPIF) {
            regs.gintf().write(GINTF::WKUPIF::SET);
            debug!("USBFS: wakeup");
        }

        if flags.is_set(GINTF::RST) {
            regs.gintf().write(GINTF::RST::SET);
            self.bus_reset();
        }

        if flags.is_set(GINTF::ENUMF) {
            regs.gintf().write(GINTF::ENUMF::SET);
            self.enumeration_done();
        }

        Action::Continue
    }

    /// Pop one entry of the receive FIFO and its payload.
    fn receive_packet(&self) {
        let regs = &self.registers;
        let status = regs.pop_receive_status();
        let endpoint = status.read(GRSTAT::EPNUM);
        let mut len = status.read(GRSTAT::BCOUNT) as usize;

        if endpoint != 0 {
            debug!("USBFS: dropping {} bytes for endpoint {}", len, endpoint);
            self.discard_words(words(len));
            return;
        }
        if len == 0 {
            return;
        }

        match status.read_as_enum(GRSTAT::RPCKST) {
            Some(GRSTAT::RPCKST::Value::SetupData) => {
                while len > 8 {
                    regs.read_fifo();
                    len -= 4;
                }
                if len < 8 {
                    debug!("USBFS: short SETUP packet ({} bytes)", len);
                    self.discard_words(words(len));
                    return;
                }
                let mut setup = [0; 8];
                setup[..4].copy_from_slice(&regs.read_fifo().to_le_bytes());
                setup[4..].copy_from_slice(&regs.read_fifo().to_le_bytes());
                self.setup.set(setup);
                self.ep0.set(Ep0State::Idle);
                self.rx_cursor.set(0);
            }
            Some(GRSTAT::RPCKST::Value::OutData) => {
                let mut cursor = self.rx_cursor.get();
                while len > 0 {
                    let word = regs.read_fifo().to_le_bytes();
                    let n = len.min(4);
                    for &byte in &word[..n] {
                        if let Some(slot) = self.rx_buffer.get(cursor) {
                            slot.set(byte);
                            cursor += 1;
                        }
                    }
                    len -= n;
                }
                self.rx_cursor.set(cursor);
            }
            _ => self.discard_words(words(len)),
        }
    }

    fn discard_words(&self, count: usize) {
        for _ in 0..count {
            self.registers.read_fifo();
        }
    }

    fn handle_endpoints(&self) -> Action {
        let pending = self.registers.daepint();
        if pending.is_set(DAEPINT::IEP0) || pending.is_set(DAEPINT::OEP0) {
            self.handle_ep0()
        } else {
            Action::Continue
        }
    }

    fn handle_ep0(&self) -> Action {
        let regs = &self.registers;

        let in_flags = regs.diep_intf(0).extract();
        let out_flags = regs.doep_intf(0).extract();
        regs.diep_intf(0).set(in_flags.get());
        regs.doep_intf(0).set(out_flags.get());

        if out_flags.is_set(DOEPINTF::STPF) {
            self.handle_setup();
            return Action::Continue;
        }

        match self.ep0.get() {
            Ep0State::Idle => {
                let reboot = self
                    .client
                    .get()
                    .is_some_and(|client| client.reboot_on_ack());
                if reboot {
                    debug!("USBFS: rebooting");
                    return Action::SystemReset;
                }
            }
            Ep0State::DataIn {
                offset,
                remaining,
                last,
                short,
            } => {
                if in_flags.is_set(DIEPINTF::TF) {
                    if remaining > 0 {
                        self.transmit_in(offset, remaining, short);
                    } else if short && last == CTRL_MAX_PACKET_SIZE {
                        self.arm_in(&[]);
                        self.ep0.set(Ep0State::DataIn {
                            offset,
                            remaining: 0,
                            last: 0,
                            short,
                        });
                    } else {
                        self.ep0.set(Ep0State::Idle);
                    }
                } else if out_flags.is_set(DOEPINTF::TF) {
                    // The host moved on to the status stage.
                    self.ep0.set(Ep0State::Idle);
                }
            }
            Ep0State::DataOut { length, remaining } => {
                if out_flags.is_set(DOEPINTF::TF) {
                    let residual = regs.doep_len(0).read(DOEPLEN::TLEN) as usize;
                    let received = CTRL_MAX_PACKET_SIZE.saturating_sub(residual);
                    if remaining > received {
                        self.ep0.set(Ep0State::DataOut {
                            length,
                            remaining: remaining - received,
                        });
                        self.arm_out();
                    } else {
                        self.ep0.set(Ep0State::Idle);
                        self.complete_out(length);
                    }
                }
            }
        }
        Action::Continue
    }

    fn handle_setup(&self) {
        let setup = SetupData::from_bytes(&self.setup.get());
        let length = usize::from(setup.length);
        self.ep0.set(Ep0State::Idle);
        self.rx_cursor.set(0);

        if CONFIG.trace_setup {
            debug!(
                "SETUP {:?} request {:#04x} value {:#06x} index {:#06x} length {}",
                setup.request_type, setup.request_code, setup.value, setup.index, setup.length
            );
        }

        if setup.is_device_to_host() {
            if let Some(len) = self.dispatch(&setup, &[]) {
                let len = len.min(length).min(self.tx_buffer.len());
                self.transmit_in(0, len, len < length);
                self.arm_out();
                return;
            }
        } else if length == 0 {
            if self.dispatch(&setup, &[]).is_some() {
                self.arm_in(&[]);
                self.arm_setup();
                return;
            }
        } else if length <= self.rx_buffer.len() {
            self.ep0.set(Ep0State::DataOut {
                length,
                remaining: length,
            });
            self.arm_out();
            return;
        } else {
            debug!(
                "USBFS: {} byte data stage does not fit in {} bytes",
                length,
                self.rx_buffer.len()
            );
        }

        self.stall_in();
        self.arm_setup();
    }

    /// The data stage of a host-to-device request has fully arrived.
    fn complete_out(&self, length: usize) {
        let setup = SetupData::from_bytes(&self.setup.get());
        if self.dispatch(&setup, &self.rx_buffer[..length]).is_some() {
            self.arm_in(&[]);
        } else {
            self.stall_in();
        }
        self.arm_setup();
    }

    fn dispatch(&self, setup: &SetupData, data: &[Cell<u8>]) -> Option<usize> {
        let client = self.client.get()?;
        match client.ctrl_request(setup, data, self.tx_buffer) {
            CtrlSetupResult::Ok(len) => Some(len),
            err => {
                debug!("USBFS: request {:#06x} declined: {:?}", setup.request(), err);
                None
            }
        }
    }

    /// Send the next packet of a response, `remaining` bytes of which start
    /// at `offset` in the transmit buffer.
    fn transmit_in(&self, offset: usize, remaining: usize, short: bool) {
        let len = remaining.min(CTRL_MAX_PACKET_SIZE);
        self.arm_in(&self.tx_buffer[offset..offset + len]);
        self.ep0.set(Ep0State::DataIn {
            offset: offset + len,
            remaining: remaining - len,
            last: len,
            short,
        });
    }

    fn arm_in(&self, packet: &[Cell<u8>]) {
        let regs = &self.registers;
        regs.diep_len(0)
            .write(DIEPLEN::PCNT.val(1) + DIEPLEN::TLEN.val(packet.len() as u32));
        regs.diep_ctl(0)
            .modify(DEPCTL::EPEN::SET + DEPCTL::CNAK::SET);
        for chunk in packet.chunks(4) {
            let mut word = [0; 4];
            for (byte, cell) in word.iter_mut().zip(chunk) {
                *byte = cell.get();
            }
            regs.write_fifo(0, u32::from_le_bytes(word));
        }
    }

    fn arm_out(&self) {
        let regs = &self.registers;
        regs.doep_len(0).write(
            DOEPLEN::STPCNT.val(3)
                + DOEPLEN::PCNT.val(1)
                + DOEPLEN::TLEN.val(CTRL_MAX_PACKET_SIZE as u32),
        );
        regs.doep_ctl(0)
            .modify(DEPCTL::EPEN::SET + DEPCTL::CNAK::SET);
    }

    /// Accept only SETUP packets on endpoint 0.
    fn arm_setup(&self) {
        let regs = &self.registers;
        regs.doep_len(0)
            .write(DOEPLEN::STPCNT.val(3) + DOEPLEN::PCNT.val(0) + DOEPLEN::TLEN.val(0));
        regs.doep_ctl(0)
            .modify(DEPCTL::EPEN::SET + DEPCTL::STALL::SET);
    }

    fn stall_in(&self) {
        self.registers.diep_ctl(0).modify(DEPCTL::STALL::SET);
    }

    fn bus_reset(&self) {
        debug!("USBFS: bus reset");
        let regs = &self.registers;

        // poll_until already logged a timeout.
        let _ = self.flush_tx_fifos();
        self.reset_endpoints();
        regs.dcfg().modify(DCFG::DAR.val(0));

        regs.daepinten()
            .write(DAEPINT::IEP0::SET + DAEPINT::OEP0::SET);
        regs.doepinten()
            .write(DOEPINTF::STPF::SET + DOEPINTF::TF::SET);
        regs.diepinten().write(DIEPINTF::TF::SET);

        self.ep0.set(Ep0State::Idle);
        self.rx_cursor.set(0);
        if let Some(client) = self.client.get() {
            client.bus_reset();
        }
    }

    fn enumeration_done(&self) {
        let regs = &self.registers;
        regs.dctl().modify(DCTL::CGINAK::SET);
        if regs.dstat().matches_all(DSTAT::ES::FullSpeed) {
            debug!("USBFS: enumerated at full speed");
            self.arm_setup();
        } else {
            debug!("USBFS: unsupported enumeration speed, staying unconfigured");
        }
    }

    fn reset_endpoints(&self) {
        let regs = &self.registers;

        regs.diep_ctl(0).write(
            DEPCTL::STALL::SET + DEPCTL::EPTYPE::Control + DEPCTL::MPL::Bytes64,
        );
        regs.doep_ctl(0).write(
            DEPCTL::STALL::SET + DEPCTL::EPTYPE::Control + DEPCTL::MPL::Bytes64,
        );
        for ep in 1..N_ENDPOINTS {
            regs.diep_ctl(ep).write(DEPCTL::SNAK::SET);
            regs.diep_len(ep).set(0);
            regs.doep_ctl(ep).write(DEPCTL::SNAK::SET);
            regs.doep_len(ep).set(0);
        }
        for ep in 0..N_ENDPOINTS {
            regs.diep_intf(ep).write(
                DIEPINTF::IEPNE::SET
                    + DIEPINTF::EPTXFUD::SET
                    + DIEPINTF::CITO::SET
                    + DIEPINTF::EPDIS::SET
                    + DIEPINTF::TF::SET,
            );
            regs.doep_intf(ep).write(
                DOEPINTF::BTBSTP::SET
                    + DOEPINTF::EPRXFOVR::SET
                    + DOEPINTF::STPF::SET
                    + DOEPINTF::EPDIS::SET
                    + DOEPINTF::TF::SET,
            );
        }
    }

    /// Carve the FIFO RAM into the receive FIFO followed by one transmit
    /// FIFO per IN endpoint.
    fn allocate_fifos(&self) {
        let regs = &self.registers;
        let mut start = words(RX_FIFO_SIZE);
        regs.grflen().write(GRFLEN::RXFD.val(start as u32));
        for (fifo, &size) in TX_FIFO_SIZES.iter().enumerate() {
            let depth = words(size);
            regs.tx_fifo_length(fifo)
                .write(TFLEN::START.val(start as u32) + TFLEN::DEPTH.val(depth as u32));
            start += depth;
        }
    }

    fn flush_tx_fifos(&self) -> Result<(), ErrorCode> {
        let regs = &self.registers;
        regs.grstctl()
            .modify(GRSTCTL::TXFNUM::AllTx + GRSTCTL::TXFF::SET);
        self.poll_until("TX FIFO flush", || !regs.grstctl().is_set(GRSTCTL::TXFF))?;
        self.delay.delay_us(3);
        Ok(())
    }

    fn flush_rx_fifo(&self) -> Result<(), ErrorCode> {
        let regs = &self.registers;
        regs.grstctl().modify(GRSTCTL::RXFF::SET);
        self.poll_until("RX FIFO flush", || !regs.grstctl().is_set(GRSTCTL::RXFF))?;
        self.delay.delay_us(3);
        Ok(())
    }

    fn poll_until<F: Fn() -> bool>(&self, what: &str, ready: F) -> Result<(), ErrorCode> {
        for _ in 0..POLL_LIMIT {
            if ready() {
                return Ok(());
            }
            self.delay.delay_us(1);
        }
        debug!("USBFS: timed out waiting for {}", what);
        Err(ErrorCode::BUSY)
    }
}

impl<'a, H: UsbfsHardware> hil::usb::UsbController<'a> for Usbfs<'a, H> {
    fn set_client(&self, client: &'a dyn hil::usb::Client<'a>) {
        self.client.set(Some(client));
    }

    fn attach(&self) {
        self.registers.dctl().modify(DCTL::SD::CLEAR);
    }

    fn detach(&self) {
        self.registers.dctl().modify(DCTL::SD::SET);
    }

    fn set_address(&self, addr: u16) {
        self.registers
            .dcfg()
            .modify(DCFG::DAR.val(u32::from(addr)));
    }
}
