// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! In-memory model of the USBFS core, plus the host side of the wire.
//!
//! Plain registers are `InMemoryRegister`s. Interrupt flag registers clear
//! the bits written to them, and the summary flags (`GINTF.RXFNEIF`,
//! `GINTF.IEPIF`, `GINTF.OEPIF` and `DAEPINT`) are recomputed from the
//! receive queue and the endpoint flags whenever they are read. Self-clearing
//! `GRSTCTL` bits clear on the next delay.

use core::cell::{Cell, RefCell};
use core::marker::PhantomData;
use std::collections::VecDeque;
use std::vec::Vec;

use kernel::hil::time::Delay;
use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::utilities::registers::{
    FieldValue, InMemoryRegister, LocalRegisterCopy, RegisterLongName,
};

use super::registers::{
    UsbfsHardware, DAEPINT, DCFG, DCTL, DEPCTL, DIEPINTF, DIEPLEN, DOEPINTF, DOEPLEN, DSTAT,
    GAHBCS, GCCFG, GINTF, GRFLEN, GRSTAT, GRSTCTL, GUSBCS, N_ENDPOINTS, TFLEN,
};

/// A write-1-to-clear flag register.
pub(super) struct ClearOnWrite<R: RegisterLongName> {
    value: Cell<u32>,
    associated_register: PhantomData<R>,
}

impl<R: RegisterLongName> ClearOnWrite<R> {
    fn new() -> Self {
        ClearOnWrite {
            value: Cell::new(0),
            associated_register: PhantomData,
        }
    }

    /// Hardware side: latch `flags`.
    pub(super) fn raise(&self, flags: FieldValue<u32, R>) {
        let mut latched = LocalRegisterCopy::<u32, R>::new(self.value.get());
        latched.modify(flags);
        self.value.set(latched.get());
    }
}

impl<R: RegisterLongName> Readable for ClearOnWrite<R> {
    type T = u32;
    type R = R;

    fn get(&self) -> u32 {
        self.value.get()
    }
}

impl<R: RegisterLongName> Writeable for ClearOnWrite<R> {
    type T = u32;
    type R = R;

    fn set(&self, value: u32) {
        self.value.set(self.value.get() & !value);
    }
}

/// What the host saw when it sent a token to endpoint 0.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Handshake {
    Data(Vec<u8>),
    Ack,
    Nak,
    Stall,
}

fn register_array<R: RegisterLongName>() -> [InMemoryRegister<u32, R>; N_ENDPOINTS] {
    core::array::from_fn(|_| InMemoryRegister::new(0))
}

pub(super) struct FakeUsbfs {
    pub(super) gahbcs: InMemoryRegister<u32, GAHBCS::Register>,
    pub(super) gusbcs: InMemoryRegister<u32, GUSBCS::Register>,
    pub(super) grstctl: InMemoryRegister<u32, GRSTCTL::Register>,
    pub(super) gintf: ClearOnWrite<GINTF::Register>,
    pub(super) ginten: InMemoryRegister<u32, GINTF::Register>,
    pub(super) grflen: InMemoryRegister<u32, GRFLEN::Register>,
    pub(super) tx_fifo_length: [InMemoryRegister<u32, TFLEN::Register>; N_ENDPOINTS],
    pub(super) gccfg: InMemoryRegister<u32, GCCFG::Register>,
    pub(super) dcfg: InMemoryRegister<u32, DCFG::Register>,
    pub(super) dctl: InMemoryRegister<u32, DCTL::Register>,
    pub(super) dstat: InMemoryRegister<u32, DSTAT::Register>,
    pub(super) diepinten: InMemoryRegister<u32, DIEPINTF::Register>,
    pub(super) doepinten: InMemoryRegister<u32, DOEPINTF::Register>,
    pub(super) daepinten: InMemoryRegister<u32, DAEPINT::Register>,
    pub(super) diep_ctl: [InMemoryRegister<u32, DEPCTL::Register>; N_ENDPOINTS],
    pub(super) diep_intf: [ClearOnWrite<DIEPINTF::Register>; N_ENDPOINTS],
    pub(super) diep_len: [InMemoryRegister<u32, DIEPLEN::Register>; N_ENDPOINTS],
    pub(super) doep_ctl: [InMemoryRegister<u32, DEPCTL::Register>; N_ENDPOINTS],
    pub(super) doep_intf: [ClearOnWrite<DOEPINTF::Register>; N_ENDPOINTS],
    pub(super) doep_len: [InMemoryRegister<u32, DOEPLEN::Register>; N_ENDPOINTS],

    rx_status: RefCell<VecDeque<u32>>,
    rx_words: RefCell<VecDeque<u32>>,
    tx_words: RefCell<VecDeque<u32>>,

    /// Total time spent in `delay_us`.
    pub(super) elapsed_us: Cell<u64>,
    /// Keep self-clearing reset and flush bits set, as a wedged core would.
    pub(super) wedged: Cell<bool>,
}

impl FakeUsbfs {
    pub(super) fn new() -> Self {
        FakeUsbfs {
            gahbcs: InMemoryRegister::new(0),
            gusbcs: InMemoryRegister::new(0),
            grstctl: InMemoryRegister::new(0),
            gintf: ClearOnWrite::new(),
            ginten: InMemoryRegister::new(0),
            grflen: InMemoryRegister::new(0),
            tx_fifo_length: register_array(),
            gccfg: InMemoryRegister::new(0),
            dcfg: InMemoryRegister::new(0),
            dctl: InMemoryRegister::new(0),
            dstat: InMemoryRegister::new(0),
            diepinten: InMemoryRegister::new(0),
            doepinten: InMemoryRegister::new(0),
            daepinten: InMemoryRegister::new(0),
            diep_ctl: register_array(),
            diep_intf: core::array::from_fn(|_| ClearOnWrite::new()),
            diep_len: register_array(),
            doep_ctl: register_array(),
            doep_intf: core::array::from_fn(|_| ClearOnWrite::new()),
            doep_len: register_array(),
            rx_status: RefCell::new(VecDeque::new()),
            rx_words: RefCell::new(VecDeque::new()),
            tx_words: RefCell::new(VecDeque::new()),
            elapsed_us: Cell::new(0),
            wedged: Cell::new(false),
        }
    }

    fn refresh_gintf(&self) {
        let mut flags = LocalRegisterCopy::<u32, GINTF::Register>::new(self.gintf.get());
        let in_pending = self.diep_intf.iter().any(|intf| intf.get() != 0);
        let out_pending = self.doep_intf.iter().any(|intf| intf.get() != 0);
        flags.modify(
            GINTF::RXFNEIF.val(u32::from(!self.rx_status.borrow().is_empty()))
                + GINTF::IEPIF.val(u32::from(in_pending))
                + GINTF::OEPIF.val(u32::from(out_pending)),
        );
        self.gintf.value.set(flags.get());
    }

    /// Queue a receive FIFO entry for endpoint `ep`, followed by its payload.
    pub(super) fn push_rx(&self, ep: u32, status: FieldValue<u32, GRSTAT::Register>, data: &[u8]) {
        let entry = InMemoryRegister::<u32, GRSTAT::Register>::new(0);
        entry.write(GRSTAT::EPNUM.val(ep) + GRSTAT::BCOUNT.val(data.len() as u32) + status);
        self.rx_status.borrow_mut().push_back(entry.get());

        let mut words = self.rx_words.borrow_mut();
        for chunk in data.chunks(4) {
            let mut word = [0; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            words.push_back(u32::from_le_bytes(word));
        }
    }

    /// Words of the receive FIFO the driver has not popped.
    pub(super) fn unread_words(&self) -> usize {
        self.rx_words.borrow().len()
    }

    /// The host sends a SETUP packet whose payload is `bytes`. Anything but
    /// exactly 8 bytes models a corrupted FIFO.
    pub(super) fn host_setup_bytes(&self, bytes: &[u8]) {
        // Receiving SETUP clears a stall on the control endpoint.
        self.diep_ctl[0].modify(DEPCTL::STALL::CLEAR);
        self.doep_ctl[0].modify(DEPCTL::STALL::CLEAR + DEPCTL::EPEN::CLEAR);
        self.push_rx(0, GRSTAT::RPCKST::SetupData, bytes);
        self.push_rx(0, GRSTAT::RPCKST::SetupComplete, &[]);
        self.doep_intf[0].raise(DOEPINTF::STPF::SET);
    }

    pub(super) fn host_setup(&self, packet: [u8; 8]) {
        self.host_setup_bytes(&packet);
    }

    /// The host sends an IN token to endpoint 0.
    pub(super) fn host_in(&self) -> Handshake {
        let ctl = &self.diep_ctl[0];
        if ctl.is_set(DEPCTL::STALL) {
            return Handshake::Stall;
        }
        if !ctl.is_set(DEPCTL::EPEN) {
            return Handshake::Nak;
        }

        let len = self.diep_len[0].read(DIEPLEN::TLEN) as usize;
        let mut tx = self.tx_words.borrow_mut();
        let mut packet = Vec::new();
        while packet.len() < len {
            let word = tx.pop_front().unwrap_or(0);
            packet.extend_from_slice(&word.to_le_bytes());
        }
        packet.truncate(len);

        ctl.modify(DEPCTL::EPEN::CLEAR);
        self.diep_intf[0].raise(DIEPINTF::TF::SET);
        Handshake::Data(packet)
    }

    /// The host sends one OUT packet to endpoint 0.
    pub(super) fn host_out(&self, data: &[u8]) -> Handshake {
        assert!(data.len() <= 64);
        let ctl = &self.doep_ctl[0];
        if ctl.is_set(DEPCTL::STALL) {
            return Handshake::Stall;
        }
        if !ctl.is_set(DEPCTL::EPEN) {
            return Handshake::Nak;
        }

        self.push_rx(0, GRSTAT::RPCKST::OutData, data);
        self.push_rx(0, GRSTAT::RPCKST::OutComplete, &[]);
        let residual = (self.doep_len[0].read(DOEPLEN::TLEN) as usize).saturating_sub(data.len());
        self.doep_len[0].modify(DOEPLEN::TLEN.val(residual as u32));

        ctl.modify(DEPCTL::EPEN::CLEAR);
        self.doep_intf[0].raise(DOEPINTF::TF::SET);
        Handshake::Ack
    }

    pub(super) fn host_bus_reset(&self) {
        self.gintf.raise(GINTF::RST::SET);
    }

    pub(super) fn host_enumerated(&self, full_speed: bool) {
        if full_speed {
            self.dstat.write(DSTAT::ES::FullSpeed);
        } else {
            self.dstat.write(DSTAT::ES.val(2));
        }
        self.gintf.raise(GINTF::ENUMF::SET);
    }

    pub(super) fn host_suspend(&self) {
        self.gintf.raise(GINTF::SP::SET);
    }

    pub(super) fn host_wakeup(&self) {
        self.gintf.raise(GINTF::WKUPIF::SET);
    }
}

impl Delay for FakeUsbfs {
    fn delay_us(&self, us: u32) {
        self.elapsed_us.set(self.elapsed_us.get() + u64::from(us));
        if !self.wedged.get() {
            self.grstctl
                .modify(GRSTCTL::CSRST::CLEAR + GRSTCTL::TXFF::CLEAR + GRSTCTL::RXFF::CLEAR);
        }
    }
}

impl UsbfsHardware for &FakeUsbfs {
    type Register<N: RegisterLongName> = InMemoryRegister<u32, N>;
    type Status<N: RegisterLongName> = ClearOnWrite<N>;

    fn gahbcs(&self) -> &InMemoryRegister<u32, GAHBCS::Register> {
        &self.gahbcs
    }

    fn gusbcs(&self) -> &InMemoryRegister<u32, GUSBCS::Register> {
        &self.gusbcs
    }

    fn grstctl(&self) -> &InMemoryRegister<u32, GRSTCTL::Register> {
        &self.grstctl
    }

    fn gintf(&self) -> &ClearOnWrite<GINTF::Register> {
        self.refresh_gintf();
        &self.gintf
    }

    fn ginten(&self) -> &InMemoryRegister<u32, GINTF::Register> {
        &self.ginten
    }

    fn grflen(&self) -> &InMemoryRegister<u32, GRFLEN::Register> {
        &self.grflen
    }

    fn tx_fifo_length(&self, fifo: usize) -> &InMemoryRegister<u32, TFLEN::Register> {
        &self.tx_fifo_length[fifo]
    }

    fn gccfg(&self) -> &InMemoryRegister<u32, GCCFG::Register> {
        &self.gccfg
    }

    fn dcfg(&self) -> &InMemoryRegister<u32, DCFG::Register> {
        &self.dcfg
    }

    fn dctl(&self) -> &InMemoryRegister<u32, DCTL::Register> {
        &self.dctl
    }

    fn dstat(&self) -> LocalRegisterCopy<u32, DSTAT::Register> {
        self.dstat.extract()
    }

    fn diepinten(&self) -> &InMemoryRegister<u32, DIEPINTF::Register> {
        &self.diepinten
    }

    fn doepinten(&self) -> &InMemoryRegister<u32, DOEPINTF::Register> {
        &self.doepinten
    }

    fn daepint(&self) -> LocalRegisterCopy<u32, DAEPINT::Register> {
        let mut pending = 0;
        for ep in 0..N_ENDPOINTS {
            if self.diep_intf[ep].get() != 0 {
                pending |= 1 << ep;
            }
            if self.doep_intf[ep].get() != 0 {
                pending |= 1 << (16 + ep);
            }
        }
        LocalRegisterCopy::new(pending)
    }

    fn daepinten(&self) -> &InMemoryRegister<u32, DAEPINT::Register> {
        &self.daepinten
    }

    fn diep_ctl(&self, ep: usize) -> &InMemoryRegister<u32, DEPCTL::Register> {
        &self.diep_ctl[ep]
    }

    fn diep_intf(&self, ep: usize) -> &ClearOnWrite<DIEPINTF::Register> {
        &self.diep_intf[ep]
    }

    fn diep_len(&self, ep: usize) -> &InMemoryRegister<u32, DIEPLEN::Register> {
        &self.diep_len[ep]
    }

    fn doep_ctl(&self, ep: usize) -> &InMemoryRegister<u32, DEPCTL::Register> {
        &self.doep_ctl[ep]
    }

    fn doep_intf(&self, ep: usize) -> &ClearOnWrite<DOEPINTF::Register> {
        &self.doep_intf[ep]
    }

    fn doep_len(&self, ep: usize) -> &InMemoryRegister<u32, DOEPLEN::Register> {
        &self.doep_len[ep]
    }

    fn pop_receive_status(&self) -> LocalRegisterCopy<u32, GRSTAT::Register> {
        LocalRegisterCopy::new(self.rx_status.borrow_mut().pop_front().unwrap_or(0))
    }

    fn read_fifo(&self) -> u32 {
        self.rx_words.borrow_mut().pop_front().unwrap_or(0)
    }

    fn write_fifo(&self, fifo: usize, word: u32) {
        assert_eq!(fifo, 0);
        self.tx_words.borrow_mut().push_back(word);
    }
}
