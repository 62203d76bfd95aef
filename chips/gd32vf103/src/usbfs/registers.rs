// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! USBFS register map and the accessor trait the driver is written against.
//!
//! Only the registers used in device mode are named. The interrupt flag
//! registers (`GINTF`, `DIEPxINTF`, `DOEPxINTF`) are write-1-to-clear, so they
//! are only ever read, or written with the bits to acknowledge. Never call
//! `modify()` on them.

use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, register_structs, LocalRegisterCopy, ReadOnly, ReadWrite,
    RegisterLongName,
};
use kernel::utilities::StaticRef;

/// Number of bidirectional endpoints implemented by the core.
pub const N_ENDPOINTS: usize = 4;

pub const USBFS_BASE: StaticRef<UsbfsRegisters> =
    unsafe { StaticRef::new(0x5000_0000 as *const UsbfsRegisters) };

register_structs! {
    pub InEndpointRegisters {
        (0x00 => ctl: ReadWrite<u32, DEPCTL::Register>),
        (0x04 => _reserved0),
        (0x08 => intf: ReadWrite<u32, DIEPINTF::Register>),
        (0x0C => _reserved1),
        (0x10 => len: ReadWrite<u32, DIEPLEN::Register>),
        (0x14 => _reserved2),
        (0x20 => @END),
    },

    pub OutEndpointRegisters {
        (0x00 => ctl: ReadWrite<u32, DEPCTL::Register>),
        (0x04 => _reserved0),
        (0x08 => intf: ReadWrite<u32, DOEPINTF::Register>),
        (0x0C => _reserved1),
        (0x10 => len: ReadWrite<u32, DOEPLEN::Register>),
        (0x14 => _reserved2),
        (0x20 => @END),
    },

    /// Push/pop window of one data FIFO. Every word access inside the
    /// window reaches the same FIFO.
    pub FifoPort {
        (0x0000 => data: ReadWrite<u32>),
        (0x0004 => _reserved),
        (0x1000 => @END),
    },

    pub UsbfsRegisters {
        (0x000 => _reserved0),
        (0x008 => gahbcs: ReadWrite<u32, GAHBCS::Register>),
        (0x00C => gusbcs: ReadWrite<u32, GUSBCS::Register>),
        (0x010 => grstctl: ReadWrite<u32, GRSTCTL::Register>),
        (0x014 => gintf: ReadWrite<u32, GINTF::Register>),
        (0x018 => ginten: ReadWrite<u32, GINTF::Register>),
        (0x01C => _reserved1),
        /// Reading pops the receive FIFO status queue.
        (0x020 => grstatp: ReadOnly<u32, GRSTAT::Register>),
        (0x024 => grflen: ReadWrite<u32, GRFLEN::Register>),
        (0x028 => diep0tflen: ReadWrite<u32, TFLEN::Register>),
        (0x02C => _reserved2),
        (0x038 => gccfg: ReadWrite<u32, GCCFG::Register>),
        (0x03C => _reserved3),
        (0x104 => dieptflen: [ReadWrite<u32, TFLEN::Register>; N_ENDPOINTS - 1]),
        (0x110 => _reserved4),
        (0x800 => dcfg: ReadWrite<u32, DCFG::Register>),
        (0x804 => dctl: ReadWrite<u32, DCTL::Register>),
        (0x808 => dstat: ReadOnly<u32, DSTAT::Register>),
        (0x80C => _reserved5),
        (0x810 => diepinten: ReadWrite<u32, DIEPINTF::Register>),
        (0x814 => doepinten: ReadWrite<u32, DOEPINTF::Register>),
        (0x818 => daepint: ReadOnly<u32, DAEPINT::Register>),
        (0x81C => daepinten: ReadWrite<u32, DAEPINT::Register>),
        (0x820 => _reserved6),
        (0x900 => diep: [InEndpointRegisters; N_ENDPOINTS]),
        (0x980 => _reserved7),
        (0xB00 => doep: [OutEndpointRegisters; N_ENDPOINTS]),
        (0xB80 => _reserved8),
        (0x1000 => dfifo: [FifoPort; N_ENDPOINTS]),
        (0x5000 => @END),
    }
}

register_bitfields![u32,
    pub GAHBCS [
        GINTEN OFFSET(0) NUMBITS(1) []
    ],
    pub GUSBCS [
        FHM OFFSET(29) NUMBITS(1) [],
        FDM OFFSET(30) NUMBITS(1) []
    ],
    pub GRSTCTL [
        CSRST OFFSET(0) NUMBITS(1) [],
        RXFF OFFSET(4) NUMBITS(1) [],
        TXFF OFFSET(5) NUMBITS(1) [],
        TXFNUM OFFSET(6) NUMBITS(5) [
            AllTx = 0x10
        ]
    ],
    /// Global interrupt flags; the same layout is used by `GINTEN`.
    pub GINTF [
        COPM OFFSET(0) NUMBITS(1) [],
        MFIF OFFSET(1) NUMBITS(1) [],
        SOF OFFSET(3) NUMBITS(1) [],
        RXFNEIF OFFSET(4) NUMBITS(1) [],
        ESP OFFSET(10) NUMBITS(1) [],
        SP OFFSET(11) NUMBITS(1) [],
        RST OFFSET(12) NUMBITS(1) [],
        ENUMF OFFSET(13) NUMBITS(1) [],
        ISOOPDIF OFFSET(14) NUMBITS(1) [],
        EOPFIF OFFSET(15) NUMBITS(1) [],
        IEPIF OFFSET(18) NUMBITS(1) [],
        OEPIF OFFSET(19) NUMBITS(1) [],
        ISOINCIF OFFSET(20) NUMBITS(1) [],
        ISOONCIF OFFSET(21) NUMBITS(1) [],
        IDPSC OFFSET(28) NUMBITS(1) [],
        DISCIF OFFSET(29) NUMBITS(1) [],
        SESIF OFFSET(30) NUMBITS(1) [],
        WKUPIF OFFSET(31) NUMBITS(1) []
    ],
    pub GRSTAT [
        EPNUM OFFSET(0) NUMBITS(4) [],
        BCOUNT OFFSET(4) NUMBITS(11) [],
        DPID OFFSET(15) NUMBITS(2) [],
        RPCKST OFFSET(17) NUMBITS(4) [
            GlobalOutNak = 1,
            OutData = 2,
            OutComplete = 3,
            SetupComplete = 4,
            SetupData = 6
        ]
    ],
    pub GRFLEN [
        RXFD OFFSET(0) NUMBITS(16) []
    ],
    /// Transmit FIFO start address and depth, both in 32-bit words.
    pub TFLEN [
        START OFFSET(0) NUMBITS(16) [],
        DEPTH OFFSET(16) NUMBITS(16) []
    ],
    pub GCCFG [
        PWRON OFFSET(16) NUMBITS(1) [],
        VBUSACEN OFFSET(18) NUMBITS(1) [],
        VBUSBCEN OFFSET(19) NUMBITS(1) [],
        SOFOEN OFFSET(20) NUMBITS(1) [],
        VBUSIG OFFSET(21) NUMBITS(1) []
    ],
    pub DCFG [
        DS OFFSET(0) NUMBITS(2) [
            FullSpeed = 3
        ],
        DAR OFFSET(4) NUMBITS(7) [],
        EOPFT OFFSET(11) NUMBITS(2) [
            Percent80 = 0,
            Percent85 = 1,
            Percent90 = 2,
            Percent95 = 3
        ]
    ],
    pub DCTL [
        RWKUP OFFSET(0) NUMBITS(1) [],
        SD OFFSET(1) NUMBITS(1) [],
        SGINAK OFFSET(7) NUMBITS(1) [],
        CGINAK OFFSET(8) NUMBITS(1) [],
        CGONAK OFFSET(10) NUMBITS(1) []
    ],
    pub DSTAT [
        SPST OFFSET(0) NUMBITS(1) [],
        ES OFFSET(1) NUMBITS(2) [
            FullSpeed = 3
        ]
    ],
    /// IN endpoint interrupt flags; also the layout of `DIEPINTEN`.
    pub DIEPINTF [
        TF OFFSET(0) NUMBITS(1) [],
        EPDIS OFFSET(1) NUMBITS(1) [],
        CITO OFFSET(3) NUMBITS(1) [],
        EPTXFUD OFFSET(4) NUMBITS(1) [],
        IEPNE OFFSET(6) NUMBITS(1) [],
        TXFE OFFSET(7) NUMBITS(1) []
    ],
    /// OUT endpoint interrupt flags; also the layout of `DOEPINTEN`.
    pub DOEPINTF [
        TF OFFSET(0) NUMBITS(1) [],
        EPDIS OFFSET(1) NUMBITS(1) [],
        STPF OFFSET(3) NUMBITS(1) [],
        EPRXFOVR OFFSET(4) NUMBITS(1) [],
        BTBSTP OFFSET(6) NUMBITS(1) []
    ],
    pub DAEPINT [
        IEPITB OFFSET(0) NUMBITS(4) [],
        OEPITB OFFSET(16) NUMBITS(4) [],
        IEP0 OFFSET(0) NUMBITS(1) [],
        OEP0 OFFSET(16) NUMBITS(1) []
    ],
    pub DEPCTL [
        MPL OFFSET(0) NUMBITS(2) [
            Bytes64 = 0,
            Bytes32 = 1,
            Bytes16 = 2,
            Bytes8 = 3
        ],
        EPACT OFFSET(15) NUMBITS(1) [],
        NAKS OFFSET(17) NUMBITS(1) [],
        EPTYPE OFFSET(18) NUMBITS(2) [
            Control = 0
        ],
        SNOOP OFFSET(20) NUMBITS(1) [],
        STALL OFFSET(21) NUMBITS(1) [],
        TXFNUM OFFSET(22) NUMBITS(4) [],
        CNAK OFFSET(26) NUMBITS(1) [],
        SNAK OFFSET(27) NUMBITS(1) [],
        EPD OFFSET(30) NUMBITS(1) [],
        EPEN OFFSET(31) NUMBITS(1) []
    ],
    /// Endpoint 0 IN transfer length.
    pub DIEPLEN [
        TLEN OFFSET(0) NUMBITS(7) [],
        PCNT OFFSET(19) NUMBITS(2) []
    ],
    /// Endpoint 0 OUT transfer length. `TLEN` counts down as data arrives.
    pub DOEPLEN [
        TLEN OFFSET(0) NUMBITS(7) [],
        PCNT OFFSET(19) NUMBITS(1) [],
        STPCNT OFFSET(29) NUMBITS(2) []
    ]
];

/// Register-level access to a USBFS core.
///
/// The driver only talks to the hardware through this trait, which lets the
/// whole control pipe be driven against an in-memory model of the core.
pub trait UsbfsHardware {
    type Register<N: RegisterLongName>: Readable<T = u32, R = N> + Writeable<T = u32, R = N>;
    /// A write-1-to-clear flag register.
    type Status<N: RegisterLongName>: Readable<T = u32, R = N> + Writeable<T = u32, R = N>;

    fn gahbcs(&self) -> &Self::Register<GAHBCS::Register>;
    fn gusbcs(&self) -> &Self::Register<GUSBCS::Register>;
    fn grstctl(&self) -> &Self::Register<GRSTCTL::Register>;
    fn gintf(&self) -> &Self::Status<GINTF::Register>;
    fn ginten(&self) -> &Self::Register<GINTF::Register>;
    fn grflen(&self) -> &Self::Register<GRFLEN::Register>;
    /// Size register of transmit FIFO `fifo`.
    fn tx_fifo_length(&self, fifo: usize) -> &Self::Register<TFLEN::Register>;
    fn gccfg(&self) -> &Self::Register<GCCFG::Register>;

    fn dcfg(&self) -> &Self::Register<DCFG::Register>;
    fn dctl(&self) -> &Self::Register<DCTL::Register>;
    fn dstat(&self) -> LocalRegisterCopy<u32, DSTAT::Register>;
    fn diepinten(&self) -> &Self::Register<DIEPINTF::Register>;
    fn doepinten(&self) -> &Self::Register<DOEPINTF::Register>;
    fn daepint(&self) -> LocalRegisterCopy<u32, DAEPINT::Register>;
    fn daepinten(&self) -> &Self::Register<DAEPINT::Register>;

    fn diep_ctl(&self, ep: usize) -> &Self::Register<DEPCTL::Register>;
    fn diep_intf(&self, ep: usize) -> &Self::Status<DIEPINTF::Register>;
    fn diep_len(&self, ep: usize) -> &Self::Register<DIEPLEN::Register>;
    fn doep_ctl(&self, ep: usize) -> &Self::Register<DEPCTL::Register>;
    fn doep_intf(&self, ep: usize) -> &Self::Status<DOEPINTF::Register>;
    fn doep_len(&self, ep: usize) -> &Self::Register<DOEPLEN::Register>;

    /// Pop the next entry of the receive status queue.
    fn pop_receive_status(&self) -> LocalRegisterCopy<u32, GRSTAT::Register>;
    /// Pop one word from the shared receive FIFO.
    fn read_fifo(&self) -> u32;
    /// Push one word into transmit FIFO `fifo`.
    fn write_fifo(&self, fifo: usize, word: u32);
}

impl UsbfsHardware for StaticRef<UsbfsRegisters> {
    type Register<N: RegisterLongName> = ReadWrite<u32, N>;
    type Status<N: RegisterLongName> = ReadWrite<u32, N>;

    fn gahbcs(&self) -> &ReadWrite<u32, GAHBCS::Register> {
        &self.gahbcs
    }

    fn gusbcs(&self) -> &ReadWrite<u32, GUSBCS::Register> {
        &self.gusbcs
    }

    fn grstctl(&self) -> &ReadWrite<u32, GRSTCTL::Register> {
        &self.grstctl
    }

    fn gintf(&self) -> &ReadWrite<u32, GINTF::Register> {
        &self.gintf
    }

    fn ginten(&self) -> &ReadWrite<u32, GINTF::Register> {
        &self.ginten
    }

    fn grflen(&self) -> &ReadWrite<u32, GRFLEN::Register> {
        &self.grflen
    }

    fn tx_fifo_length(&self, fifo: usize) -> &ReadWrite<u32, TFLEN::Register> {
        match fifo {
            0 => &self.diep0tflen,
            n => &self.dieptflen[n - 1],
        }
    }

    fn gccfg(&self) -> &ReadWrite<u32, GCCFG::Register> {
        &self.gccfg
    }

    fn dcfg(&self) -> &ReadWrite<u32, DCFG::Register> {
        &self.dcfg
    }

    fn dctl(&self) -> &ReadWrite<u32, DCTL::Register> {
        &self.dctl
    }

    fn dstat(&self) -> LocalRegisterCopy<u32, DSTAT::Register> {
        self.dstat.extract()
    }

    fn diepinten(&self) -> &ReadWrite<u32, DIEPINTF::Register> {
        &self.diepinten
    }

    fn doepinten(&self) -> &ReadWrite<u32, DOEPINTF::Register> {
        &self.doepinten
    }

    fn daepint(&self) -> LocalRegisterCopy<u32, DAEPINT::Register> {
        self.daepint.extract()
    }

    fn daepinten(&self) -> &ReadWrite<u32, DAEPINT::Register> {
        &self.daepinten
    }

    fn diep_ctl(&self, ep: usize) -> &ReadWrite<u32, DEPCTL::Register> {
        &self.diep[ep].ctl
    }

    fn diep_intf(&self, ep: usize) -> &ReadWrite<u32, DIEPINTF::Register> {
        &self.diep[ep].intf
    }

    fn diep_len(&self, ep: usize) -> &ReadWrite<u32, DIEPLEN::Register> {
        &self.diep[ep].len
    }

    fn doep_ctl(&self, ep: usize) -> &ReadWrite<u32, DEPCTL::Register> {
        &self.doep[ep].ctl
    }

    fn doep_intf(&self, ep: usize) -> &ReadWrite<u32, DOEPINTF::Register> {
        &self.doep[ep].intf
    }

    fn doep_len(&self, ep: usize) -> &ReadWrite<u32, DOEPLEN::Register> {
        &self.doep[ep].len
    }

    fn pop_receive_status(&self) -> LocalRegisterCopy<u32, GRSTAT::Register> {
        self.grstatp.extract()
    }

    fn read_fifo(&self) -> u32 {
        self.dfifo[0].data.get()
    }

    fn write_fifo(&self, fifo: usize, word: u32) {
        self.dfifo[fifo].data.set(word);
    }
}
