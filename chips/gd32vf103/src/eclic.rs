// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Enhanced Core Local Interrupt Controller (ECLIC) of the Bumblebee core.

use kernel::utilities::registers::interfaces::Writeable;
use kernel::utilities::registers::{register_bitfields, register_structs, ReadWrite};
use kernel::utilities::StaticRef;

/// Interrupt sources wired to the ECLIC on the GD32VF103.
pub const N_INTERRUPTS: usize = 87;

pub const ECLIC_BASE: StaticRef<EclicRegisters> =
    unsafe { StaticRef::new(0xD200_0000 as *const EclicRegisters) };

register_structs! {
    InterruptControl {
        (0x0 => ip: ReadWrite<u8, CLICINTIP::Register>),
        (0x1 => ie: ReadWrite<u8, CLICINTIE::Register>),
        (0x2 => attr: ReadWrite<u8, CLICINTATTR::Register>),
        (0x3 => ctl: ReadWrite<u8, CLICINTCTL::Register>),
        (0x4 => @END),
    },

    pub EclicRegisters {
        (0x0000 => cliccfg: ReadWrite<u8, CLICCFG::Register>),
        (0x0001 => _reserved0),
        (0x1000 => interrupts: [InterruptControl; N_INTERRUPTS]),
        (0x115C => @END),
    }
}

register_bitfields![u8,
    CLICCFG [
        NLBITS OFFSET(1) NUMBITS(4) []
    ],
    CLICINTIP [
        IP OFFSET(0) NUMBITS(1) []
    ],
    CLICINTIE [
        IE OFFSET(0) NUMBITS(1) []
    ],
    CLICINTATTR [
        SHV OFFSET(0) NUMBITS(1) [],
        TRIG OFFSET(1) NUMBITS(2) [
            Level = 0,
            RisingEdge = 1,
            FallingEdge = 3
        ]
    ],
    /// With `CLICCFG.NLBITS` = 4 the whole upper nibble is the level.
    CLICINTCTL [
        LEVEL OFFSET(4) NUMBITS(4) []
    ]
];

pub struct Eclic {
    registers: StaticRef<EclicRegisters>,
}

impl Eclic {
    pub const fn new(base: StaticRef<EclicRegisters>) -> Self {
        Eclic { registers: base }
    }

    /// Make `irq` a non-vectored, level-triggered source at `level`.
    ///
    /// Sources of equal level do not preempt each other, so a handler is
    /// never re-entered by its own interrupt.
    pub fn configure_level_triggered(&self, irq: u32, level: u8) {
        let regs = self.registers;
        regs.cliccfg.write(CLICCFG::NLBITS.val(4));
        if let Some(int) = regs.interrupts.get(irq as usize) {
            int.ie.write(CLICINTIE::IE::CLEAR);
            int.ip.write(CLICINTIP::IP::CLEAR);
            int.attr.write(CLICINTATTR::SHV::CLEAR + CLICINTATTR::TRIG::Level);
            int.ctl.write(CLICINTCTL::LEVEL.val(level));
        }
    }

    pub fn enable(&self, irq: u32) {
        if let Some(int) = self.registers.interrupts.get(irq as usize) {
            int.ie.write(CLICINTIE::IE::SET);
        }
    }

    pub fn disable(&self, irq: u32) {
        if let Some(int) = self.registers.interrupts.get(irq as usize) {
            int.ie.write(CLICINTIE::IE::CLEAR);
        }
    }
}
