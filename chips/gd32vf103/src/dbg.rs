// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Debug unit. Besides the debug control bits it holds a keyed command
//! register that resets the whole system.

use kernel::hil::reset::ResetTrigger;
use kernel::utilities::registers::interfaces::Writeable;
use kernel::utilities::registers::{register_bitfields, register_structs, WriteOnly};
use kernel::utilities::StaticRef;

pub const DBG_BASE: StaticRef<DbgRegisters> =
    unsafe { StaticRef::new(0xE004_2000 as *const DbgRegisters) };

/// Unlocks `CMD` for the following write.
const CMD_KEY: u32 = 0x4B5A_6C7D;

register_structs! {
    pub DbgRegisters {
        (0x00 => _reserved0),
        (0x08 => cmd: WriteOnly<u32, CMD::Register>),
        (0x0C => key: WriteOnly<u32>),
        (0x10 => @END),
    }
}

register_bitfields![u32,
    CMD [
        RESET OFFSET(0) NUMBITS(1) []
    ]
];

pub struct Dbg {
    registers: StaticRef<DbgRegisters>,
}

impl Dbg {
    pub const fn new(base: StaticRef<DbgRegisters>) -> Self {
        Dbg { registers: base }
    }
}

impl ResetTrigger for Dbg {
    fn reset(&self) -> ! {
        self.registers.key.set(CMD_KEY);
        self.registers.cmd.write(CMD::RESET::SET);
        loop {
            core::hint::spin_loop();
        }
    }
}
