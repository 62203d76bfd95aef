// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Busy-wait delays on the core's machine timer.

use kernel::hil::time::Delay;
use kernel::utilities::registers::interfaces::Readable;
use kernel::utilities::registers::{register_structs, ReadOnly};
use kernel::utilities::StaticRef;

pub const MTIMER_BASE: StaticRef<MachineTimerRegisters> =
    unsafe { StaticRef::new(0xD100_0000 as *const MachineTimerRegisters) };

register_structs! {
    pub MachineTimerRegisters {
        (0x0 => value_low: ReadOnly<u32>),
        (0x4 => value_high: ReadOnly<u32>),
        (0x8 => @END),
    }
}

pub struct MachineTimerDelay {
    registers: StaticRef<MachineTimerRegisters>,
    ticks_per_us: u32,
}

impl MachineTimerDelay {
    /// The machine timer counts at a quarter of the core clock, so
    /// `ticks_per_us` is `hclk / 4_000_000`.
    pub const fn new(base: StaticRef<MachineTimerRegisters>, ticks_per_us: u32) -> Self {
        MachineTimerDelay {
            registers: base,
            ticks_per_us,
        }
    }

    /// Read the 64-bit counter, retrying if the low half wrapped between the
    /// two reads.
    pub fn now(&self) -> u64 {
        loop {
            let high = self.registers.value_high.get();
            let low = self.registers.value_low.get();
            if self.registers.value_high.get() == high {
                return (u64::from(high) << 32) | u64::from(low);
            }
        }
    }
}

impl Delay for MachineTimerDelay {
    fn delay_us(&self, us: u32) {
        let start = self.now();
        let ticks = u64::from(us) * u64::from(self.ticks_per_us);
        while self.now().wrapping_sub(start) < ticks {
            core::hint::spin_loop();
        }
    }
}
