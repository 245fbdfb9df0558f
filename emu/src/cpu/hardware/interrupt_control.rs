//! # Interrupt and Power Control
//!
//! Owns the registers at `0x0400_0200` and `0x0400_0300`:
//!
//! | Offset | Register | Notes                                   |
//! |--------|----------|-----------------------------------------|
//! | 0x200  | IE       | Interrupt Enable                        |
//! | 0x202  | IF       | Interrupt Request, write 1 to clear     |
//! | 0x204  | WAITCNT  | Game pak wait states, stored only       |
//! | 0x208  | IME      | Interrupt Master Enable, bit 0          |
//! | 0x300  | POSTFLG  | Byte, set by the BIOS after boot        |
//! | 0x301  | HALTCNT  | Write-only byte, bit 7 selects Stop     |
//!
//! Every peripheral reports interrupts here through [`InterruptControl::raise`].
//! The IRQ line is `IME && (IE & IF) != 0`. A halted CPU wakes as soon as
//! `IE & IF` is nonzero, whatever IME says; a stopped one only for the
//! keypad, game pak and serial sources.

use serde::{Deserialize, Serialize};

use crate::bus::{RegisterBlock, impl_register_block_bus};
use crate::cpu::exception::InterruptLines;

/// Interrupt sources, by their bit in IE and IF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interrupt {
    VBlank = 0,
    HBlank = 1,
    VCount = 2,
    Timer0 = 3,
    Timer1 = 4,
    Timer2 = 5,
    Timer3 = 6,
    Serial = 7,
    Dma0 = 8,
    Dma1 = 9,
    Dma2 = 10,
    Dma3 = 11,
    Keypad = 12,
    GamePak = 13,
}

impl Interrupt {
    #[must_use]
    pub const fn mask(self) -> u16 {
        1 << self as u16
    }

    /// Overflow interrupt of timer `n`.
    #[must_use]
    pub const fn timer(n: usize) -> Self {
        match n {
            0 => Self::Timer0,
            1 => Self::Timer1,
            2 => Self::Timer2,
            _ => Self::Timer3,
        }
    }

    /// Completion interrupt of DMA channel `n`.
    #[must_use]
    pub const fn dma(n: usize) -> Self {
        match n {
            0 => Self::Dma0,
            1 => Self::Dma1,
            2 => Self::Dma2,
            _ => Self::Dma3,
        }
    }
}

/// Sources able to bring the CPU out of Stop.
const STOP_WAKE_MASK: u16 =
    Interrupt::Serial.mask() | Interrupt::Keypad.mask() | Interrupt::GamePak.mask();

const INTERRUPT_BITS: u16 = 0x3FFF;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    #[default]
    Run,
    Halt,
    Stop,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InterruptControl {
    pub interrupt_enable: u16,
    /// Interrupt Request Flags (IF), bits are set when interrupts are requested,
    /// cleared by writing 1 to the corresponding bit
    pub interrupt_request: u16,
    pub wait_state_control: u16,
    pub interrupt_master_enable: u16,
    pub post_boot_flag: u8,
    power_state: PowerState,
    reset_requested: bool,
    fiq_line: bool,
}

impl InterruptControl {
    /// Flags `source` as pending and wakes the CPU if it may.
    pub fn raise(&mut self, source: Interrupt) {
        tracing::trace!("interrupt {source:?} raised");
        self.interrupt_request |= source.mask();
        self.check_wake();
    }

    #[must_use]
    pub const fn power_state(&self) -> PowerState {
        self.power_state
    }

    const fn pending(&self) -> u16 {
        self.interrupt_enable & self.interrupt_request
    }

    /// The IRQ line seen by the CPU.
    #[must_use]
    pub const fn irq_line(&self) -> bool {
        self.interrupt_master_enable & 1 == 1 && self.pending() != 0
    }

    /// Every asynchronous exception line at once.
    #[must_use]
    pub const fn lines(&self) -> InterruptLines {
        InterruptLines {
            reset: self.reset_requested,
            fiq: self.fiq_line,
            irq: self.irq_line(),
        }
    }

    /// Stops the CPU clock until an enabled interrupt is pending.
    pub fn enter_halt(&mut self) {
        if self.pending() == 0 {
            tracing::debug!("entering halt");
            self.power_state = PowerState::Halt;
        }
    }

    /// Stops the whole system until a keypad, game pak or serial interrupt.
    pub fn enter_stop(&mut self) {
        if self.pending() & STOP_WAKE_MASK == 0 {
            tracing::debug!("entering stop");
            self.power_state = PowerState::Stop;
        }
    }

    fn check_wake(&mut self) {
        let wake = match self.power_state {
            PowerState::Run => return,
            PowerState::Halt => self.pending() != 0,
            PowerState::Stop => self.pending() & STOP_WAKE_MASK != 0,
        };

        if wake {
            tracing::debug!("waking up from {:?}", self.power_state);
            self.power_state = PowerState::Run;
        }
    }

    /// Asserts the reset line until the CPU takes it. Also wakes the system.
    pub fn request_reset(&mut self) {
        self.reset_requested = true;
        self.power_state = PowerState::Run;
    }

    pub(crate) fn acknowledge_reset(&mut self) {
        self.reset_requested = false;
    }

    /// The console leaves FIQ unconnected, hosts may drive it anyway.
    pub fn set_fiq_line(&mut self, asserted: bool) {
        self.fiq_line = asserted;
        if asserted {
            self.power_state = PowerState::Run;
        }
    }
}

impl RegisterBlock for InterruptControl {
    fn read_register(&mut self, offset: u32) -> Option<u16> {
        match offset {
            0x00 => Some(self.interrupt_enable),
            0x02 => Some(self.interrupt_request),
            0x04 => Some(self.wait_state_control),
            0x08 => Some(self.interrupt_master_enable),
            // Unused halves inside the block.
            0x06 | 0x0A => Some(0),
            // HALTCNT is write-only.
            0x100 => Some(u16::from(self.post_boot_flag)),
            _ => None,
        }
    }

    fn write_register(&mut self, offset: u32, value: u16, mask: u16) -> bool {
        let merge = |old: u16| (old & !mask) | (value & mask);
        match offset {
            0x00 => {
                self.interrupt_enable = merge(self.interrupt_enable) & INTERRUPT_BITS;
                self.check_wake();
            }
            0x02 => self.interrupt_request &= !(value & mask),
            0x04 => self.wait_state_control = merge(self.wait_state_control),
            0x08 => {
                self.interrupt_master_enable = merge(self.interrupt_master_enable) & 1;
                self.check_wake();
            }
            0x06 | 0x0A => {}
            0x100 => {
                if mask & 0x00FF != 0 {
                    self.post_boot_flag = value as u8 & 1;
                }
                if mask & 0xFF00 != 0 {
                    if value & 0x8000 == 0 {
                        self.enter_halt();
                    } else {
                        self.enter_stop();
                    }
                }
            }
            _ => return false,
        }
        true
    }
}

impl_register_block_bus!(InterruptControl);
