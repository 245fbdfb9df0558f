use std::ops::RangeInclusive;

use crate::bus::MemoryBus;
use crate::cpu::hardware::interrupt_control::Interrupt;

pub mod dma;
pub mod internal_memory;
pub mod interrupt_control;
pub mod timers;

/// Part of the address space an external peripheral answers for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    /// A whole 16 MB bank, seen through bank-local addresses.
    Bank(u8),
    /// Offsets inside the I/O bank, `address & 0x00FF_FFFF`.
    Io(RangeInclusive<u32>),
}

/// Events a peripheral reports back to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    VBlank,
    HBlank { scanline: u16 },
    /// Sound FIFO A (0) or B (1) is running low.
    FifoRefresh { fifo: usize },
    Interrupt(Interrupt),
}

/// Signals collected during a step, applied by the scheduler right after it.
#[derive(Debug, Default)]
pub struct Signals(Vec<Signal>);

impl Signals {
    pub fn push(&mut self, signal: Signal) {
        self.0.push(signal);
    }

    pub fn raise(&mut self, source: Interrupt) {
        self.push(Signal::Interrupt(source));
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, Signal> {
        self.0.drain(..)
    }
}

/// Hardware living outside the core: LCD, sound, serial, keypad, save memory.
pub trait Peripheral: MemoryBus {
    /// Advances by `cycles`, the time the core just spent.
    fn step(&mut self, cycles: u32, signals: &mut Signals);

    /// Timer 0 or 1 overflowed. Sound FIFOs are clocked from here.
    fn timer_overflow(&mut self, _timer: usize, _signals: &mut Signals) {}
}

/// A peripheral together with the regions it is mapped at.
pub struct Attachment {
    peripheral: Box<dyn Peripheral>,
    regions: Vec<Region>,
}

impl Attachment {
    #[must_use]
    pub fn new(peripheral: Box<dyn Peripheral>, regions: Vec<Region>) -> Self {
        Self {
            peripheral,
            regions,
        }
    }

    pub(crate) fn claims_io(&self, offset: u32) -> bool {
        self.regions
            .iter()
            .any(|region| matches!(region, Region::Io(range) if range.contains(&offset)))
    }

    pub(crate) fn claims_bank(&self, bank: u8) -> bool {
        self.regions.contains(&Region::Bank(bank))
    }

    pub fn peripheral(&mut self) -> &mut dyn Peripheral {
        self.peripheral.as_mut()
    }
}

impl MemoryBus for Attachment {
    fn load8(&mut self, address: u32) -> Option<u8> {
        self.peripheral.load8(address)
    }

    fn load16(&mut self, address: u32) -> Option<u16> {
        self.peripheral.load16(address)
    }

    fn load32(&mut self, address: u32) -> Option<u32> {
        self.peripheral.load32(address)
    }

    fn store8(&mut self, address: u32, value: u8) -> bool {
        self.peripheral.store8(address, value)
    }

    fn store16(&mut self, address: u32, value: u16) -> bool {
        self.peripheral.store16(address, value)
    }

    fn store32(&mut self, address: u32, value: u32) -> bool {
        self.peripheral.store32(address, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Nothing;

    impl MemoryBus for Nothing {
        fn load8(&mut self, _address: u32) -> Option<u8> {
            None
        }

        fn load16(&mut self, _address: u32) -> Option<u16> {
            None
        }

        fn load32(&mut self, _address: u32) -> Option<u32> {
            None
        }

        fn store8(&mut self, _address: u32, _value: u8) -> bool {
            false
        }

        fn store16(&mut self, _address: u32, _value: u16) -> bool {
            false
        }

        fn store32(&mut self, _address: u32, _value: u32) -> bool {
            false
        }
    }

    impl Peripheral for Nothing {
        fn step(&mut self, _cycles: u32, signals: &mut Signals) {
            signals.raise(Interrupt::Serial);
        }
    }

    #[test]
    fn check_claims() {
        let attachment = Attachment::new(
            Box::new(Nothing),
            vec![Region::Io(0x120..=0x12F), Region::Bank(0xE)],
        );
        assert!(attachment.claims_io(0x120));
        assert!(attachment.claims_io(0x12F));
        assert!(!attachment.claims_io(0x130));
        assert!(attachment.claims_bank(0xE));
        assert!(!attachment.claims_bank(0xF));
    }

    #[test]
    fn check_signals() {
        let mut attachment = Attachment::new(Box::new(Nothing), vec![]);
        let mut signals = Signals::default();
        attachment.peripheral().step(4, &mut signals);
        signals.push(Signal::VBlank);

        assert_eq!(
            signals.drain().collect::<Vec<_>>(),
            vec![Signal::Interrupt(Interrupt::Serial), Signal::VBlank]
        );
        assert_eq!(signals.drain().count(), 0);
    }
}
