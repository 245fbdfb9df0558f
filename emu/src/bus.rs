//! # Memory Bus
//!
//! Every component reachable from the CPU implements [`MemoryBus`]: six
//! little-endian load/store operations that report success per call.
//!
//! ```text
//! SystemBus (16 banks, address >> 24)
//! ├── 0  BIOS                  16 KB, read-only
//! ├── 2  external work RAM     256 KB, mirrored
//! ├── 3  internal work RAM     32 KB, mirrored
//! ├── 4  I/O                   offset = address & 0x00FF_FFFF, not mirrored
//! │   ├── 0x0B0-0x0DF  DMA
//! │   ├── 0x100-0x10F  timers
//! │   ├── 0x200-0x20B  interrupt control, WAITCNT
//! │   ├── 0x300-0x301  POSTFLG, HALTCNT
//! │   └── anything else: attached peripherals (LCD, sound, serial, keypad)
//! ├── 5-7  palette, VRAM, OAM  attached peripherals
//! ├── 8-D  game pak ROM        attached peripheral or built-in ROM
//! └── E-F  game pak SRAM       attached peripheral
//! ```
//!
//! Composite nodes only pick a child and rebase the address into the child's
//! frame. Assembling halfwords and words out of smaller pieces happens in the
//! leaves.
//!
//! A failed load returns `None` and the caller substitutes its own open-bus
//! value. Stores to unmapped memory are accepted and dropped, while register
//! blocks reject offsets they don't know.

use crate::cpu::hardware::Attachment;
use crate::cpu::hardware::dma::Dma;
use crate::cpu::hardware::internal_memory::{GamePakRom, InternalMemory};
use crate::cpu::hardware::interrupt_control::InterruptControl;
use crate::cpu::hardware::timers::Timers;

/// Load/store interface shared by every node of the address space.
///
/// Callers keep accesses aligned: `address & 1 == 0` for halfwords and
/// `address & 3 == 0` for words.
pub trait MemoryBus {
    fn load8(&mut self, address: u32) -> Option<u8>;
    fn load16(&mut self, address: u32) -> Option<u16>;
    fn load32(&mut self, address: u32) -> Option<u32>;

    fn store8(&mut self, address: u32, value: u8) -> bool;
    fn store16(&mut self, address: u32, value: u16) -> bool;
    fn store32(&mut self, address: u32, value: u32) -> bool;
}

/// A block of 16-bit I/O registers.
///
/// Implementors only deal with whole halfwords, [`impl_register_block_bus`]
/// turns them into a [`MemoryBus`] leaf.
pub trait RegisterBlock {
    /// Reads the halfword register at `offset`.
    fn read_register(&mut self, offset: u32) -> Option<u16>;

    /// Writes the bits of `value` selected by `mask` into the register at `offset`.
    ///
    /// Byte stores arrive here as a masked halfword write, so registers with
    /// write side effects (write-1-to-clear, enable edges) only see the byte
    /// that was actually written.
    fn write_register(&mut self, offset: u32, value: u16, mask: u16) -> bool;
}

/// Implements [`MemoryBus`] for a [`RegisterBlock`].
///
/// A byte load returns the addressed half of the containing register.
/// Words are two consecutive registers, the access fails if either does.
macro_rules! impl_register_block_bus {
    ($block:ty) => {
        impl $crate::bus::MemoryBus for $block {
            fn load8(&mut self, address: u32) -> Option<u8> {
                let half = $crate::bus::RegisterBlock::read_register(self, address & !1)?;
                Some((half >> ((address & 1) * 8)) as u8)
            }

            fn load16(&mut self, address: u32) -> Option<u16> {
                $crate::bus::RegisterBlock::read_register(self, address & !1)
            }

            fn load32(&mut self, address: u32) -> Option<u32> {
                let low = $crate::bus::MemoryBus::load16(self, address)?;
                let high = $crate::bus::MemoryBus::load16(self, address.wrapping_add(2))?;
                Some(u32::from(low) | (u32::from(high) << 16))
            }

            fn store8(&mut self, address: u32, value: u8) -> bool {
                let shift = (address & 1) * 8;
                $crate::bus::RegisterBlock::write_register(
                    self,
                    address & !1,
                    u16::from(value) << shift,
                    0xFF << shift,
                )
            }

            fn store16(&mut self, address: u32, value: u16) -> bool {
                $crate::bus::RegisterBlock::write_register(self, address & !1, value, 0xFFFF)
            }

            fn store32(&mut self, address: u32, value: u32) -> bool {
                let low = $crate::bus::MemoryBus::store16(self, address, value as u16);
                let high =
                    $crate::bus::MemoryBus::store16(self, address.wrapping_add(2), (value >> 16) as u16);
                low && high
            }
        }
    };
}

pub(crate) use impl_register_block_bus;

/// Children of the top-level bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Bios,
    WorkingRam,
    WorkingIram,
    GamePakRom,
    Dma,
    Timers,
    InterruptControl,
    External(usize),
}

/// The whole address space as seen by the CPU and the DMA engine.
///
/// A short-lived view borrowing every component for the duration of a
/// single CPU or DMA step.
pub struct SystemBus<'a> {
    pub memory: &'a mut InternalMemory,
    pub rom: Option<&'a mut GamePakRom>,
    pub dma: &'a mut Dma,
    pub timers: &'a mut Timers,
    pub interrupt_control: &'a mut InterruptControl,
    pub peripherals: &'a mut [Attachment],
}

impl SystemBus<'_> {
    /// Picks the child owning `address` and rebases it.
    fn route(&self, address: u32) -> Option<(Node, u32)> {
        if address >= 0x1000_0000 {
            return None;
        }

        let bank = (address >> 24) as u8;
        let local = address & 0x00FF_FFFF;

        match bank {
            0x0 => Some((Node::Bios, local)),
            0x2 => Some((Node::WorkingRam, local)),
            0x3 => Some((Node::WorkingIram, local)),
            0x4 => self.route_io(local),
            0x8..=0xD => self.external_bank(bank, local).or_else(|| {
                self.rom
                    .is_some()
                    .then_some((Node::GamePakRom, address & 0x01FF_FFFF))
            }),
            _ => self.external_bank(bank, local),
        }
    }

    fn route_io(&self, offset: u32) -> Option<(Node, u32)> {
        match offset {
            0x0B0..=0x0DF => Some((Node::Dma, offset - 0x0B0)),
            0x100..=0x10F => Some((Node::Timers, offset - 0x100)),
            0x200..=0x20B | 0x300..=0x301 => Some((Node::InterruptControl, offset - 0x200)),
            _ => self
                .peripherals
                .iter()
                .position(|attachment| attachment.claims_io(offset))
                .map(|index| (Node::External(index), offset)),
        }
    }

    fn external_bank(&self, bank: u8, local: u32) -> Option<(Node, u32)> {
        self.peripherals
            .iter()
            .position(|attachment| attachment.claims_bank(bank))
            .map(|index| (Node::External(index), local))
    }

    fn with_node<R>(
        &mut self,
        node: Node,
        access: impl FnOnce(&mut dyn MemoryBus) -> R,
    ) -> Option<R> {
        match node {
            Node::Bios => Some(access(&mut self.memory.bios())),
            Node::WorkingRam => Some(access(&mut self.memory.working_ram())),
            Node::WorkingIram => Some(access(&mut self.memory.working_iram())),
            Node::GamePakRom => self.rom.as_deref_mut().map(|rom| access(rom)),
            Node::Dma => Some(access(&mut *self.dma)),
            Node::Timers => Some(access(&mut *self.timers)),
            Node::InterruptControl => Some(access(&mut *self.interrupt_control)),
            Node::External(index) => self.peripherals.get_mut(index).map(|a| access(a)),
        }
    }

    fn load<T>(
        &mut self,
        address: u32,
        access: impl FnOnce(&mut dyn MemoryBus, u32) -> Option<T>,
    ) -> Option<T> {
        let (node, local) = self.route(address)?;
        self.with_node(node, |bus| access(bus, local)).flatten()
    }

    fn store(
        &mut self,
        address: u32,
        access: impl FnOnce(&mut dyn MemoryBus, u32) -> bool,
    ) -> bool {
        match self.route(address) {
            Some((node, local)) => self.with_node(node, |bus| access(bus, local)).unwrap_or(true),
            None => {
                tracing::trace!("store to unmapped address 0x{address:08X} ignored");
                true
            }
        }
    }
}

impl MemoryBus for SystemBus<'_> {
    fn load8(&mut self, address: u32) -> Option<u8> {
        self.load(address, |bus, local| bus.load8(local))
    }

    fn load16(&mut self, address: u32) -> Option<u16> {
        self.load(address, |bus, local| bus.load16(local))
    }

    fn load32(&mut self, address: u32) -> Option<u32> {
        self.load(address, |bus, local| bus.load32(local))
    }

    fn store8(&mut self, address: u32, value: u8) -> bool {
        self.store(address, |bus, local| bus.store8(local, value))
    }

    fn store16(&mut self, address: u32, value: u16) -> bool {
        self.store(address, |bus, local| bus.store16(local, value))
    }

    fn store32(&mut self, address: u32, value: u32) -> bool {
        self.store(address, |bus, local| bus.store32(local, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::hardware::interrupt_control::Interrupt;
    use crate::cpu::hardware::{Peripheral, Region, Signals};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Components {
        memory: InternalMemory,
        rom: Option<GamePakRom>,
        dma: Dma,
        timers: Timers,
        interrupt_control: InterruptControl,
        peripherals: Vec<Attachment>,
    }

    impl Components {
        fn bus(&mut self) -> SystemBus<'_> {
            SystemBus {
                memory: &mut self.memory,
                rom: self.rom.as_mut(),
                dma: &mut self.dma,
                timers: &mut self.timers,
                interrupt_control: &mut self.interrupt_control,
                peripherals: &mut self.peripherals,
            }
        }
    }

    /// A single 16-bit register visible everywhere it is mapped.
    #[derive(Default)]
    struct Latch {
        value: u16,
        last_address: u32,
    }

    impl RegisterBlock for Latch {
        fn read_register(&mut self, offset: u32) -> Option<u16> {
            self.last_address = offset;
            Some(self.value)
        }

        fn write_register(&mut self, offset: u32, value: u16, mask: u16) -> bool {
            self.last_address = offset;
            self.value = (self.value & !mask) | (value & mask);
            true
        }
    }

    impl_register_block_bus!(Latch);

    impl Peripheral for Latch {
        fn step(&mut self, _cycles: u32, _signals: &mut Signals) {}
    }

    #[test]
    fn check_work_ram_mirrors() {
        let mut components = Components::default();
        let mut bus = components.bus();

        assert!(bus.store32(0x0200_0010, 0x1234_5678));
        assert_eq!(bus.load32(0x0204_0010), Some(0x1234_5678));
        assert_eq!(bus.load16(0x02FC_0012), Some(0x1234));
        assert_eq!(bus.load8(0x0200_0013), Some(0x12));

        assert!(bus.store16(0x0300_7FFE, 0xBEEF));
        assert_eq!(bus.load16(0x0300_FFFE), Some(0xBEEF));
    }

    #[test]
    fn check_unmapped_addresses() {
        let mut components = Components::default();
        let mut bus = components.bus();

        assert_eq!(bus.load32(0x0100_0000), None);
        assert_eq!(bus.load8(0x1000_0000), None);
        assert_eq!(bus.load16(0x0000_4000), None);
        assert!(bus.store32(0x0100_0000, 0xFFFF_FFFF));
        assert!(bus.store8(0xFFFF_FFFF, 0xFF));
        // No ROM and nothing attached.
        assert_eq!(bus.load32(0x0800_0000), None);
        // Unclaimed I/O.
        assert_eq!(bus.load16(0x0400_0000), None);
        assert!(bus.store16(0x0400_0000, 0x0403));
    }

    #[test]
    fn check_bios_is_read_only() {
        let mut components = Components::default();
        let mut bus = components.bus();

        assert!(bus.store32(0x0000_0000, 0xE3A0_0000));
        assert_eq!(bus.load32(0x0000_0000), Some(0));
    }

    #[test]
    fn check_io_registers() {
        let mut components = Components::default();
        let mut bus = components.bus();

        assert!(bus.store16(0x0400_0200, Interrupt::Timer0.mask()));
        assert_eq!(bus.load16(0x0400_0200), Some(Interrupt::Timer0.mask()));
        // Byte loads shift the containing halfword.
        assert_eq!(bus.load8(0x0400_0200), Some(0x08));
        assert_eq!(bus.load8(0x0400_0201), Some(0x00));

        assert!(bus.store16(0x0400_0102, 0x0080));
        assert_eq!(bus.load16(0x0400_0102), Some(0x0080));

        // Registers are not repeated past the first 1 KB of the bank.
        assert_eq!(bus.load16(0x0400_0600), None);
        assert_eq!(bus.load16(0x0400_1102), None);
    }

    #[test]
    fn check_attached_peripherals_see_local_addresses() {
        let mut components = Components::default();
        components.peripherals.push(Attachment::new(
            Box::new(Latch::default()),
            vec![Region::Bank(0x6), Region::Io(0x000..=0x05F)],
        ));
        let mut bus = components.bus();

        assert!(bus.store16(0x0601_0004, 0xABCD));
        assert_eq!(bus.load16(0x0400_0000), Some(0xABCD));
        assert!(bus.store8(0x0400_0041, 0x12));
        assert_eq!(bus.load16(0x0600_0000), Some(0x12CD));
        assert_eq!(bus.load16(0x0500_0000), None);
    }

    #[test]
    fn check_rom_window() {
        let mut components = Components {
            rom: GamePakRom::new(vec![0x11, 0x22, 0x33, 0x44]).ok(),
            ..Default::default()
        };
        let mut bus = components.bus();

        assert_eq!(bus.load32(0x0800_0000), Some(0x4433_2211));
        assert_eq!(bus.load32(0x0A00_0000), Some(0x4433_2211));
        assert_eq!(bus.load16(0x0C00_0002), Some(0x4433));
        // The upper 16 MB of each 32 MB window lies past this small image.
        assert_eq!(bus.load16(0x0D00_0002), Some(0x0001));
    }
}
