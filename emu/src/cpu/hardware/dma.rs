//! # DMA
//!
//! Four channels at `0x0400_00B0 + 12 * n`:
//!
//! | Offset | Register | Access     |
//! |--------|----------|------------|
//! | +0x0   | SAD      | write-only |
//! | +0x4   | DAD      | write-only |
//! | +0x8   | CNT_L    | write-only |
//! | +0xA   | CNT_H    | read/write |
//!
//! A rising edge of the enable bit latches SAD, DAD and CNT_L into the
//! channel's internal registers. Immediate channels become active right away,
//! the others wait for their start signal. An active channel owns the bus:
//! the scheduler runs its whole block instead of a CPU instruction, in three
//! phases so the transfer can borrow the bus the channel registers live on:
//!
//! ```text
//! Dma::begin_transfer  ->  Transfer::run(bus)  ->  Dma::finish_transfer
//! ```

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::bus::{MemoryBus, RegisterBlock, impl_register_block_bus};
use crate::cpu::hardware::interrupt_control::{Interrupt, InterruptControl};

/// Sound FIFO A, FIFO B is 4 bytes further.
const FIFO_A_ADDRESS: u32 = 0x0400_00A0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressAdjustment {
    Increment,
    Decrement,
    Fixed,
    /// Increment, and reload the destination when the channel repeats.
    IncrementReload,
}

impl From<u16> for AddressAdjustment {
    fn from(value: u16) -> Self {
        match value & 0b11 {
            0b00 => Self::Increment,
            0b01 => Self::Decrement,
            0b10 => Self::Fixed,
            _ => Self::IncrementReload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTiming {
    Immediate,
    VBlank,
    HBlank,
    /// Sound FIFO on channels 1 and 2, video capture on channel 3.
    Special,
}

impl From<u16> for StartTiming {
    fn from(value: u16) -> Self {
        match value & 0b11 {
            0b00 => Self::Immediate,
            0b01 => Self::VBlank,
            0b10 => Self::HBlank,
            _ => Self::Special,
        }
    }
}

/// DMAxCNT_H.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmaControl(pub u16);

impl DmaControl {
    #[must_use]
    pub fn destination_adjustment(self) -> AddressAdjustment {
        self.0.get_bits(5..=6).into()
    }

    /// The prohibited fourth setting behaves as an increment.
    #[must_use]
    pub fn source_adjustment(self) -> AddressAdjustment {
        match AddressAdjustment::from(self.0.get_bits(7..=8)) {
            AddressAdjustment::IncrementReload => AddressAdjustment::Increment,
            adjustment => adjustment,
        }
    }

    #[must_use]
    pub fn repeat(self) -> bool {
        self.0.get_bit(9)
    }

    #[must_use]
    pub fn word_transfer(self) -> bool {
        self.0.get_bit(10)
    }

    #[must_use]
    pub fn start_timing(self) -> StartTiming {
        self.0.get_bits(12..=13).into()
    }

    #[must_use]
    pub fn irq(self) -> bool {
        self.0.get_bit(14)
    }

    #[must_use]
    pub fn enabled(self) -> bool {
        self.0.get_bit(15)
    }

    pub fn set_enabled(&mut self, value: bool) {
        self.0.set_bit(15, value);
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DmaChannel {
    pub source_address: u32,
    pub destination_address: u32,
    pub word_count: u16,
    pub control: DmaControl,

    internal_source: u32,
    internal_destination: u32,
    internal_count: u32,
    active: bool,
}

impl DmaChannel {
    const fn source_mask(index: usize) -> u32 {
        if index == 0 { 0x07FF_FFFF } else { 0x0FFF_FFFF }
    }

    const fn destination_mask(index: usize) -> u32 {
        if index == 3 { 0x0FFF_FFFF } else { 0x07FF_FFFF }
    }

    /// Units per block. Channels 0-2 only see 14 bits of the count, and a
    /// count of 0 is the maximum.
    fn block_count(&self, index: usize) -> u32 {
        let count = if index == 3 {
            self.word_count
        } else {
            self.word_count & 0x3FFF
        };
        match (index, count) {
            (3, 0) => 0x1_0000,
            (_, 0) => 0x4000,
            (_, count) => u32::from(count),
        }
    }

    fn latch(&mut self, index: usize) {
        self.internal_source = self.source_address & Self::source_mask(index);
        self.internal_destination = self.destination_address & Self::destination_mask(index);
        self.internal_count = self.block_count(index);
    }

    /// Channels 1 and 2 with special timing feed the sound FIFOs.
    const fn is_fifo(index: usize, timing: StartTiming) -> bool {
        matches!(timing, StartTiming::Special) && (index == 1 || index == 2)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }
}

/// A block transfer detached from its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub channel: usize,
    pub source: u32,
    pub destination: u32,
    pub count: u32,
    pub word: bool,
    source_adjustment: AddressAdjustment,
    destination_adjustment: AddressAdjustment,
    open_bus: u32,
}

const fn adjust(address: u32, adjustment: AddressAdjustment, unit: u32) -> u32 {
    match adjustment {
        AddressAdjustment::Increment | AddressAdjustment::IncrementReload => {
            address.wrapping_add(unit)
        }
        AddressAdjustment::Decrement => address.wrapping_sub(unit),
        AddressAdjustment::Fixed => address,
    }
}

impl Transfer {
    /// Moves the whole block and returns the cycles it took.
    ///
    /// A failed read transfers the last value seen on the bus instead.
    /// Failed writes are dropped.
    pub fn run(&mut self, bus: &mut dyn MemoryBus) -> u32 {
        let unit = if self.word { 4 } else { 2 };
        tracing::trace!(
            "DMA{} 0x{:08X} -> 0x{:08X}, {} x {unit} bytes",
            self.channel,
            self.source,
            self.destination,
            self.count
        );

        for _ in 0..self.count {
            if self.word {
                let value = bus.load32(self.source & !3).unwrap_or(self.open_bus);
                self.open_bus = value;
                bus.store32(self.destination & !3, value);
            } else {
                let value = bus
                    .load16(self.source & !1)
                    .unwrap_or(self.open_bus as u16);
                self.open_bus = u32::from(value) * 0x0001_0001;
                bus.store16(self.destination & !1, value);
            }

            self.source = adjust(self.source, self.source_adjustment, unit);
            self.destination = adjust(self.destination, self.destination_adjustment, unit);
        }

        2 + 2 * self.count
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Dma {
    pub channels: [DmaChannel; 4],

    /// Last value a transfer moved.
    open_bus: u32,
}

impl Dma {
    /// Whether a channel wants the bus.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.channels.iter().any(DmaChannel::is_active)
    }

    /// Takes the block of the highest priority active channel.
    pub fn begin_transfer(&self) -> Option<Transfer> {
        let index = self.channels.iter().position(DmaChannel::is_active)?;
        let channel = &self.channels[index];
        let control = channel.control;

        let transfer = if DmaChannel::is_fifo(index, control.start_timing()) {
            Transfer {
                channel: index,
                source: channel.internal_source,
                destination: channel.internal_destination,
                count: 4,
                word: true,
                source_adjustment: control.source_adjustment(),
                destination_adjustment: AddressAdjustment::Fixed,
                open_bus: self.open_bus,
            }
        } else {
            Transfer {
                channel: index,
                source: channel.internal_source,
                destination: channel.internal_destination,
                count: channel.internal_count,
                word: control.word_transfer(),
                source_adjustment: control.source_adjustment(),
                destination_adjustment: control.destination_adjustment(),
                open_bus: self.open_bus,
            }
        };

        Some(transfer)
    }

    /// Stores the progress of `transfer` back and completes its channel.
    pub fn finish_transfer(&mut self, transfer: Transfer, interrupt_control: &mut InterruptControl) {
        self.open_bus = transfer.open_bus;
        let index = transfer.channel;
        let channel = &mut self.channels[index];
        channel.internal_source = transfer.source;
        channel.internal_destination = transfer.destination;
        channel.active = false;

        let control = channel.control;
        if control.irq() {
            interrupt_control.raise(Interrupt::dma(index));
        }

        if control.repeat() && control.start_timing() != StartTiming::Immediate {
            channel.internal_count = channel.block_count(index);
            if control.destination_adjustment() == AddressAdjustment::IncrementReload {
                channel.internal_destination =
                    channel.destination_address & DmaChannel::destination_mask(index);
            }
        } else {
            channel.control.set_enabled(false);
        }
    }

    fn trigger(&mut self, wants: impl Fn(usize, &DmaChannel) -> bool) {
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if channel.control.enabled() && wants(index, channel) {
                channel.active = true;
            }
        }
    }

    pub fn signal_vblank(&mut self) {
        self.trigger(|_, channel| channel.control.start_timing() == StartTiming::VBlank);
    }

    /// HBlank of `scanline`. Also drives video capture on channel 3.
    pub fn signal_hblank(&mut self, scanline: u16) {
        if scanline < 160 {
            self.trigger(|_, channel| channel.control.start_timing() == StartTiming::HBlank);
        }

        let capture = &mut self.channels[3];
        if capture.control.enabled() && capture.control.start_timing() == StartTiming::Special {
            match scanline {
                2..=161 => capture.active = true,
                162 => {
                    tracing::debug!("video capture DMA finished");
                    capture.control.set_enabled(false);
                    capture.active = false;
                }
                _ => {}
            }
        }
    }

    /// Sound FIFO `fifo` (0 for A, 1 for B) asks for more samples.
    pub fn signal_fifo_refresh(&mut self, fifo: usize) {
        let address = FIFO_A_ADDRESS + 4 * fifo as u32;
        self.trigger(|index, channel| {
            DmaChannel::is_fifo(index, channel.control.start_timing())
                && channel.internal_destination == address
        });
    }

    fn write_control(&mut self, index: usize, value: u16) {
        let channel = &mut self.channels[index];
        let was_enabled = channel.control.enabled();
        channel.control = DmaControl(value);

        if !channel.control.enabled() {
            channel.active = false;
        } else if !was_enabled {
            channel.latch(index);
            channel.active = channel.control.start_timing() == StartTiming::Immediate;
            tracing::trace!("DMA{index} enabled with control 0x{value:04X}");
        }
    }
}

impl RegisterBlock for Dma {
    fn read_register(&mut self, offset: u32) -> Option<u16> {
        let channel = self.channels.get((offset / 12) as usize)?;
        match offset % 12 {
            0x0A => Some(channel.control.0),
            _ => Some(0),
        }
    }

    fn write_register(&mut self, offset: u32, value: u16, mask: u16) -> bool {
        let index = (offset / 12) as usize;
        let Some(channel) = self.channels.get_mut(index) else {
            return false;
        };

        let merge_low = |old: u32| (old & !u32::from(mask)) | u32::from(value & mask);
        let merge_high =
            |old: u32| (old & !(u32::from(mask) << 16)) | (u32::from(value & mask) << 16);

        match offset % 12 {
            0x0 => channel.source_address = merge_low(channel.source_address),
            0x2 => channel.source_address = merge_high(channel.source_address),
            0x4 => channel.destination_address = merge_low(channel.destination_address),
            0x6 => channel.destination_address = merge_high(channel.destination_address),
            0x8 => channel.word_count = (channel.word_count & !mask) | (value & mask),
            _ => {
                let control = (channel.control.0 & !mask) | (value & mask);
                self.write_control(index, control);
            }
        }
        true
    }
}

impl_register_block_bus!(Dma);
