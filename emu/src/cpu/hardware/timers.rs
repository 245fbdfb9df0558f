//! # Timers
//!
//! Four 16-bit up-counters at `0x0400_0100 + 4 * n`:
//!
//! - `TMxCNT_L`: reads the live counter, writes the reload value.
//! - `TMxCNT_H`: prescaler (bits 0-1), cascade (bit 2), IRQ (bit 6), start (bit 7).
//!
//! Counters are never ticked one by one. A free-running channel remembers the
//! cycle its counter was last synchronised at and derives both the live value
//! and the cycle of its next overflow from it. A cascading channel only moves
//! when the previous one overflows.
//!
//! Register writes are bracketed: every running counter is synchronised to the
//! current cycle before the write lands, and every deadline is re-derived
//! after it.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::bus::{RegisterBlock, impl_register_block_bus};
use crate::cpu::hardware::interrupt_control::{Interrupt, InterruptControl};

/// TMxCNT_H.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerControl(pub u16);

impl TimerControl {
    /// Cycles per tick.
    #[must_use]
    pub fn prescaler(self) -> u64 {
        match self.0.get_bits(0..=1) {
            0 => 1,
            1 => 64,
            2 => 256,
            _ => 1024,
        }
    }

    #[must_use]
    pub fn cascade(self) -> bool {
        self.0.get_bit(2)
    }

    #[must_use]
    pub fn irq(self) -> bool {
        self.0.get_bit(6)
    }

    #[must_use]
    pub fn start(self) -> bool {
        self.0.get_bit(7)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TimerChannel {
    pub reload: u16,
    pub control: TimerControl,

    counter: u16,
    /// Cycle at which `counter` was exact.
    base_cycle: u64,
    overflow_cycle: Option<u64>,
}

impl TimerChannel {
    /// Counting on its own clock, as opposed to stopped or cascading.
    fn free_running(&self, index: usize) -> bool {
        self.control.start() && !(index > 0 && self.control.cascade())
    }

    fn counter_at(&self, index: usize, cycle: u64) -> u16 {
        if self.free_running(index) {
            let ticks = (cycle - self.base_cycle) / self.control.prescaler();
            // A deadline is always handled before the counter can wrap.
            self.counter.wrapping_add(ticks as u16)
        } else {
            self.counter
        }
    }

    fn sync(&mut self, index: usize, cycle: u64) {
        if self.free_running(index) {
            let prescaler = self.control.prescaler();
            let ticks = (cycle - self.base_cycle) / prescaler;
            self.counter = self.counter.wrapping_add(ticks as u16);
            self.base_cycle += ticks * prescaler;
        }
    }

    fn reschedule(&mut self, index: usize) {
        self.overflow_cycle = self.free_running(index).then(|| {
            let remaining = 0x1_0000 - u64::from(self.counter);
            self.base_cycle + remaining * self.control.prescaler()
        });
    }

    /// The current counter value.
    #[must_use]
    pub const fn counter(&self) -> u16 {
        self.counter
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Timers {
    pub channels: [TimerChannel; 4],

    /// Cycles elapsed since power on.
    cycle: u64,
}

impl Timers {
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Live value of timer `index`.
    #[must_use]
    pub fn counter(&self, index: usize) -> u16 {
        self.channels[index].counter_at(index, self.cycle)
    }

    /// Advances time by `elapsed` cycles, handling every overflow in between.
    ///
    /// `on_overflow` hears about overflows of timers 0 and 1, the ones the
    /// sound FIFOs can be clocked from.
    pub fn step(
        &mut self,
        elapsed: u32,
        interrupt_control: &mut InterruptControl,
        on_overflow: &mut dyn FnMut(usize),
    ) {
        let target = self.cycle + u64::from(elapsed);

        while let Some((index, at)) = self.next_overflow(target) {
            let channel = &mut self.channels[index];
            channel.counter = channel.reload;
            channel.base_cycle = at;
            channel.reschedule(index);
            self.overflow(index, interrupt_control, on_overflow);
        }

        self.cycle = target;
    }

    /// Earliest overflow at or before `target`, lowest channel first on ties.
    fn next_overflow(&self, target: u64) -> Option<(usize, u64)> {
        self.channels
            .iter()
            .enumerate()
            .filter_map(|(index, channel)| channel.overflow_cycle.map(|at| (index, at)))
            .filter(|(_, at)| *at <= target)
            .min_by_key(|(index, at)| (*at, *index))
    }

    /// Side effects of timer `index` wrapping.
    fn overflow(
        &mut self,
        index: usize,
        interrupt_control: &mut InterruptControl,
        on_overflow: &mut dyn FnMut(usize),
    ) {
        tracing::trace!("timer {index} overflow");

        if self.channels[index].control.irq() {
            interrupt_control.raise(Interrupt::timer(index));
        }
        if index < 2 {
            on_overflow(index);
        }

        let Some(next) = self.channels.get_mut(index + 1) else {
            return;
        };
        if next.control.start() && next.control.cascade() {
            let (counter, wrapped) = next.counter.overflowing_add(1);
            next.counter = counter;
            if wrapped {
                next.counter = next.reload;
                self.overflow(index + 1, interrupt_control, on_overflow);
            }
        }
    }

    /// Cycles until the next free-running overflow, if any channel runs.
    #[must_use]
    pub fn cycles_until_next_wake(&self) -> Option<u64> {
        self.channels
            .iter()
            .filter_map(|channel| channel.overflow_cycle)
            .min()
            .map(|at| at.saturating_sub(self.cycle))
    }

    fn sync_all(&mut self) {
        let cycle = self.cycle;
        for (index, channel) in self.channels.iter_mut().enumerate() {
            channel.sync(index, cycle);
        }
    }

    fn reschedule_all(&mut self) {
        for (index, channel) in self.channels.iter_mut().enumerate() {
            channel.reschedule(index);
        }
    }
}

impl RegisterBlock for Timers {
    fn read_register(&mut self, offset: u32) -> Option<u16> {
        let index = (offset / 4) as usize;
        let channel = self.channels.get(index)?;
        match offset % 4 {
            0 => Some(channel.counter_at(index, self.cycle)),
            _ => Some(channel.control.0),
        }
    }

    fn write_register(&mut self, offset: u32, value: u16, mask: u16) -> bool {
        let index = (offset / 4) as usize;
        if index >= self.channels.len() {
            return false;
        }

        self.sync_all();

        let cycle = self.cycle;
        let channel = &mut self.channels[index];
        match offset % 4 {
            0 => channel.reload = (channel.reload & !mask) | (value & mask),
            _ => {
                let was_started = channel.control.start();
                let control = (channel.control.0 & !mask) | (value & mask);
                channel.control = TimerControl(control & 0x00C7);

                if !was_started && channel.control.start() {
                    channel.counter = channel.reload;
                    channel.base_cycle = cycle;
                }
            }
        }

        self.reschedule_all();
        true
    }
}

impl_register_block_bus!(Timers);
