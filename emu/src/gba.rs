//! # Step scheduler
//!
//! [`Gba`] owns every component and advances them in lockstep. Each
//! [`Gba::step`] does exactly one of the following, then lets the timers and
//! the attached peripherals catch up on the cycles it took:
//!
//! 1. an active DMA channel moves its block, the CPU stays off the bus;
//! 2. a running CPU executes one instruction or enters an exception;
//! 3. a halted CPU sleeps until the next timer overflow, at most
//!    [`IDLE_CHUNK`] cycles;
//! 4. a stopped system sleeps [`IDLE_CHUNK`] cycles with the timers frozen.
//!
//! Signals raised by peripherals during the step take effect before it
//! returns.

use crate::bus::SystemBus;
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::hardware::dma::Dma;
use crate::cpu::hardware::internal_memory::{GamePakRom, InternalMemory};
use crate::cpu::hardware::interrupt_control::{Interrupt, InterruptControl, PowerState};
use crate::cpu::hardware::timers::Timers;
use crate::cpu::hardware::{Attachment, Signal, Signals};

/// Longest stretch of cycles a sleeping system skips in one step.
pub const IDLE_CHUNK: u32 = 256;

pub struct Gba {
    pub cpu: Arm7tdmi,
    pub memory: InternalMemory,
    pub rom: Option<GamePakRom>,
    pub dma: Dma,
    pub timers: Timers,
    pub interrupt_control: InterruptControl,

    peripherals: Vec<Attachment>,
    signals: Signals,
}

impl Gba {
    /// A console fresh out of reset, `bios` mapped at 0 and `rom` on the
    /// game pak bus.
    pub fn new(bios: &[u8], rom: Option<Vec<u8>>) -> Result<Self, String> {
        let memory = InternalMemory::new(bios)?;
        let rom = rom.map(GamePakRom::new).transpose()?;

        Ok(Self {
            cpu: Arm7tdmi::new(),
            memory,
            rom,
            dma: Dma::default(),
            timers: Timers::default(),
            interrupt_control: InterruptControl::default(),
            peripherals: Vec::new(),
            signals: Signals::default(),
        })
    }

    /// Maps an external peripheral. Earlier attachments win on overlaps.
    pub fn attach(&mut self, attachment: Attachment) {
        self.peripherals.push(attachment);
    }

    /// The address space as the CPU sees it.
    pub fn bus(&mut self) -> SystemBus<'_> {
        self.split().1
    }

    fn split(&mut self) -> (&mut Arm7tdmi, SystemBus<'_>) {
        let bus = SystemBus {
            memory: &mut self.memory,
            rom: self.rom.as_mut(),
            dma: &mut self.dma,
            timers: &mut self.timers,
            interrupt_control: &mut self.interrupt_control,
            peripherals: &mut self.peripherals,
        };
        (&mut self.cpu, bus)
    }

    pub fn signal_vblank(&mut self) {
        self.apply(Signal::VBlank);
    }

    pub fn signal_hblank(&mut self, scanline: u16) {
        self.apply(Signal::HBlank { scanline });
    }

    pub fn signal_fifo_refresh(&mut self, fifo: usize) {
        self.apply(Signal::FifoRefresh { fifo });
    }

    pub fn raise_interrupt(&mut self, source: Interrupt) {
        self.apply(Signal::Interrupt(source));
    }

    /// Asserts the reset line, taken by the CPU on its next step.
    pub fn request_reset(&mut self) {
        self.interrupt_control.request_reset();
    }

    fn apply(&mut self, signal: Signal) {
        match signal {
            Signal::VBlank => self.dma.signal_vblank(),
            Signal::HBlank { scanline } => self.dma.signal_hblank(scanline),
            Signal::FifoRefresh { fifo } => self.dma.signal_fifo_refresh(fifo),
            Signal::Interrupt(source) => self.interrupt_control.raise(source),
        }
    }

    /// Advances the system by one scheduling decision and returns the cycles
    /// it took.
    pub fn step(&mut self) -> u32 {
        let (elapsed, advance_timers) = if let Some(mut transfer) = self.dma.begin_transfer() {
            let cycles = transfer.run(&mut self.bus());
            self.dma
                .finish_transfer(transfer, &mut self.interrupt_control);
            (cycles, true)
        } else {
            match self.interrupt_control.power_state() {
                PowerState::Run => (self.step_cpu(), true),
                PowerState::Halt => {
                    let idle = self
                        .timers
                        .cycles_until_next_wake()
                        .map_or(IDLE_CHUNK, |cycles| {
                            u32::try_from(cycles).unwrap_or(IDLE_CHUNK).min(IDLE_CHUNK)
                        })
                        .max(1);
                    (idle, true)
                }
                PowerState::Stop => (IDLE_CHUNK, false),
            }
        };

        if advance_timers {
            let peripherals = &mut self.peripherals;
            let signals = &mut self.signals;
            self.timers
                .step(elapsed, &mut self.interrupt_control, &mut |timer| {
                    for attachment in peripherals.iter_mut() {
                        attachment.peripheral().timer_overflow(timer, signals);
                    }
                });
        }

        for attachment in &mut self.peripherals {
            attachment.peripheral().step(elapsed, &mut self.signals);
        }

        let signals: Vec<Signal> = self.signals.drain().collect();
        for signal in signals {
            self.apply(signal);
        }

        elapsed
    }

    fn step_cpu(&mut self) -> u32 {
        let lines = self.interrupt_control.lines();
        let (cpu, mut bus) = self.split();
        let cycles = cpu.step(&mut bus, lines);

        if lines.reset {
            tracing::debug!("reset taken");
            self.interrupt_control.acknowledge_reset();
        }

        cycles
    }

    /// Steps until at least `cycles` cycles have passed and returns how many
    /// actually did.
    pub fn run_for(&mut self, cycles: u64) -> u64 {
        let mut elapsed = 0;
        while elapsed < cycles {
            elapsed += u64::from(self.step());
        }
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::cpu::hardware::Peripheral;
    use pretty_assertions::assert_eq;

    /// Emits an HBlank every 8 cycles and counts timer overflows.
    #[derive(Default)]
    struct Scanlines {
        cycles: u32,
        scanline: u16,
        overflows: u16,
    }

    impl MemoryBus for Scanlines {
        fn load8(&mut self, _address: u32) -> Option<u8> {
            None
        }

        fn load16(&mut self, _address: u32) -> Option<u16> {
            Some(self.overflows)
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

    impl Peripheral for Scanlines {
        fn step(&mut self, cycles: u32, signals: &mut Signals) {
            self.cycles += cycles;
            while self.cycles >= 8 {
                self.cycles -= 8;
                signals.push(Signal::HBlank {
                    scanline: self.scanline,
                });
                self.scanline += 1;
            }
        }

        fn timer_overflow(&mut self, _timer: usize, _signals: &mut Signals) {
            self.overflows += 1;
        }
    }

    #[test]
    fn check_bios_size() {
        assert!(Gba::new(&[0; 0x4001], None).is_err());
        assert!(Gba::new(&[], Some(vec![0; 0x0200_0001])).is_err());
        assert!(Gba::new(&[], Some(vec![0; 16])).is_ok());
    }

    #[test]
    fn check_stop_freezes_timers() {
        let mut gba = Gba::new(&[], None).unwrap();
        let mut bus = gba.bus();
        assert!(bus.store16(0x0400_0102, 0x0080));
        assert!(bus.store8(0x0400_0301, 0x80));

        assert_eq!(gba.interrupt_control.power_state(), PowerState::Stop);
        assert_eq!(gba.step(), IDLE_CHUNK);
        assert_eq!(gba.timers.cycle(), 0);

        gba.raise_interrupt(Interrupt::Keypad);
        assert_eq!(gba.interrupt_control.power_state(), PowerState::Stop);
        assert!(gba.bus().store16(0x0400_0200, Interrupt::Keypad.mask()));
        assert_eq!(gba.interrupt_control.power_state(), PowerState::Run);
    }

    #[test]
    fn check_halt_without_timers_idles_in_chunks() {
        let mut gba = Gba::new(&[], None).unwrap();
        gba.interrupt_control.enter_halt();
        assert_eq!(gba.step(), IDLE_CHUNK);
        assert_eq!(gba.run_for(1000), 4 * u64::from(IDLE_CHUNK));
        assert_eq!(gba.timers.cycle(), 5 * u64::from(IDLE_CHUNK));
    }

    #[test]
    fn check_peripheral_signals_drive_dma() {
        let mut gba = Gba::new(&[], None).unwrap();
        gba.attach(Attachment::new(
            Box::new(Scanlines::default()),
            vec![crate::cpu::hardware::Region::Io(0x000..=0x001)],
        ));
        gba.interrupt_control.enter_halt();

        let mut bus = gba.bus();
        assert!(bus.store32(0x0300_0000, 0x1234_5678));
        assert!(bus.store32(0x0400_00B0, 0x0300_0000));
        assert!(bus.store32(0x0400_00B4, 0x0200_0000));
        // One word on HBlank with IRQ, no repeat.
        assert!(bus.store32(0x0400_00B8, 0xE400_0001));
        // Timer 0 overflows every 4 cycles.
        assert!(bus.store16(0x0400_0100, 0xFFFC));
        assert!(bus.store16(0x0400_0102, 0x0080));

        // Halted until the first overflow, the peripheral sees 4 cycles.
        assert_eq!(gba.step(), 4);
        assert_eq!(gba.bus().load16(0x0400_0000), Some(1));
        assert!(!gba.dma.is_active());

        // The next 4 cycles complete a scanline.
        assert_eq!(gba.step(), 4);
        assert!(gba.dma.is_active());

        assert_eq!(gba.step(), 4);
        assert_eq!(gba.bus().load32(0x0200_0000), Some(0x1234_5678));
        assert_eq!(gba.interrupt_control.interrupt_request, Interrupt::Dma0.mask());
        assert!(!gba.dma.channels[0].control.enabled());
    }
}
