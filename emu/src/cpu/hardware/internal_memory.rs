use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::bitwise::Bits;
use crate::bus::MemoryBus;

const BIOS_SIZE: usize = 0x0000_4000;
const WORKING_RAM_SIZE: usize = 0x0004_0000;
const WORKING_IRAM_SIZE: usize = 0x0000_8000;

/// Largest game pak ROM the cartridge bus can address.
pub const MAX_ROM_SIZE: usize = 0x0200_0000;

/// The memories built into the console.
#[serde_as]
#[derive(Serialize, Deserialize)]
pub struct InternalMemory {
    /// From 0x00000000 to 0x00003FFF (16 `KBytes`).
    #[serde_as(as = "Box<[_; 16384]>")]
    bios_system_rom: Box<[u8; BIOS_SIZE]>,

    /// From 0x02000000 to 0x0203FFFF (256 `KBytes`), mirrored up to 0x02FFFFFF.
    #[serde_as(as = "Box<[_; 262144]>")]
    working_ram: Box<[u8; WORKING_RAM_SIZE]>,

    /// From 0x03000000 to 0x03007FFF (32 `KBytes`), mirrored up to 0x03FFFFFF.
    #[serde_as(as = "Box<[_; 32768]>")]
    working_iram: Box<[u8; WORKING_IRAM_SIZE]>,
}

impl Default for InternalMemory {
    #[allow(clippy::large_stack_arrays)]
    fn default() -> Self {
        Self {
            bios_system_rom: Box::new([0; BIOS_SIZE]),
            working_ram: Box::new([0; WORKING_RAM_SIZE]),
            working_iram: Box::new([0; WORKING_IRAM_SIZE]),
        }
    }
}

impl InternalMemory {
    /// Internal memory with `bios` at address 0. Shorter images are zero padded.
    pub fn new(bios: &[u8]) -> Result<Self, String> {
        if bios.len() > BIOS_SIZE {
            return Err(format!(
                "BIOS image is {} bytes, the BIOS region holds {BIOS_SIZE}",
                bios.len()
            ));
        }

        let mut memory = Self::default();
        memory.bios_system_rom[..bios.len()].copy_from_slice(bios);
        Ok(memory)
    }

    pub fn bios(&mut self) -> MemoryRegion<'_> {
        MemoryRegion {
            bytes: self.bios_system_rom.as_mut_slice(),
            mirrored: false,
            writable: false,
        }
    }

    pub fn working_ram(&mut self) -> MemoryRegion<'_> {
        MemoryRegion {
            bytes: self.working_ram.as_mut_slice(),
            mirrored: true,
            writable: true,
        }
    }

    pub fn working_iram(&mut self) -> MemoryRegion<'_> {
        MemoryRegion {
            bytes: self.working_iram.as_mut_slice(),
            mirrored: true,
            writable: true,
        }
    }
}

/// A bus leaf over a byte buffer whose length is a power of two.
///
/// Mirrored regions repeat every `len` bytes across the bank, the others
/// fail past their end. Writes to read-only regions are dropped.
pub struct MemoryRegion<'a> {
    bytes: &'a mut [u8],
    mirrored: bool,
    writable: bool,
}

impl MemoryRegion<'_> {
    fn index(&self, address: u32) -> Option<usize> {
        let address = address as usize;
        if self.mirrored {
            Some(address & (self.bytes.len() - 1))
        } else {
            (address < self.bytes.len()).then_some(address)
        }
    }

    fn read<const N: usize>(&self, address: u32) -> Option<[u8; N]> {
        let mut value = [0; N];
        for (offset, byte) in (0_u32..).zip(value.iter_mut()) {
            *byte = self.bytes[self.index(address.wrapping_add(offset))?];
        }
        Some(value)
    }

    fn write(&mut self, address: u32, value: &[u8]) -> bool {
        if !self.writable {
            tracing::trace!("write to read-only memory at 0x{address:06X} ignored");
            return true;
        }

        for (offset, byte) in (0_u32..).zip(value) {
            let Some(index) = self.index(address.wrapping_add(offset)) else {
                return false;
            };
            self.bytes[index] = *byte;
        }
        true
    }
}

impl MemoryBus for MemoryRegion<'_> {
    fn load8(&mut self, address: u32) -> Option<u8> {
        self.read::<1>(address).map(|[byte]| byte)
    }

    fn load16(&mut self, address: u32) -> Option<u16> {
        self.read(address).map(u16::from_le_bytes)
    }

    fn load32(&mut self, address: u32) -> Option<u32> {
        self.read(address).map(u32::from_le_bytes)
    }

    fn store8(&mut self, address: u32, value: u8) -> bool {
        self.write(address, &[value])
    }

    fn store16(&mut self, address: u32, value: u16) -> bool {
        self.write(address, &value.to_le_bytes())
    }

    fn store32(&mut self, address: u32, value: u32) -> bool {
        self.write(address, &value.to_le_bytes())
    }
}

/// A ROM image mapped on the game pak bus, offsets relative to the start of
/// a 32 MB window.
#[derive(Debug, Clone)]
pub struct GamePakRom {
    data: Vec<u8>,
}

impl GamePakRom {
    pub fn new(data: Vec<u8>) -> Result<Self, String> {
        if data.len() > MAX_ROM_SIZE {
            return Err(format!(
                "ROM image is {} bytes, the game pak bus addresses at most {MAX_ROM_SIZE}",
                data.len()
            ));
        }
        Ok(Self { data })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn byte_at(&self, address: u32) -> u8 {
        self.data.get(address as usize).copied().unwrap_or_else(|| {
            // The game pak multiplexes the low 16 bits of the halfword address
            // and the data on the same lines. Past the end of the ROM nothing
            // drives the data, so the address is read back instead.
            (((address >> 1) & 0xFFFF) as u16).get_byte((address & 1) as u8)
        })
    }
}

impl MemoryBus for GamePakRom {
    fn load8(&mut self, address: u32) -> Option<u8> {
        Some(self.byte_at(address))
    }

    fn load16(&mut self, address: u32) -> Option<u16> {
        Some(u16::from_le_bytes([
            self.byte_at(address),
            self.byte_at(address.wrapping_add(1)),
        ]))
    }

    fn load32(&mut self, address: u32) -> Option<u32> {
        let low = self.load16(address)?;
        let high = self.load16(address.wrapping_add(2))?;
        Some(u32::from(low) | (u32::from(high) << 16))
    }

    fn store8(&mut self, _address: u32, _value: u8) -> bool {
        true
    }

    fn store16(&mut self, _address: u32, _value: u16) -> bool {
        true
    }

    fn store32(&mut self, _address: u32, _value: u32) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_work_ram() {
        let mut im = InternalMemory::default();
        assert!(im.working_iram().store8(0x0000_0005, 5));
        assert_eq!(im.working_iram[5], 5);

        assert!(im.working_iram().store8(0x0000_7FFF, 5));
        assert_eq!(im.working_iram[0x7FFF], 5);
    }

    #[test]
    fn test_read_work_ram() {
        let mut im = InternalMemory::default();
        im.working_iram[5] = 10;
        im.working_iram[6] = 0x20;
        im.working_iram[7] = 0x01;
        assert_eq!(im.working_iram().load8(5), Some(10));
        assert_eq!(im.working_iram().load16(0x0000_8006), Some(0x0120));
    }

    #[test]
    fn test_bios_is_read_only() {
        let mut im = InternalMemory::new(&[0x01, 0x02, 0x03, 0x04]).unwrap();
        assert_eq!(im.bios().load32(0), Some(0x0403_0201));

        assert!(im.bios().store8(0x0000_01EC, 10));
        assert_eq!(im.bios().load8(0x0000_01EC), Some(0));
        assert_eq!(im.bios().load8(0x0000_4000), None);
    }

    #[test]
    fn test_bios_size_is_checked() {
        assert!(InternalMemory::new(&vec![0; BIOS_SIZE + 1]).is_err());
        assert!(InternalMemory::new(&vec![0; BIOS_SIZE]).is_ok());
    }

    #[test]
    fn test_read_rom() {
        let mut rom = GamePakRom::new(vec![1, 2, 3, 4]).unwrap();
        assert_eq!(rom.load8(0), Some(1));
        assert_eq!(rom.load32(0), Some(0x0403_0201));

        // Reading past the end of the ROM returns the address.
        assert_eq!(rom.load8(0x01FF_FFFF), Some(0xFF));
        assert_eq!(rom.load8(0x01FF_FFEE), Some(0xF7));
        assert_eq!(rom.load8(0x01FF_FFEF), Some(0xFF));
        assert_eq!(rom.load16(0x0000_0010), Some(0x0008));

        assert!(rom.store8(0, 0xFF));
        assert_eq!(rom.load8(0), Some(1));
    }

    #[test]
    fn test_mirror_wram() {
        let mut im = InternalMemory::default();
        im.working_ram[0x01_0003] = 5;

        assert_eq!(im.working_ram().load8(0x01_0003), Some(5));
        assert_eq!(im.working_ram().load8(0x05_0003), Some(5));
        assert_eq!(im.working_ram().load8(0x35_0003), Some(5));
        assert_eq!(im.working_ram().load8(0xF5_0003), Some(5));

        im.working_ram().store8(0x05_0003, 1);
        assert_eq!(im.working_ram[0x01_0003], 1);

        im.working_ram().store8(0xF5_003F, 1);
        assert_eq!(im.working_ram[0x01_003F], 1);
    }

    #[test]
    fn test_mirror_iram() {
        let mut im = InternalMemory::default();
        im.working_iram[0x21FF] = 5;

        assert_eq!(im.working_iram().load8(0x00_21FF), Some(5));
        assert_eq!(im.working_iram().load8(0x00_A1FF), Some(5));
        assert_eq!(im.working_iram().load8(0x01_21FF), Some(5));
        assert_eq!(im.working_iram().load8(0xFF_A1FF), Some(5));

        im.working_iram().store8(0x01_71FF, 10);
        assert_eq!(im.working_iram[0x71FF], 10);

        im.working_iram().store8(0xFF_F1FF, 1);
        assert_eq!(im.working_iram[0x71FF], 1);
    }
}
