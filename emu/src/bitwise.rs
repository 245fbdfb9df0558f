use std::ops::RangeInclusive;

/// Contains some helper methods to manipulate bits,
/// the index (`bit_idx`) is supposed to be from lsb to msb (right to left).
pub trait Bits: Copy + Sized {
    fn is_bit_on(&self, bit_idx: u8) -> bool;

    fn set_bit_on(&mut self, bit_idx: u8);

    fn set_bit_off(&mut self, bit_idx: u8);

    fn set_bit(&mut self, bit_idx: u8, value: bool) {
        if value {
            self.set_bit_on(bit_idx);
        } else {
            self.set_bit_off(bit_idx);
        }
    }

    fn get_bit(&self, bit_idx: u8) -> bool {
        self.is_bit_on(bit_idx)
    }

    /// Returns the bits in `bits_range` moved down to position 0.
    fn get_bits(&self, bits_range: RangeInclusive<u8>) -> Self;

    /// Replaces the bits in `bits_range` with the low bits of `value`.
    fn set_bits(&mut self, bits_range: RangeInclusive<u8>, value: Self);

    fn get_byte(&self, byte_nth: u8) -> u8;

    /// Returns a sign-extended copy of the value.
    /// `number_of_bits` is the width of the two's complement value stored
    /// in the low bits.
    fn sign_extended(&self, number_of_bits: u8) -> Self;
}

macro_rules! impl_bits {
    ($($unsigned:ty => $signed:ty),* $(,)?) => {
        $(
            impl Bits for $unsigned {
                fn is_bit_on(&self, bit_idx: u8) -> bool {
                    debug_assert!(u32::from(bit_idx) < <$unsigned>::BITS);
                    (*self >> bit_idx) & 1 == 1
                }

                fn set_bit_on(&mut self, bit_idx: u8) {
                    debug_assert!(u32::from(bit_idx) < <$unsigned>::BITS);
                    *self |= 1 << bit_idx;
                }

                fn set_bit_off(&mut self, bit_idx: u8) {
                    debug_assert!(u32::from(bit_idx) < <$unsigned>::BITS);
                    *self &= !(1 << bit_idx);
                }

                fn get_bits(&self, bits_range: RangeInclusive<u8>) -> Self {
                    let start = *bits_range.start();
                    let length = u32::from(*bits_range.end() - start) + 1;
                    debug_assert!(u32::from(*bits_range.end()) < <$unsigned>::BITS);

                    // A mask made of `length` ones, the full width needs special care
                    // since shifting by the type width overflows.
                    let mask = if length >= <$unsigned>::BITS {
                        <$unsigned>::MAX
                    } else {
                        (1 << length) - 1
                    };

                    (*self >> start) & mask
                }

                fn set_bits(&mut self, bits_range: RangeInclusive<u8>, value: Self) {
                    let start = *bits_range.start();
                    let length = u32::from(*bits_range.end() - start) + 1;
                    let mask = if length >= <$unsigned>::BITS {
                        <$unsigned>::MAX
                    } else {
                        (1 << length) - 1
                    };

                    *self = (*self & !(mask << start)) | ((value & mask) << start);
                }

                fn get_byte(&self, byte_nth: u8) -> u8 {
                    debug_assert!(u32::from(byte_nth) * 8 < <$unsigned>::BITS);
                    (*self >> (u32::from(byte_nth) * 8)) as u8
                }

                fn sign_extended(&self, number_of_bits: u8) -> Self {
                    debug_assert!(number_of_bits > 0);
                    // Move the sign bit to the top and let the arithmetic shift
                    // smear it back down.
                    let unused = <$unsigned>::BITS - u32::from(number_of_bits);
                    (((*self << unused) as $signed) >> unused) as $unsigned
                }
            }
        )*
    };
}

impl_bits!(u8 => i8, u16 => i16, u32 => i32, u64 => i64);
