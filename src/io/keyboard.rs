/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! The ZX Spectrum keyboard matrix.
use bitflags::bitflags;

bitflags! {
    /// The state of the ZX Spectrum keyboard, a bit is set for each pressed key.
    ///
    /// The keys are wired into 8 half-rows of 5 keys each. A half-row is selected by
    /// a zero on one of the address lines `A8`-`A15` when reading port `0xFE`:
    ///
    /// ```text
    ///  line  addr   b0  b1  b2  b3  b4
    ///    0   0xFE   CS   Z   X   C   V
    ///    1   0xFD    A   S   D   F   G
    ///    2   0xFB    Q   W   E   R   T
    ///    3   0xF7    1   2   3   4   5
    ///    4   0xEF    0   9   8   7   6
    ///    5   0xDF    P   O   I   U   Y
    ///    6   0xBF   EN   L   K   J   H
    ///    7   0x7F   BR  SS   M   N   B
    /// ```
    /// `CS` is CAPS SHIFT, `SS` is SYMBOL SHIFT, `EN` is ENTER and `BR` is SPACE (BREAK).
    ///
    /// The flag of the key in `line` at bit `b` is `1 << (8 * (4 - b) + line)`.
    #[derive(Default, Debug, PartialEq, Eq, Hash, Clone, Copy)]
    pub struct ZXKeyboardMap: u64 {
        const CS = 1 << 32;
        const Z  = 1 << 24;
        const X  = 1 << 16;
        const C  = 1 << 8;
        const V  = 1 << 0;

        const A  = 1 << 33;
        const S  = 1 << 25;
        const D  = 1 << 17;
        const F  = 1 << 9;
        const G  = 1 << 1;

        const Q  = 1 << 34;
        const W  = 1 << 26;
        const E  = 1 << 18;
        const R  = 1 << 10;
        const T  = 1 << 2;

        const N1 = 1 << 35;
        const N2 = 1 << 27;
        const N3 = 1 << 19;
        const N4 = 1 << 11;
        const N5 = 1 << 3;

        const N0 = 1 << 36;
        const N9 = 1 << 28;
        const N8 = 1 << 20;
        const N7 = 1 << 12;
        const N6 = 1 << 4;

        const P  = 1 << 37;
        const O  = 1 << 29;
        const I  = 1 << 21;
        const U  = 1 << 13;
        const Y  = 1 << 5;

        const EN = 1 << 38;
        const L  = 1 << 30;
        const K  = 1 << 22;
        const J  = 1 << 14;
        const H  = 1 << 6;

        const BR = 1 << 39;
        const SS = 1 << 31;
        const M  = 1 << 23;
        const N  = 1 << 15;
        const B  = 1 << 7;
    }
}

/// Access to the keyboard state of the emulated machine.
pub trait KeyboardInterface {
    fn get_key_state(&self) -> ZXKeyboardMap;
    fn set_key_state(&mut self, keymap: ZXKeyboardMap);
}

/// The number of keyboard half-rows.
pub const KEYBOARD_LINES: u8 = 8;
/// The mask of the key bits in a half-row.
pub const KEYS_MASK: u8 = 0b0001_1111;

impl ZXKeyboardMap {
    /// Returns the keys wired to the half-row `line` (0-7) at the positions given by `keys` mask.
    ///
    /// Out of range lines and bits above [KEYS_MASK] are ignored.
    pub fn from_contact(line: u8, keys: u8) -> Self {
        if line >= KEYBOARD_LINES {
            return ZXKeyboardMap::empty()
        }
        let bits = (0..5u32).filter(|&b| keys & (1 << b) != 0)
                            .fold(0u64, |acc, b| acc | 1 << (8 * (4 - b) + u32::from(line)));
        ZXKeyboardMap::from_bits_retain(bits)
    }
    /// Returns the state of the half-rows selected by zeroes in `line`, the high byte of the
    /// port address.
    ///
    /// A pressed key reads as `0` on its bit. Bits 5-7 are always `1`.
    pub fn read_keyboard(self, line: u8) -> u8 {
        let selected = !line;
        let bits = self.bits();
        let pressed = (0..5u32).filter(|&col| (bits >> (8 * col)) as u8 & selected != 0)
                               .fold(0u8, |acc, col| acc | 0x10 >> col);
        !pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_keyboard_works() {
        let keys = ZXKeyboardMap::empty();
        assert_eq!(keys.read_keyboard(0x00), 0xFF);
        let keys = ZXKeyboardMap::CS|ZXKeyboardMap::V|ZXKeyboardMap::H|ZXKeyboardMap::N7;
        assert_eq!(keys.read_keyboard(0xFE), 0b1110_1110);
        assert_eq!(keys.read_keyboard(0xBF), 0b1110_1111);
        assert_eq!(keys.read_keyboard(0xEF), 0b1111_0111);
        assert_eq!(keys.read_keyboard(0x7F), 0xFF);
        assert_eq!(keys.read_keyboard(0xFF), 0xFF);
        assert_eq!(keys.read_keyboard(0xAE), 0b1110_0110);
        assert_eq!(keys.read_keyboard(0x00), 0b1110_0110);
    }

    #[test]
    fn from_contact_works() {
        assert_eq!(ZXKeyboardMap::from_contact(0, 0b00001), ZXKeyboardMap::CS);
        assert_eq!(ZXKeyboardMap::from_contact(7, 0b00010), ZXKeyboardMap::SS);
        assert_eq!(ZXKeyboardMap::from_contact(1, 0b10001), ZXKeyboardMap::A|ZXKeyboardMap::G);
        assert_eq!(ZXKeyboardMap::from_contact(4, 0b11111),
                   ZXKeyboardMap::N0|ZXKeyboardMap::N9|ZXKeyboardMap::N8|ZXKeyboardMap::N7|ZXKeyboardMap::N6);
        assert_eq!(ZXKeyboardMap::from_contact(8, 1), ZXKeyboardMap::empty());
        assert_eq!(ZXKeyboardMap::from_contact(3, 0b1110_0000), ZXKeyboardMap::empty());
        for line in 0..KEYBOARD_LINES {
            for bit in 0..5 {
                let key = ZXKeyboardMap::from_contact(line, 1 << bit);
                assert_eq!(key.read_keyboard(!(1 << line)), !(1 << bit));
            }
        }
    }
}
