/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! USB HID boot protocol keyboard reports.
//!
//! Each report carries a modifier byte and up to six codes of keys held down. [HidKeyboard]
//! turns a report into the state of the ZX Spectrum keyboard. Keys missing from the Spectrum
//! keyboard are mapped to a combination of Spectrum keys, e.g. `BACKSPACE` presses
//! `CAPS SHIFT` + `0` and `,` presses `SYMBOL SHIFT` + `N`.
//!
//! Function keys trigger commands, only when pressed, holding a key down repeats nothing:
//!
//! | key | command                  | key  | command                |
//! |-----|--------------------------|------|------------------------|
//! | F1  | open menu                | F10  | next snapshot          |
//! | F3  | toggle mute              | F11  | reset to 48k           |
//! | F4  | toggle pacing            | F12  | reset to 128k          |
//! | F8  | current snapshot         | F13  | quick save to slot 0   |
//! | F9  | previous snapshot        | F14  | quick load from slot 0 |
//!
//! With `CTRL` held, F1-F12 quick save to slots 0-11. With the left `ALT` held, F1-F12 quick load
//! from slots 0-11.
//!
//! In the kiosk mode the menu, snapshot navigation and quick save commands are disabled
//! and the save modifier is ignored, so function keys pressed with it act as without it.
use core::fmt;

use bitflags::bitflags;
use log::{debug, warn};

use picospec::io::ZXKeyboardMap;
use picospec::model::ComputerModel;

use super::{HidTarget, QuickSave, SnapshotList};

/// HID keyboard usage codes.
pub mod keycodes {
    pub const HID_KEY_NONE: u8 = 0x00;
    /// Reported in all key slots when too many keys are pressed.
    pub const HID_KEY_ROLLOVER: u8 = 0x01;
    pub const HID_KEY_A: u8 = 0x04;
    pub const HID_KEY_B: u8 = 0x05;
    pub const HID_KEY_C: u8 = 0x06;
    pub const HID_KEY_D: u8 = 0x07;
    pub const HID_KEY_E: u8 = 0x08;
    pub const HID_KEY_F: u8 = 0x09;
    pub const HID_KEY_G: u8 = 0x0A;
    pub const HID_KEY_H: u8 = 0x0B;
    pub const HID_KEY_I: u8 = 0x0C;
    pub const HID_KEY_J: u8 = 0x0D;
    pub const HID_KEY_K: u8 = 0x0E;
    pub const HID_KEY_L: u8 = 0x0F;
    pub const HID_KEY_M: u8 = 0x10;
    pub const HID_KEY_N: u8 = 0x11;
    pub const HID_KEY_O: u8 = 0x12;
    pub const HID_KEY_P: u8 = 0x13;
    pub const HID_KEY_Q: u8 = 0x14;
    pub const HID_KEY_R: u8 = 0x15;
    pub const HID_KEY_S: u8 = 0x16;
    pub const HID_KEY_T: u8 = 0x17;
    pub const HID_KEY_U: u8 = 0x18;
    pub const HID_KEY_V: u8 = 0x19;
    pub const HID_KEY_W: u8 = 0x1A;
    pub const HID_KEY_X: u8 = 0x1B;
    pub const HID_KEY_Y: u8 = 0x1C;
    pub const HID_KEY_Z: u8 = 0x1D;
    pub const HID_KEY_1: u8 = 0x1E;
    pub const HID_KEY_2: u8 = 0x1F;
    pub const HID_KEY_3: u8 = 0x20;
    pub const HID_KEY_4: u8 = 0x21;
    pub const HID_KEY_5: u8 = 0x22;
    pub const HID_KEY_6: u8 = 0x23;
    pub const HID_KEY_7: u8 = 0x24;
    pub const HID_KEY_8: u8 = 0x25;
    pub const HID_KEY_9: u8 = 0x26;
    pub const HID_KEY_0: u8 = 0x27;
    pub const HID_KEY_ENTER: u8 = 0x28;
    pub const HID_KEY_BACKSPACE: u8 = 0x2A;
    pub const HID_KEY_SPACE: u8 = 0x2C;
    pub const HID_KEY_MINUS: u8 = 0x2D;
    pub const HID_KEY_EQUAL: u8 = 0x2E;
    pub const HID_KEY_EUROPE_1: u8 = 0x32;
    pub const HID_KEY_SEMICOLON: u8 = 0x33;
    pub const HID_KEY_APOSTROPHE: u8 = 0x34;
    pub const HID_KEY_COMMA: u8 = 0x36;
    pub const HID_KEY_PERIOD: u8 = 0x37;
    pub const HID_KEY_SLASH: u8 = 0x38;
    pub const HID_KEY_F1: u8 = 0x3A;
    pub const HID_KEY_F2: u8 = 0x3B;
    pub const HID_KEY_F3: u8 = 0x3C;
    pub const HID_KEY_F4: u8 = 0x3D;
    pub const HID_KEY_F5: u8 = 0x3E;
    pub const HID_KEY_F6: u8 = 0x3F;
    pub const HID_KEY_F7: u8 = 0x40;
    pub const HID_KEY_F8: u8 = 0x41;
    pub const HID_KEY_F9: u8 = 0x42;
    pub const HID_KEY_F10: u8 = 0x43;
    pub const HID_KEY_F11: u8 = 0x44;
    pub const HID_KEY_F12: u8 = 0x45;
    pub const HID_KEY_PAUSE: u8 = 0x48;
    pub const HID_KEY_ARROW_RIGHT: u8 = 0x4F;
    pub const HID_KEY_ARROW_LEFT: u8 = 0x50;
    pub const HID_KEY_ARROW_DOWN: u8 = 0x51;
    pub const HID_KEY_ARROW_UP: u8 = 0x52;
    pub const HID_KEY_F13: u8 = 0x68;
    pub const HID_KEY_F14: u8 = 0x69;
    pub const HID_KEY_SHIFT_LEFT: u8 = 0xE1;
    pub const HID_KEY_SHIFT_RIGHT: u8 = 0xE5;
    pub const HID_KEY_ALT_RIGHT: u8 = 0xE6;
}

use keycodes::*;

bitflags! {
    /// The modifier byte of a HID keyboard report.
    #[derive(Default, Debug, PartialEq, Eq, Hash, Clone, Copy)]
    pub struct HidModifiers: u8 {
        const LEFT_CTRL   = 0x01;
        const LEFT_SHIFT  = 0x02;
        const LEFT_ALT    = 0x04;
        const LEFT_GUI    = 0x08;
        const RIGHT_CTRL  = 0x10;
        const RIGHT_SHIFT = 0x20;
        const RIGHT_ALT   = 0x40;
        const RIGHT_GUI   = 0x80;

        const SHIFT = Self::LEFT_SHIFT.bits() | Self::RIGHT_SHIFT.bits();
        /// Function keys save to quick save slots.
        const SAVE  = Self::LEFT_CTRL.bits() | Self::RIGHT_CTRL.bits();
        /// Function keys load from quick save slots.
        const LOAD  = Self::LEFT_ALT.bits();
    }
}

/// A USB HID boot protocol keyboard report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HidKeyboardReport {
    pub modifier: u8,
    pub reserved: u8,
    pub keycode: [u8; 6],
}

/// The number of function keys tracked, F1-F14.
pub const FUNCTION_KEYS: usize = 14;
/// The number of quick save slots addressable with function keys.
pub const QUICK_SLOTS: u8 = 12;

const FUNCTION_KEY_CODES: [u8; FUNCTION_KEYS] = [
    HID_KEY_F1, HID_KEY_F2, HID_KEY_F3, HID_KEY_F4, HID_KEY_F5, HID_KEY_F6, HID_KEY_F7,
    HID_KEY_F8, HID_KEY_F9, HID_KEY_F10, HID_KEY_F11, HID_KEY_F12, HID_KEY_F13, HID_KEY_F14
];

const FN_MENU: u16           = 1 << 0;
const FN_MUTE: u16           = 1 << 2;
const FN_MODERATE: u16       = 1 << 3;
const FN_SNAPSHOT_CURR: u16  = 1 << 7;
const FN_SNAPSHOT_PREV: u16  = 1 << 8;
const FN_SNAPSHOT_NEXT: u16  = 1 << 9;
const FN_RESET_48: u16       = 1 << 10;
const FN_RESET_128: u16      = 1 << 11;
const FN_QUICK_SAVE: u16     = 1 << 12;
const FN_QUICK_LOAD: u16     = 1 << 13;

const B0: u8 = 0x01;
const B1: u8 = 0x02;
const B2: u8 = 0x04;
const B3: u8 = 0x08;
const B4: u8 = 0x10;

/// Host keys and the Spectrum keyboard contacts they close: `(half-row line, key bits)`.
///
/// See [ZXKeyboardMap] for the line numbering.
const KEY_CONTACTS: &[(u8, &[(u8, u8)])] = &[
    (HID_KEY_SHIFT_LEFT,  &[(0, B0)]),
    (HID_KEY_SHIFT_RIGHT, &[(0, B0)]),
    (HID_KEY_Z,           &[(0, B1)]),
    (HID_KEY_X,           &[(0, B2)]),
    (HID_KEY_C,           &[(0, B3)]),
    (HID_KEY_V,           &[(0, B4)]),

    (HID_KEY_A,           &[(1, B0)]),
    (HID_KEY_S,           &[(1, B1)]),
    (HID_KEY_D,           &[(1, B2)]),
    (HID_KEY_F,           &[(1, B3)]),
    (HID_KEY_G,           &[(1, B4)]),

    (HID_KEY_Q,           &[(2, B0)]),
    (HID_KEY_W,           &[(2, B1)]),
    (HID_KEY_E,           &[(2, B2)]),
    (HID_KEY_R,           &[(2, B3)]),
    (HID_KEY_T,           &[(2, B4)]),

    (HID_KEY_1,           &[(3, B0)]),
    (HID_KEY_2,           &[(3, B1)]),
    (HID_KEY_3,           &[(3, B2)]),
    (HID_KEY_4,           &[(3, B3)]),
    (HID_KEY_5,           &[(3, B4)]),

    (HID_KEY_0,           &[(4, B0)]),
    (HID_KEY_9,           &[(4, B1)]),
    (HID_KEY_8,           &[(4, B2)]),
    (HID_KEY_7,           &[(4, B3)]),
    (HID_KEY_6,           &[(4, B4)]),

    (HID_KEY_P,           &[(5, B0)]),
    (HID_KEY_O,           &[(5, B1)]),
    (HID_KEY_I,           &[(5, B2)]),
    (HID_KEY_U,           &[(5, B3)]),
    (HID_KEY_Y,           &[(5, B4)]),

    (HID_KEY_ENTER,       &[(6, B0)]),
    (HID_KEY_L,           &[(6, B1)]),
    (HID_KEY_K,           &[(6, B2)]),
    (HID_KEY_J,           &[(6, B3)]),
    (HID_KEY_H,           &[(6, B4)]),

    (HID_KEY_SPACE,       &[(7, B0)]),
    (HID_KEY_ALT_RIGHT,   &[(7, B1)]),
    (HID_KEY_M,           &[(7, B2)]),
    (HID_KEY_N,           &[(7, B3)]),
    (HID_KEY_B,           &[(7, B4)]),

    (HID_KEY_BACKSPACE,   &[(0, B0), (4, B0)]),
    (HID_KEY_PAUSE,       &[(0, B0), (7, B0)]),
    (HID_KEY_COMMA,       &[(7, B1), (7, B3)]),
    (HID_KEY_PERIOD,      &[(7, B1), (7, B2)]),
    (HID_KEY_SLASH,       &[(7, B1), (0, B4)]),
    (HID_KEY_SEMICOLON,   &[(7, B1), (5, B1)]),
    (HID_KEY_APOSTROPHE,  &[(7, B1), (4, B3)]),
    (HID_KEY_MINUS,       &[(7, B1), (6, B3)]),
    (HID_KEY_EQUAL,       &[(7, B1), (6, B1)]),
    (HID_KEY_EUROPE_1,    &[(7, B1), (3, B2)]),

    (HID_KEY_ARROW_LEFT,  &[(0, B0), (3, B4)]),
    (HID_KEY_ARROW_DOWN,  &[(0, B0), (4, B4)]),
    (HID_KEY_ARROW_UP,    &[(0, B0), (4, B3)]),
    (HID_KEY_ARROW_RIGHT, &[(0, B0), (4, B2)]),
];

/// A host key and the Spectrum keys it presses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HidKey {
    pub keycode: u8,
    pub keys: ZXKeyboardMap,
}

/// Translates HID keyboard reports into the ZX Spectrum keyboard state and commands.
pub struct HidKeyboard<T: ?Sized> {
    keys: Vec<HidKey>,
    kiosk: bool,
    quick_save: Option<Box<dyn QuickSave<T>>>,
    snapshot_list: Option<Box<dyn SnapshotList<T>>>,
}

impl HidKeyboardReport {
    pub fn new(modifier: HidModifiers, keycodes: &[u8]) -> Self {
        let mut keycode = [HID_KEY_NONE; 6];
        for (p, &code) in keycode.iter_mut().zip(keycodes) {
            *p = code;
        }
        HidKeyboardReport { modifier: modifier.bits(), reserved: 0, keycode }
    }
    /// Returns a report signalling that too many keys are pressed.
    pub fn rollover() -> Self {
        HidKeyboardReport { modifier: 0, reserved: 0, keycode: [HID_KEY_ROLLOVER; 6] }
    }

    pub fn modifiers(&self) -> HidModifiers {
        HidModifiers::from_bits_retain(self.modifier)
    }

    pub fn is_rollover(&self) -> bool {
        self.keycode[0] == HID_KEY_ROLLOVER
    }

    pub fn contains(&self, keycode: u8) -> bool {
        self.keycode.contains(&keycode)
    }
    /// Returns a bit mask of function keys held down (F1 at bit 0) and a mask of those among them
    /// that were not held down in the `prev` report.
    pub fn function_keys(&self, prev: &HidKeyboardReport) -> (u16, u16) {
        let mut down = 0;
        let mut pressed = 0;
        for (n, &code) in FUNCTION_KEY_CODES.iter().enumerate() {
            if self.contains(code) {
                down |= 1 << n;
                if !prev.contains(code) {
                    pressed |= 1 << n;
                }
            }
        }
        (down, pressed)
    }
}

impl<T: ?Sized> fmt::Debug for HidKeyboard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidKeyboard")
            .field("keys", &self.keys.len())
            .field("kiosk", &self.kiosk)
            .field("quick_save", &self.quick_save.is_some())
            .field("snapshot_list", &self.snapshot_list.is_some())
            .finish()
    }
}

impl<T: ?Sized> Default for HidKeyboard<T> {
    fn default() -> Self {
        HidKeyboard::new()
    }
}

impl<T: ?Sized> HidKeyboard<T> {
    /// Creates a keyboard mapper without quick save and snapshot list services.
    pub fn new() -> Self {
        let mut keys: Vec<HidKey> = KEY_CONTACTS.iter().map(|&(keycode, contacts)| {
            let keys = contacts.iter().fold(ZXKeyboardMap::empty(), |keys, &(line, bits)| {
                keys | ZXKeyboardMap::from_contact(line, bits)
            });
            HidKey { keycode, keys }
        }).collect();
        keys.sort_unstable_by_key(|key| key.keycode);
        HidKeyboard { keys, kiosk: false, quick_save: None, snapshot_list: None }
    }

    pub fn with_kiosk(mut self, kiosk: bool) -> Self {
        self.kiosk = kiosk;
        self
    }

    pub fn with_quick_save(mut self, quick_save: Box<dyn QuickSave<T>>) -> Self {
        self.quick_save = Some(quick_save);
        self
    }

    pub fn with_snapshot_list(mut self, snapshot_list: Box<dyn SnapshotList<T>>) -> Self {
        self.snapshot_list = Some(snapshot_list);
        self
    }

    pub fn is_kiosk(&self) -> bool {
        self.kiosk
    }
    /// Returns the mapping table ordered by key codes.
    pub fn keys(&self) -> &[HidKey] {
        &self.keys
    }
    /// Returns the Spectrum keys pressed by the host key `keycode`.
    pub fn find_key(&self, keycode: u8) -> Option<ZXKeyboardMap> {
        if keycode <= HID_KEY_ROLLOVER {
            return None
        }
        self.keys.binary_search_by_key(&keycode, |key| key.keycode)
                 .ok()
                 .map(|index| self.keys[index].keys)
    }
    /// Returns the state of the Spectrum keyboard for the given `report`.
    pub fn keymap(&self, report: &HidKeyboardReport) -> ZXKeyboardMap {
        if report.is_rollover() {
            return ZXKeyboardMap::empty()
        }
        let mods = report.modifiers();
        let mut keymap = ZXKeyboardMap::empty();
        if mods.intersects(HidModifiers::SHIFT) {
            keymap |= ZXKeyboardMap::CS;
        }
        if mods.contains(HidModifiers::RIGHT_ALT) {
            keymap |= ZXKeyboardMap::SS;
        }
        report.keycode.iter().filter_map(|&code| self.find_key(code))
                             .fold(keymap, |keymap, keys| keymap | keys)
    }
}

impl<T: HidTarget + ?Sized> HidKeyboard<T> {
    /// Updates the keyboard of the `target` from the `report` and executes commands of
    /// the function keys pressed since the `prev` report.
    ///
    /// A rollover report releases all keys and executes nothing.
    ///
    /// Returns `true` if the menu should be opened.
    pub fn process_hid_report(
            &mut self,
            target: &mut T,
            report: &HidKeyboardReport,
            prev: &HidKeyboardReport
        ) -> bool
    {
        target.set_key_state(self.keymap(report));
        if report.is_rollover() {
            return false
        }
        let (_, pressed) = report.function_keys(prev);
        if pressed == 0 {
            return false
        }
        let mods = report.modifiers();
        if mods.intersects(HidModifiers::SAVE) && !self.kiosk {
            self.quick_slots(target, pressed, true);
            return false
        }
        if mods.intersects(HidModifiers::LOAD) {
            self.quick_slots(target, pressed, false);
            return false
        }

        let menu = pressed & FN_MENU != 0 && !self.kiosk;
        if pressed & FN_MUTE != 0 {
            let muted = target.toggle_mute();
            debug!("HID: muted: {}", muted);
        }
        if pressed & FN_MODERATE != 0 {
            let moderated = target.toggle_moderate();
            debug!("HID: moderated: {}", moderated);
        }
        if pressed & FN_RESET_48 != 0 {
            debug!("HID: reset 48k");
            target.reset(ComputerModel::Spectrum48);
        }
        if pressed & FN_RESET_128 != 0 {
            debug!("HID: reset 128k");
            target.reset(ComputerModel::Spectrum128);
        }
        if pressed & FN_QUICK_SAVE != 0 && !self.kiosk {
            self.quick_slots(target, 1, true);
        }
        if pressed & FN_QUICK_LOAD != 0 {
            self.quick_slots(target, 1, false);
        }
        if !self.kiosk {
            self.snapshot_nav(target, pressed);
        }
        menu
    }

    fn quick_slots(&mut self, target: &mut T, slots: u16, save: bool) {
        let quick_save = match self.quick_save.as_mut() {
            Some(quick_save) => quick_save,
            None => return
        };
        for slot in (0..QUICK_SLOTS).filter(|slot| slots & (1 << slot) != 0) {
            debug!("HID: quick {} slot: {}", if save { "save" } else { "load" }, slot);
            let res = if save {
                quick_save.save(target, slot)
            }
            else {
                quick_save.load(target, slot)
            };
            if let Err(e) = res {
                warn!("HID: quick save slot {}: {}", slot, e);
            }
        }
    }

    fn snapshot_nav(&mut self, target: &mut T, pressed: u16) {
        let list = match self.snapshot_list.as_mut() {
            Some(list) => list,
            None => return
        };
        for &key in &[FN_SNAPSHOT_CURR, FN_SNAPSHOT_PREV, FN_SNAPSHOT_NEXT] {
            if pressed & key == 0 {
                continue
            }
            let res = match key {
                FN_SNAPSHOT_CURR => list.curr(target),
                FN_SNAPSHOT_PREV => list.prev(target),
                _ => list.next(target)
            };
            if let Err(e) = res {
                warn!("HID: snapshot list: {}", e);
            }
        }
    }
}
