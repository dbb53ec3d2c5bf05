/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Input devices.
pub mod keyboard;

pub use keyboard::{ZXKeyboardMap, KeyboardInterface};
