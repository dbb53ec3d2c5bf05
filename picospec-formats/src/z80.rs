/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! **Z80** snapshot format utilities.
//!
//! See the format reference on [World of Spectrum](https://worldofspectrum.org/faq/reference/z80format.htm).
//!
//! ## Implementation specifics
//!
//! When reading from the **Z80** file:
//!
//! * Only the 48k and 128k hardware modes are accepted, including their Interface 1 flavours.
//! * Pages holding anything but RAM of the selected model are rejected.
//! * The version 1 end marker is recognized only at the very end of the file.
//!
//! When writing to the **Z80** file:
//!
//! * ROMs are not being saved.
//! * Version 1 files can be created only for the 48k model.
mod common;
mod compress;
mod decompress;
mod loader;
mod saver;

pub use common::Z80Version;
pub use loader::*;
pub use saver::*;
