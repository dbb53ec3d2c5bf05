/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    PICOSPEC is free software: you can redistribute it and/or modify it under
    the terms of the GNU Lesser General Public License (LGPL) as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    PICOSPEC is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
/*! # PICOSPEC

The ZX Spectrum 48k/128k emulator host layer: banked memory, I/O port decoding, **Z80** snapshots,
**TAP** tape loading, real time pacing and keyboard input.

The CPU instruction interpreter is not a part of this library: any type implementing
[Cpu][cpu::Cpu] can be plugged into [ZxSpectrum].

```no_run
use picospec::{ZxSpectrum, SpectrumConfig, clock::InstantClock, model::ComputerModel};
# use picospec::cpu::{Cpu, Io, Memory, Z80Registers};
# #[derive(Default)] struct MyCpu;
# impl Cpu for MyCpu {
#     fn reset(&mut self) {}
#     fn step<B: Memory + Io>(&mut self, _bus: &mut B) -> u32 { 4 }
#     fn interrupt(&mut self) {}
#     fn registers(&self) -> Z80Registers { Z80Registers::default() }
#     fn set_registers(&mut self, _regs: &Z80Registers) {}
# }
let config = SpectrumConfig::default().with_model(ComputerModel::Spectrum128);
let mut spectrum = ZxSpectrum::new(MyCpu::default(), InstantClock::default(), config);
spectrum.load_rom(ComputerModel::Spectrum128, &std::fs::read("128.rom")?)?;
spectrum.reset(ComputerModel::Spectrum128);
spectrum.load_tap(std::fs::read("game.tap")?)?;
loop {
    spectrum.run_frame();
    // render spectrum.screen_ref() and spectrum.border_color()
}
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub mod bus;
pub mod config;
pub mod io;
mod spectrum;

pub use picospec_core::{chip, clock, cpu, memory, model, video};
pub use picospec_formats as formats;

pub use config::SpectrumConfig;
pub use spectrum::ZxSpectrum;
