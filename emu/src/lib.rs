#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
mod bitwise;

#[allow(clippy::missing_panics_doc)]
#[allow(clippy::cast_lossless)]
#[allow(clippy::unreadable_literal)]
pub mod bus;

pub mod cartridge;
pub mod cpu;
pub mod gameboy;
pub mod machine;
pub mod render;
