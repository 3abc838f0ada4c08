pub mod interrupts;
pub mod joypad;
pub mod ppu;
pub mod serial;
pub mod timer;
