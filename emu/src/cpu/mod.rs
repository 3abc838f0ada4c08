pub mod hardware;

#[allow(clippy::cast_possible_truncation)]
mod opcodes;

#[allow(clippy::cast_possible_truncation)]
mod opcodes_cb;

pub mod registers;

#[allow(clippy::module_name_repetitions)]
pub mod sm83;
