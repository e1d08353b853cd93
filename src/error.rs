use crate::lr35902::sm83::Instruction;
use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DmgError {
    #[snafu(display("Failed to decode instruction ({:02x}) at address: ${:04x}", opcode, address))]
    DecoderFailure { opcode: u8, address: u16 },
    #[snafu(display("Invalid instruction handler implementation: {}", instruction))]
    InvalidHandler { instruction: Instruction },
    #[snafu(display("Boot image must be {} bytes, got {}", expected, actual))]
    InvalidBootImage { expected: usize, actual: usize },
    #[snafu(display("Unsupported cartridge type: ${:02x}", cartridge_type))]
    UnsupportedMapper { cartridge_type: u8 },
    #[snafu(display("Cartridge image too small: {} bytes", size))]
    CartridgeTooSmall { size: usize },
    #[snafu(display("A write observer is already registered for ${:04x}", address))]
    ObserverAlreadyRegistered { address: u16 },
    #[snafu(display("Write observers are only supported in the I/O page, got ${:04x}", address))]
    UnobservableAddress { address: u16 },
    #[snafu(display("No ROM image found in archive {}", path))]
    MissingRom { path: String },
    #[snafu(display("I/O error on {}: {}", path, source))]
    Io { path: String, source: std::io::Error },
    #[snafu(display("Failed to read archive {}: {}", path, source))]
    Zip { path: String, source: zip::result::ZipError },
    #[snafu(display("Failed to set up logger: {}", source))]
    Logger { source: log::SetLoggerError },
}
