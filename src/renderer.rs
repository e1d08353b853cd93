use crate::memory::mmu::Mmu;
use log::trace;

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

pub type Color = [u8; 3];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Palette {
    #[default]
    White,
    LightGray,
    DarkGray,
    Black,
}

impl Palette {
    /// Maps a 2-bit color index through a palette register (BGP, OBP0, OBP1).
    pub fn from(value: u8, palette_register: u8) -> Palette {
        let shift = (value & 0b11) * 2;

        match (palette_register >> shift) & 0b11 {
            0b00 => Palette::White,
            0b01 => Palette::LightGray,
            0b10 => Palette::DarkGray,
            _ => Palette::Black,
        }
    }
}

impl From<Palette> for Color {
    fn from(palette: Palette) -> Color {
        match palette {
            Palette::White => [0xff, 0xff, 0xff],
            Palette::LightGray => [0xaa, 0xaa, 0xaa],
            Palette::DarkGray => [0x55, 0x55, 0x55],
            Palette::Black => [0x00, 0x00, 0x00],
        }
    }
}

/// One complete frame of shaded pixels, row-major.
pub type FrameBuffer = [[Palette; SCREEN_WIDTH]; SCREEN_HEIGHT];

/// Presents finished frames.
pub trait Renderer: Send {
    fn draw(&mut self, frame: &FrameBuffer);
    fn clear(&mut self);
}

/// Hardware that runs alongside the CPU (picture and sound units). Ticked after every
/// instruction with the cycles it took; returns a frame whenever one is completed.
pub trait Peripheral: Send {
    fn tick(&mut self, mmu: &mut Mmu, cycles: usize) -> Option<&FrameBuffer>;
}

/// Discards frames, keeping count of how many were presented.
#[derive(Default)]
pub struct HeadlessRenderer {
    frames: usize,
}

impl HeadlessRenderer {
    pub fn new() -> HeadlessRenderer {
        HeadlessRenderer::default()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Renderer for HeadlessRenderer {
    fn draw(&mut self, _frame: &FrameBuffer) {
        self.frames += 1;
        trace!("Renderer: Frame {}", self.frames);
    }

    fn clear(&mut self) {
        self.frames = 0;
    }
}
