use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptFlags: u8 {
        const VBLANK    = 0b00001;
        const LCD_STAT  = 0b00010;
        const TIMER     = 0b00100;
        const SERIAL    = 0b01000;
        const JOYPAD    = 0b10000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerControl: u8 {
        const CLOCK_SELECT = 0b011;
        const ENABLED      = 0b100;
    }
}

impl From<u8> for InterruptFlags {
    fn from(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }
}

impl From<u8> for TimerControl {
    fn from(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }
}

impl InterruptFlags {
    /// The pending source with the highest priority (lowest bit).
    pub fn highest_priority(&self) -> Option<InterruptFlags> {
        if self.is_empty() {
            None
        } else {
            Some(InterruptFlags::from_bits_truncate(1 << self.bits().trailing_zeros()))
        }
    }
}

impl TimerControl {
    /// Bit of the internal counter whose falling edge clocks TIMA.
    pub fn counter_bit(&self) -> u16 {
        match self.bits() & TimerControl::CLOCK_SELECT.bits() {
            0b00 => 9,
            0b01 => 3,
            0b10 => 5,
            _ => 7,
        }
    }
}
