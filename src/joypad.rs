use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::B,
        Button::Start,
        Button::Select,
    ];
}

/// Keypad polling collaborator. The device calls `update` roughly once per frame and then
/// samples every button.
pub trait Input: Send {
    /// Refreshes the input state and returns whether any button changed.
    fn update(&mut self) -> bool;
    fn is_pressed(&self, button: Button) -> bool;
}

/// An input source with nothing attached.
pub struct NoInput;

impl Input for NoInput {
    fn update(&mut self) -> bool {
        false
    }

    fn is_pressed(&self, _button: Button) -> bool {
        false
    }
}

#[derive(Clone, Default)]
pub struct Joypad {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub b: bool,
    pub start: bool,
    pub select: bool,
}

impl Joypad {
    pub fn new() -> Joypad {
        Joypad::default()
    }

    /// Updates a button and returns whether it went from released to pressed.
    pub fn update_button(&mut self, button: Button, pressed: bool) -> bool {
        let slot = match button {
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
            Button::Left => &mut self.left,
            Button::Right => &mut self.right,
            Button::A => &mut self.a,
            Button::B => &mut self.b,
            Button::Start => &mut self.start,
            Button::Select => &mut self.select,
        };

        let newly_pressed = pressed && !*slot;
        *slot = pressed;
        newly_pressed
    }

    /// Composes the value of 0xff00 from the select bits written by the program.
    /// Lines are active-low, so a pressed button reads as 0.
    pub fn as_u8(&self, joypad_state: u8) -> u8 {
        let button_select = joypad_state & 0b0010_0000 == 0;
        let direction_select = joypad_state & 0b0001_0000 == 0;
        if button_select && direction_select {
            warn!("Joypad has buttons and d-pad mode selected");
        }

        let mut pressed = 0u8;

        if button_select {
            if self.start {
                pressed |= 0b0000_1000;
            }
            if self.select {
                pressed |= 0b0000_0100;
            }
            if self.b {
                pressed |= 0b0000_0010;
            }
            if self.a {
                pressed |= 0b0000_0001;
            }
        }
        if direction_select {
            if self.down {
                pressed |= 0b0000_1000;
            }
            if self.up {
                pressed |= 0b0000_0100;
            }
            if self.left {
                pressed |= 0b0000_0010;
            }
            if self.right {
                pressed |= 0b0000_0001;
            }
        }

        0b1100_0000 | (joypad_state & 0b0011_0000) | (!pressed & 0b0000_1111)
    }
}
