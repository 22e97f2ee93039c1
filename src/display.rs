//! HD44780 character LCD driven in 4-bit mode through a PCF8574-style I2C
//! GPIO expander.
//!
//! Each expander write sets eight lines at once:
//!
//! | bit | 7..4 | 3 | 2 | 1 | 0 |
//! |---|---|---|---|---|---|
//! | line | D7..D4 | backlight | enable | R/W | RS |
//!
//! A byte reaches the controller as two nibbles, high nibble first, each
//! latched by pulsing the enable line.

mod lcd;

pub use lcd::{fit_to_width, Lcd, E_DELAY_US, E_PULSE_US};

/// Backlight control bit. Carried on every byte written to the expander.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Backlight {
    Off = 0x00,
    On = 0x08,
}

impl From<bool> for Backlight {
    fn from(on: bool) -> Self {
        if on {
            Backlight::On
        } else {
            Backlight::Off
        }
    }
}

/// Register select: command register or data register.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    Cmd = 0x00,
    Data = 0x01,
}

/// Enable (strobe) bit on the expander.
pub const ENABLE: u8 = 0b0000_0100;

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    Clear = 0x01,
    /// Two 0x3 nibbles: force 8-bit mode from any state.
    InitEightBit = 0x33,
    /// 0x3 then 0x2: drop into 4-bit mode.
    InitFourBit = 0x32,
    /// Cursor moves right, no display shift.
    EntryModeIncrement = 0x06,
    /// Display on, cursor off, blink off.
    DisplayOnCursorOff = 0x0C,
    /// 4-bit bus, two line mode, 5x8 font.
    FunctionSet = 0x28,
    SetDdramAddress = 0x80,
}

/// The four rows of a 4-line display.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Line {
    One,
    Two,
    Three,
    Four,
}

impl Line {
    pub const ALL: [Line; 4] = [Line::One, Line::Two, Line::Three, Line::Four];

    /// DDRAM "set address" command for the first column of this line.
    ///
    /// Lines 3 and 4 continue lines 1 and 2 in controller memory, so their
    /// offset depends on the panel width (0x94/0xD4 on a 20 column panel).
    pub fn ram_address(self, width: usize) -> u8 {
        let width = width.min(0x40) as u8;
        let offset = match self {
            Line::One => 0x00,
            Line::Two => 0x40,
            Line::Three => width,
            Line::Four => 0x40 + width,
        };
        Command::SetDdramAddress as u8 | offset
    }

    pub fn number(self) -> u8 {
        match self {
            Line::One => 1,
            Line::Two => 2,
            Line::Three => 3,
            Line::Four => 4,
        }
    }
}

impl TryFrom<u8> for Line {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Line::One),
            2 => Ok(Line::Two),
            3 => Ok(Line::Three),
            4 => Ok(Line::Four),
            other => Err(other),
        }
    }
}
