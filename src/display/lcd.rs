use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, I2c};
use tracing::debug;

use crate::types::MonitorError;

use super::{Backlight, Command, Line, Mode, ENABLE};

/// Delay around each enable transition.
pub const E_DELAY_US: u32 = 500;
/// Width of the enable pulse.
pub const E_PULSE_US: u32 = 500;
/// Clear display needs ~1.5 ms on the controller.
const CLEAR_SETTLE_MS: u32 = 2;

const DEFAULT_ADDRESS: u8 = 0x27;
const DEFAULT_WIDTH: usize = 20;

/// API to write to the LCD.
pub struct Lcd<I, D>
where
    I: I2c,
    D: DelayNs,
{
    i2c: I,
    delay: D,
    address: u8,
    width: usize,
    backlight: Backlight,
}

impl<I, D> Lcd<I, D>
where
    I: I2c,
    D: DelayNs,
{
    /// Create new instance owning the bus and delay provider.
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: DEFAULT_ADDRESS,
            width: DEFAULT_WIDTH,
            backlight: Backlight::On,
        }
    }

    /// Set the 7-bit I2C address of the expander (commonly 0x27 or 0x3F).
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Characters per line.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_backlight(mut self, backlight: Backlight) -> Self {
        self.backlight = backlight;
        self
    }

    /// Runs the controller's software reset into 4-bit mode.
    ///
    /// Safe to call again at any point to recover a display that lost nibble
    /// sync: the 0x33 prefix forces 8-bit mode regardless of current state.
    pub fn initialize(&mut self) -> Result<(), MonitorError> {
        for command in [
            Command::InitEightBit,
            Command::InitFourBit,
            Command::EntryModeIncrement,
            Command::DisplayOnCursorOff,
            Command::FunctionSet,
            Command::Clear,
        ] {
            self.send(command as u8, Mode::Cmd)?;
        }
        self.delay.delay_us(E_DELAY_US);
        debug!(address = self.address, width = self.width, "LCD initialized");
        Ok(())
    }

    /// Writes `text` to `line`, left-justified and padded or cut to the panel width.
    pub fn write_line(&mut self, line: Line, text: &str) -> Result<(), MonitorError> {
        let content = fit_to_width(text, self.width);
        self.send(line.ram_address(self.width), Mode::Cmd)?;
        for byte in content.bytes() {
            self.send(byte, Mode::Data)?;
        }
        Ok(())
    }

    /// Clear the display
    pub fn clear(&mut self) -> Result<(), MonitorError> {
        self.send(Command::Clear as u8, Mode::Cmd)?;
        self.delay.delay_ms(CLEAR_SETTLE_MS);
        Ok(())
    }

    /// Switch the backlight and apply it straight away.
    pub fn set_backlight(&mut self, backlight: Backlight) -> Result<(), MonitorError> {
        self.backlight = backlight;
        self.write_raw(backlight as u8)
    }

    fn send(&mut self, data: u8, mode: Mode) -> Result<(), MonitorError> {
        let high_bits = mode as u8 | (data & 0xF0) | self.backlight as u8;
        let low_bits = mode as u8 | ((data << 4) & 0xF0) | self.backlight as u8;
        self.write4bits(high_bits)?;
        self.write4bits(low_bits)?;
        Ok(())
    }

    /// Put a nibble on the bus and latch it with an enable pulse.
    fn write4bits(&mut self, bits: u8) -> Result<(), MonitorError> {
        self.write_raw(bits)?;
        self.delay.delay_us(E_DELAY_US);
        self.write_raw(bits | ENABLE)?;
        self.delay.delay_us(E_PULSE_US);
        self.write_raw(bits & !ENABLE)?;
        self.delay.delay_us(E_DELAY_US);
        Ok(())
    }

    fn write_raw(&mut self, byte: u8) -> Result<(), MonitorError> {
        self.i2c
            .write(self.address, &[byte])
            .map_err(|err| MonitorError::HardwareFault(err.kind()))
    }
}

/// Left-justify `text` in exactly `width` characters.
///
/// Anything outside printable ASCII is replaced with `?` since the controller
/// ROM has no matching glyph.
pub fn fit_to_width(text: &str, width: usize) -> String {
    let mut content: String = text
        .chars()
        .take(width)
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .collect();
    let len = content.chars().count();
    content.extend(std::iter::repeat(' ').take(width - len));
    content
}
