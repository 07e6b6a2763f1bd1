//! Status LED strip.

use crate::hardware::LedStrip;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const ORANGE: Rgb = Rgb(255, 127, 0);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const GREEN: Rgb = Rgb(0, 255, 0);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
    pub const INDIGO: Rgb = Rgb(75, 0, 130);
    pub const VIOLET: Rgb = Rgb(148, 0, 211);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Look up one of the predefined colours by name.
    pub fn named(name: &str) -> Option<Rgb> {
        match name {
            "black" => Some(Self::BLACK),
            "red" => Some(Self::RED),
            "orange" => Some(Self::ORANGE),
            "yellow" => Some(Self::YELLOW),
            "green" => Some(Self::GREEN),
            "blue" => Some(Self::BLUE),
            "indigo" => Some(Self::INDIGO),
            "violet" => Some(Self::VIOLET),
            "white" => Some(Self::WHITE),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedConfig {
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_brightness")]
    pub brightness: u8,
    /// Wire order of the colour bytes, e.g. `GRB` for WS2812.
    #[serde(default = "default_sequence")]
    pub sequence: String,
}

fn default_count() -> usize {
    8
}

fn default_brightness() -> u8 {
    255
}

fn default_sequence() -> String {
    "GRB".to_string()
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            brightness: default_brightness(),
            sequence: default_sequence(),
        }
    }
}

/// Byte offsets of red, green and blue within one LED's three bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColorOffsets {
    red: usize,
    green: usize,
    blue: usize,
}

impl ColorOffsets {
    fn parse(sequence: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidColorSequence(sequence.to_string());
        if sequence.len() != 3 {
            return Err(invalid());
        }
        let red = sequence.find('R').ok_or_else(invalid)?;
        let green = sequence.find('G').ok_or_else(invalid)?;
        let blue = sequence.find('B').ok_or_else(invalid)?;
        Ok(Self { red, green, blue })
    }
}

/// Per-LED colour and brightness in front of an [`LedStrip`].
pub struct LedCtrl {
    strip: Box<dyn LedStrip>,
    offsets: ColorOffsets,
    colors: Vec<Rgb>,
    brightness: Vec<u8>,
    default_brightness: u8,
}

impl LedCtrl {
    /// Validate the colour sequence and show the initial (dark) frame.
    pub fn new(strip: Box<dyn LedStrip>, config: &LedConfig) -> Result<Self> {
        let offsets = ColorOffsets::parse(&config.sequence)?;
        let mut ctrl = Self {
            strip,
            offsets,
            colors: vec![Rgb::BLACK; config.count],
            brightness: vec![config.brightness; config.count],
            default_brightness: config.brightness,
        };
        ctrl.show()?;
        Ok(ctrl)
    }

    pub fn count(&self) -> usize {
        self.colors.len()
    }

    pub fn set_all(&mut self, color: Rgb) -> Result<()> {
        debug!(target: "rasptank::led", "All LEDs -> {:?}", color);
        self.colors.fill(color);
        self.show()
    }

    pub fn set_brightness(&mut self, brightness: u8) -> Result<()> {
        self.brightness.fill(brightness);
        self.show()
    }

    /// Update one LED without pushing a frame.
    pub fn set_one(&mut self, index: usize, color: Rgb) -> Result<()> {
        let count = self.count();
        let slot = self
            .colors
            .get_mut(index)
            .ok_or(CoreError::InvalidLedIndex { index, count })?;
        *slot = color;
        Ok(())
    }

    /// Back to dark at the configured brightness.
    pub fn reset(&mut self) -> Result<()> {
        self.colors.fill(Rgb::BLACK);
        self.brightness.fill(self.default_brightness);
        self.show()
    }

    pub fn off(&mut self) -> Result<()> {
        self.set_all(Rgb::BLACK)
    }

    /// Turn the strip off and release it.
    pub fn close(&mut self) -> Result<()> {
        let result = self.off();
        self.strip.close();
        result
    }

    /// Scale every colour by its LED's brightness and push the frame.
    pub fn show(&mut self) -> Result<()> {
        let frame = self.frame();
        self.strip.write(&frame)
    }

    fn frame(&self) -> Vec<u8> {
        let mut frame = vec![0u8; self.colors.len() * 3];
        for (i, (color, &brightness)) in self.colors.iter().zip(&self.brightness).enumerate() {
            let scale = |c: u8| (f64::from(c) * f64::from(brightness) / 255.0).round() as u8;
            let base = i * 3;
            frame[base + self.offsets.red] = scale(color.0);
            frame[base + self.offsets.green] = scale(color.1);
            frame[base + self.offsets.blue] = scale(color.2);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedController;

    fn config(sequence: &str) -> LedConfig {
        LedConfig {
            count: 2,
            brightness: 255,
            sequence: sequence.to_string(),
        }
    }

    #[test]
    fn test_invalid_sequences_rejected() {
        let sim = SimulatedController::new();
        for bad in ["RGX", "RG", "RGBB", "rgb", ""] {
            let result = LedCtrl::new(Box::new(sim.led_strip()), &config(bad));
            assert!(
                matches!(result, Err(CoreError::InvalidColorSequence(_))),
                "sequence {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_initial_frame_is_dark() {
        let sim = SimulatedController::new();
        let _leds = LedCtrl::new(Box::new(sim.led_strip()), &config("GRB")).unwrap();
        assert_eq!(sim.led_frame(), vec![0; 6]);
    }

    #[test]
    fn test_frame_uses_wire_order() {
        let sim = SimulatedController::new();
        let mut leds = LedCtrl::new(Box::new(sim.led_strip()), &config("GRB")).unwrap();
        leds.set_all(Rgb(10, 20, 30)).unwrap();
        assert_eq!(sim.led_frame(), vec![20, 10, 30, 20, 10, 30]);

        let sim = SimulatedController::new();
        let mut leds = LedCtrl::new(Box::new(sim.led_strip()), &config("BGR")).unwrap();
        leds.set_all(Rgb(10, 20, 30)).unwrap();
        assert_eq!(&sim.led_frame()[..3], &[30, 20, 10]);
    }

    #[test]
    fn test_brightness_scales_frame() {
        let sim = SimulatedController::new();
        let mut leds = LedCtrl::new(Box::new(sim.led_strip()), &config("RGB")).unwrap();
        leds.set_all(Rgb::WHITE).unwrap();
        leds.set_brightness(51).unwrap();
        assert_eq!(sim.led_frame(), vec![51; 6]);

        leds.reset().unwrap();
        assert_eq!(sim.led_frame(), vec![0; 6]);
        leds.set_all(Rgb::RED).unwrap();
        assert_eq!(&sim.led_frame()[..3], &[255, 0, 0]);
    }

    #[test]
    fn test_set_one_bounds() {
        let sim = SimulatedController::new();
        let mut leds = LedCtrl::new(Box::new(sim.led_strip()), &config("RGB")).unwrap();
        leds.set_one(1, Rgb::BLUE).unwrap();
        leds.show().unwrap();
        assert_eq!(sim.led_frame(), vec![0, 0, 0, 0, 0, 255]);
        assert!(matches!(
            leds.set_one(2, Rgb::BLUE),
            Err(CoreError::InvalidLedIndex { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_close_turns_off_and_releases() {
        let sim = SimulatedController::new();
        let mut leds = LedCtrl::new(Box::new(sim.led_strip()), &config("GRB")).unwrap();
        leds.set_all(Rgb::GREEN).unwrap();
        leds.close().unwrap();
        assert_eq!(sim.led_frame(), vec![0; 6]);
        assert!(sim.led_closed());
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(Rgb::named("orange"), Some(Rgb::ORANGE));
        assert_eq!(Rgb::named("mauve"), None);
    }
}
