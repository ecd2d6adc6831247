//! GPIO capability on a Linux character device
//!
//! [`LinuxGpio`] requests every line of a [`Pinout`] in one go when it is
//! opened and gives them back to the kernel when it is dropped, so a
//! command that opens it inside a scope releases the pins on every exit
//! path.

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use gpioflash_core::gpio::{Direction, Gpio, Level, Pin, Pinout};

/// Default GPIO character device
pub const DEFAULT_DEVICE: &str = "/dev/gpiochip0";

/// Consumer label shown by `gpioinfo` while the lines are held
const CONSUMER: &str = "gpioflash";

/// Configuration for opening the GPIO backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxGpioConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// Line assignment
    pub pins: Pinout,
}

impl Default for LinuxGpioConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            pins: Pinout::default(),
        }
    }
}

impl LinuxGpioConfig {
    /// Create a configuration for `device` with the given pinout
    pub fn new(device: impl Into<String>, pins: Pinout) -> Self {
        Self {
            device: device.into(),
            pins,
        }
    }

    /// Reject configurations that cannot be requested
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }

        let named = named_lines(&self.pins);
        for (i, &(first, line)) in named.iter().enumerate() {
            if let Some(&(second, _)) = named[i + 1..].iter().find(|&&(_, l)| l == line) {
                return Err(LinuxGpioError::DuplicateLine {
                    line,
                    first,
                    second,
                });
            }
        }
        Ok(())
    }
}

fn named_lines(pins: &Pinout) -> Vec<(&'static str, Offset)> {
    let mut named = vec![
        ("sck", pins.sck),
        ("mosi", pins.mosi),
        ("miso", pins.miso),
        ("cs", pins.cs),
        ("wp", pins.wp),
    ];
    if let Some(hold) = pins.hold {
        named.push(("hold", hold));
    }
    named
}

fn to_value(level: Level) -> Value {
    match level {
        Level::High => Value::Active,
        Level::Low => Value::Inactive,
    }
}

/// Requested line and what we last told the kernel about it
#[derive(Debug, Clone, Copy)]
struct LineState {
    offset: Offset,
    direction: Direction,
    level: Level,
}

/// GPIO lines held on a Linux GPIO chip
///
/// Implements [`Gpio`] for the bit-banged transport. Errors from the
/// kernel after open are logged and otherwise ignored.
pub struct LinuxGpio {
    /// GPIO line request handle
    request: Request,
    /// Configuration last applied to the request
    config: Config,
    lines: Vec<LineState>,
    device: String,
}

impl LinuxGpio {
    /// Request all lines of `config.pins` on `config.device`
    ///
    /// Outputs start at their idle levels: SCK and MOSI low, CS high
    /// (deselected), WP low (protected), HOLD high. MISO is an input.
    pub fn open(config: &LinuxGpioConfig) -> Result<Self> {
        config.validate()?;

        log::debug!("linux_gpio: Opening device {}", config.device);

        let pins = &config.pins;
        let mut lines = vec![
            LineState::output(pins.sck, Level::Low),
            LineState::output(pins.mosi, Level::Low),
            LineState::output(pins.cs, Level::High),
            LineState::output(pins.wp, Level::Low),
        ];
        if let Some(hold) = pins.hold {
            lines.push(LineState::output(hold, Level::High));
        }
        lines.push(LineState {
            offset: pins.miso,
            direction: Direction::Input,
            level: Level::Low,
        });

        let mut req_config = Config::default();
        for line in &lines {
            line.apply(&mut req_config);
        }

        let request = Request::from_config(req_config.clone())
            .on_chip(&config.device)
            .with_consumer(CONSUMER)
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                path: config.device.clone(),
                source,
            })?;

        log::info!(
            "linux_gpio: Opened {} (sck={}, mosi={}, miso={}, cs={}, wp={}{})",
            config.device,
            pins.sck,
            pins.mosi,
            pins.miso,
            pins.cs,
            pins.wp,
            match pins.hold {
                Some(hold) => format!(", hold={}", hold),
                None => String::new(),
            }
        );

        Ok(Self {
            request,
            config: req_config,
            lines,
            device: config.device.clone(),
        })
    }

    /// Device path the lines were requested on
    pub fn device(&self) -> &str {
        &self.device
    }

    fn line_mut(&mut self, pin: Pin) -> Option<&mut LineState> {
        let line = self.lines.iter_mut().find(|l| l.offset == pin);
        if line.is_none() {
            log::error!("linux_gpio: line {} was not requested", pin);
        }
        line
    }
}

impl LineState {
    fn output(offset: Offset, level: Level) -> Self {
        Self {
            offset,
            direction: Direction::Output,
            level,
        }
    }

    fn apply(&self, config: &mut Config) {
        let line = config.with_line(self.offset);
        match self.direction {
            Direction::Output => {
                line.as_output(to_value(self.level));
            }
            Direction::Input => {
                line.as_input();
            }
        }
    }
}

impl Gpio for LinuxGpio {
    fn set_direction(&mut self, pin: Pin, direction: Direction) {
        let Some(line) = self.line_mut(pin) else {
            return;
        };
        if line.direction == direction {
            return;
        }
        line.direction = direction;
        let line = *line;

        line.apply(&mut self.config);
        if let Err(e) = self.request.reconfigure(&self.config) {
            log::error!("Failed to set direction of line {}: {}", pin, e);
        }
    }

    fn write(&mut self, pin: Pin, level: Level) {
        let Some(line) = self.line_mut(pin) else {
            return;
        };
        line.level = level;
        if let Err(e) = self.request.set_value(pin, to_value(level)) {
            log::error!("Failed to set line {}: {}", pin, e);
        }
    }

    fn read(&mut self, pin: Pin) -> Level {
        match self.request.value(pin) {
            Ok(Value::Active) => Level::High,
            Ok(Value::Inactive) => Level::Low,
            Err(e) => {
                log::error!("Failed to get line {}: {}", pin, e);
                Level::Low
            }
        }
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

impl Drop for LinuxGpio {
    fn drop(&mut self) {
        log::debug!("linux_gpio: Releasing lines on {}", self.device);
    }
}

fn parse_line(name: &str, value: &str) -> std::result::Result<Offset, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid {} value: {}", name, value))
}

/// Parse backend options from a list of key-value pairs
///
/// # Supported Options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (default `/dev/gpiochip0`)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `sck=N`, `mosi=N`, `miso=N`, `cs=N`, `wp=N` - line offsets
/// - `hold=N` - HOLD line offset, or `hold=none` when HOLD is strapped high
///
/// Lines that are not given keep the default Raspberry Pi wiring.
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxGpioConfig, String> {
    let mut pins = Pinout::default();
    let mut device: Option<String> = None;
    let mut gpiochip: Option<u32> = None;

    for (key, value) in options {
        match *key {
            "dev" => device = Some(value.to_string()),
            "gpiochip" => {
                gpiochip = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid gpiochip value: {}", value))?,
                );
            }
            "sck" => pins.sck = parse_line(key, value)?,
            "mosi" => pins.mosi = parse_line(key, value)?,
            "miso" => pins.miso = parse_line(key, value)?,
            "cs" => pins.cs = parse_line(key, value)?,
            "wp" => pins.wp = parse_line(key, value)?,
            "hold" => {
                pins.hold = match *value {
                    "none" | "off" => None,
                    v => Some(parse_line(key, v)?),
                };
            }
            _ => {
                log::warn!("linux_gpio: Unknown option: {}={}", key, value);
            }
        }
    }

    let device = match (device, gpiochip) {
        (Some(_), Some(_)) => {
            return Err("Only one of 'dev' or 'gpiochip' can be specified".to_string());
        }
        (Some(dev), None) => dev,
        (None, Some(n)) => format!("/dev/gpiochip{}", n),
        (None, None) => DEFAULT_DEVICE.to_string(),
    };

    let config = LinuxGpioConfig { device, pins };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
