//! GPIO backend selection
//!
//! The `--gpio` argument names a backend and its options:
//! `linux_gpio:gpiochip=0,cs=27`, `dummy`, or just the options
//! (`cs=27,wp=22`), which go to the Linux backend.

use gpioflash_core::device::BusInterface;
use gpioflash_core::transport::{self, FlashBus};
use thiserror::Error;

/// Backend used when `--gpio` carries only options
const DEFAULT_BACKEND: &str = "linux_gpio";

/// Backend information for help output
pub struct BackendInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

/// Backends compiled into this binary
pub fn available_backends() -> Vec<BackendInfo> {
    #[allow(unused_mut)]
    let mut backends = Vec::new();

    #[cfg(feature = "linux-gpio")]
    backends.push(BackendInfo {
        name: "linux_gpio",
        aliases: &["linux-gpio", "gpiochip"],
        description: "Linux GPIO character device (/dev/gpiochipN)",
    });

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        aliases: &[],
        description: "Emulated W25Q128 on virtual lines (contents are discarded on exit)",
    });

    backends
}

/// Errors choosing a backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unknown GPIO backend '{name}'. Available:\n{available}")]
    Unknown { name: String, available: String },
}

fn find_backend(name: &str) -> Option<&'static str> {
    available_backends()
        .into_iter()
        .find(|b| b.name == name || b.aliases.contains(&name))
        .map(|b| b.name)
}

/// Split a `--gpio` string into backend name and options
pub fn parse_gpio_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    let (name, opts) = match s.split_once(':') {
        Some((name, opts)) => (name, opts),
        None if s.contains('=') => (DEFAULT_BACKEND, s),
        None => (s, ""),
    };
    let options = opts
        .split(',')
        .filter_map(|opt| opt.split_once('='))
        .collect();
    (name, options)
}

/// Open the backend named by `gpio`, build the bus, and run `f` on it
///
/// The GPIO lines are held only for the duration of `f`.
#[allow(unused_variables)]
pub fn with_bus<F>(
    gpio: &str,
    interface: BusInterface,
    f: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut dyn FlashBus) -> Result<(), Box<dyn std::error::Error>>,
{
    let (name, options) = parse_gpio_string(gpio);

    let canonical = find_backend(name).ok_or_else(|| BackendError::Unknown {
        name: name.to_string(),
        available: available_backends()
            .iter()
            .map(|b| format!("  {:12} {}", b.name, b.description))
            .collect::<Vec<_>>()
            .join("\n"),
    })?;

    match canonical {
        #[cfg(feature = "linux-gpio")]
        "linux_gpio" => {
            let (gpio, pins) = gpioflash_linux_gpio::open_linux_gpio(&options).map_err(|e| {
                format!(
                    "Failed to open GPIO: {}\nCheck the device path and that you may access /dev/gpiochipN.",
                    e
                )
            })?;
            log::debug!("Driving {} on {}", interface, gpio.device());
            let mut bus = transport::open(interface, gpio, pins);
            f(bus.as_mut())
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            if !options.is_empty() {
                log::warn!("dummy: options ignored");
            }
            let mut chip = gpioflash_dummy::DummyChip::new_default();
            let pins = chip.config().pins;
            let mut bus = transport::open(interface, &mut chip, pins);
            f(bus.as_mut())
        }

        _ => Err(BackendError::Unknown {
            name: name.to_string(),
            available: String::new(),
        }
        .into()),
    }
}
