//! Audible alerts for items that run past their limit. [GenericAlarm] is the main artifact of
//! this module, it picks the best implementation available at startup.

#[cfg(feature = "win")]
pub mod win;

#[cfg(feature = "win")]
extern crate windows;

use std::io::Write;

use ansi_term::Colour::Red;
use tracing::debug;

/// Capability for signalling an overrun. Implementations must never fail, at worst they degrade
/// to something quieter.
#[cfg_attr(test, mockall::automock)]
pub trait Alarm {
    fn alert(&self);
}

/// Rings the terminal bell.
pub struct BellAlarm;

impl Alarm for BellAlarm {
    fn alert(&self) {
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            debug!("Couldn't ring terminal bell {e:?}");
        }
    }
}

/// Prints a marker instead of making a sound.
pub struct VisualAlarm;

impl Alarm for VisualAlarm {
    fn alert(&self) {
        println!("{}", Red.bold().paint("[time limit reached]"));
    }
}

/// Serves as a cross-platform Alarm implementation.
pub struct GenericAlarm {
    inner: Box<dyn Alarm>,
}

impl GenericAlarm {
    pub fn new(silent: bool) -> Self {
        if silent {
            return Self {
                inner: Box::new(VisualAlarm),
            };
        }
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                Self {
                    inner: Box::new(win::BeepAlarm),
                }
            } else {
                Self {
                    inner: Box::new(BellAlarm),
                }
            }
        }
    }
}

impl Alarm for GenericAlarm {
    fn alert(&self) {
        self.inner.alert()
    }
}
