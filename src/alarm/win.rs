use tracing::debug;
use windows::Win32::System::Diagnostics::Debug::Beep;

use super::{Alarm, BellAlarm};

const BEEP_FREQUENCY_HZ: u32 = 1000;
const BEEP_DURATION_MS: u32 = 150;

/// Plays a short tone through the system speaker. Falls back to the terminal bell when no audio
/// device is available.
pub struct BeepAlarm;

impl Alarm for BeepAlarm {
    fn alert(&self) {
        if let Err(e) = unsafe { Beep(BEEP_FREQUENCY_HZ, BEEP_DURATION_MS) } {
            debug!("Beep failed, using terminal bell {e:?}");
            BellAlarm.alert();
        }
    }
}
