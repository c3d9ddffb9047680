use crate::{Error, Result};
use crate::config::SessionConfig;
use crate::regs::{self, ConfigCtrl, TrigCtrl};
use crate::sys::{BufferStatus, Driver};

/// Samples moved per half-buffer-ready event.
pub const HALF_BUFFER_SAMPLES: usize = regs::AI_BUFFER_SAMPLES / 2;

/// High-level handle over a [`Driver`]: bring-up, the double-buffer poll
/// protocol, and the final drain. The underlying card handle is released
/// when the device is dropped, on every exit path.
#[derive(Debug)]
pub struct Device<D: Driver> {
    driver: D,
}

impl<D: Driver> Device<D> {
    /// Scan for and register the first matching card.
    pub fn open() -> Result<Device<D>> {
        Ok(Device { driver: D::open()? })
    }

    pub fn with_driver(driver: D) -> Device<D> {
        Device { driver }
    }

    /// Program the card for continuous double-buffered differential
    /// acquisition and start it. Mirrors the vendor's required call order:
    /// config, double-buffer mode, counter intervals, continuous read.
    pub fn configure(&mut self, config: &SessionConfig) -> Result<()> {
        if config.channels.is_empty() {
            return Err(Error::NoChannels);
        }
        // post-trigger mode and software trigger source are the zero words
        self.driver.configure_ai(ConfigCtrl::DIFFERENTIAL, TrigCtrl::empty())?;
        self.driver.set_double_buffered(true)?;
        self.driver.set_intervals(config.scan_interval(), config.sample_interval())?;
        let channels = config.channels.iter()
            .map(|ch| (ch.id, ch.range.dask_code()))
            .collect::<Vec<_>>();
        self.driver.start(&channels, regs::AI_BUFFER_SAMPLES as u32)
    }

    pub fn poll(&mut self) -> Result<BufferStatus> {
        self.driver.poll()
    }

    /// Move the ready half-buffer into `buffer` and return its length.
    pub fn read_half(&mut self, buffer: &mut [i16]) -> Result<usize> {
        self.driver.transfer(&mut buffer[..HALF_BUFFER_SAMPLES])?;
        Ok(HALF_BUFFER_SAMPLES)
    }

    /// Halt the acquisition and retrieve the trailing samples into `buffer`.
    /// Returns how many are valid; the rest of `buffer` is scratch, since
    /// the driver fills up to a half-buffer no matter how many samples the
    /// clear reported.
    pub fn drain(&mut self, buffer: &mut [i16]) -> Result<usize> {
        let trailing = (self.driver.clear()? as usize).min(buffer.len());
        if trailing > 0 {
            self.driver.transfer(buffer)?;
        }
        Ok(trailing)
    }

    /// Best-effort halt after a failed poll or transfer; the original error
    /// is the one worth reporting, so this one is only logged.
    pub fn abort(&mut self) {
        if let Err(error) = self.driver.clear() {
            log::error!("abort: {}", error);
        }
    }
}
