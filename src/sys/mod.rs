use crate::Result;
use crate::regs::{ConfigCtrl, TrigCtrl};

/// Double-buffer status as reported by the driver poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStatus {
    pub half_ready: bool,
    pub stopped: bool,
}

/// The polled double-buffered acquisition contract of the UD-DASK driver.
///
/// Call order mirrors the vendor API: `open` (scan + register), then
/// `configure_ai`, `set_double_buffered`, `set_intervals`, `start`; after
/// that `poll`/`transfer` until `clear`, which halts the acquisition and
/// reports the trailing unread sample count. The handle is released on drop.
pub trait Driver {
    fn open() -> Result<Self> where Self: Sized;

    /// Program wiring mode and trigger setup.
    fn configure_ai(&mut self, config: ConfigCtrl, trigger: TrigCtrl) -> Result<()>;

    fn set_double_buffered(&mut self, enabled: bool) -> Result<()>;

    /// Program the scan and conversion intervals, in timebase cycles.
    fn set_intervals(&mut self, scan: u32, sample: u32) -> Result<()>;

    /// Start the continuous read over `channels` of `(id, range code)` pairs,
    /// with `read_count` samples per double buffer.
    fn start(&mut self, channels: &[(u16, u16)], read_count: u32) -> Result<()>;

    fn poll(&mut self) -> Result<BufferStatus>;

    /// Move ready samples into `data`. The driver may fill up to a whole
    /// half-buffer regardless of how many samples are meaningful, so `data`
    /// must never be shorter than a half-buffer on the hardware path; after
    /// `clear`, only the trailing count it reported is valid.
    fn transfer(&mut self, data: &mut [i16]) -> Result<()>;

    /// Halt the acquisition; returns the number of trailing unread samples.
    fn clear(&mut self) -> Result<u32>;
}

#[cfg(feature = "hardware")]
#[path = "dask.rs"]
pub mod imp;

#[cfg(not(feature = "hardware"))]
#[path = "sim.rs"]
pub mod imp;
