//! Typed session configuration built once from the command line.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};
use crate::regs;

/// The USB-1901 scans at most 8 channels per acquisition.
pub const MAX_CHANNELS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoltageRange {
    MilliVolt200,
    Volt1,
    Volt2,
    Volt10,
}

impl VoltageRange {
    /// Map the `-c ID:RANGE` selector digit to a range.
    pub fn from_selector(selector: u8) -> Option<VoltageRange> {
        match selector {
            0 => Some(VoltageRange::MilliVolt200),
            1 => Some(VoltageRange::Volt1),
            2 => Some(VoltageRange::Volt2),
            3 => Some(VoltageRange::Volt10),
            _ => None,
        }
    }

    pub fn dask_code(self) -> u16 {
        match self {
            VoltageRange::MilliVolt200 => regs::AD_B_0_2_V,
            VoltageRange::Volt1        => regs::AD_B_1_V,
            VoltageRange::Volt2        => regs::AD_B_2_V,
            VoltageRange::Volt10       => regs::AD_B_10_V,
        }
    }

    pub fn from_dask_code(code: u16) -> Option<VoltageRange> {
        match code {
            regs::AD_B_0_2_V => Some(VoltageRange::MilliVolt200),
            regs::AD_B_1_V   => Some(VoltageRange::Volt1),
            regs::AD_B_2_V   => Some(VoltageRange::Volt2),
            regs::AD_B_10_V  => Some(VoltageRange::Volt10),
            _ => None,
        }
    }

    /// Full-scale voltage of the range.
    pub fn full_scale(self) -> f64 {
        match self {
            VoltageRange::MilliVolt200 => 0.2,
            VoltageRange::Volt1        => 1.0,
            VoltageRange::Volt2        => 2.0,
            VoltageRange::Volt10       => 10.0,
        }
    }
}

impl fmt::Display for VoltageRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VoltageRange::MilliVolt200 => write!(f, "±0.2V"),
            VoltageRange::Volt1        => write!(f, "±1V"),
            VoltageRange::Volt2        => write!(f, "±2V"),
            VoltageRange::Volt10       => write!(f, "±10V"),
        }
    }
}

/// One sampled channel: hardware channel id plus its voltage range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub id: u16,
    pub range: VoltageRange,
}

impl FromStr for ChannelConfig {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<ChannelConfig, String> {
        let (id, range) = s.split_once(':')
            .ok_or_else(|| format!("expected <id>:<range>, got '{}'", s))?;
        let id: u16 = id.trim().parse()
            .map_err(|_| format!("bad channel id '{}'", id))?;
        if id > 15 {
            return Err(format!("channel id {} out of range 0..=15", id));
        }
        let selector: u8 = range.trim().parse()
            .map_err(|_| format!("bad range selector '{}'", range))?;
        let range = VoltageRange::from_selector(selector)
            .ok_or_else(|| format!("range selector {} out of range 0..=3", selector))?;
        Ok(ChannelConfig { id, range })
    }
}

/// Ordered channel sequence. The order defines the round-robin interleaving
/// used both to program the card and to de-interleave raw buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTable {
    channels: Vec<ChannelConfig>,
}

impl ChannelTable {
    pub fn new(channels: Vec<ChannelConfig>) -> Result<ChannelTable> {
        if channels.is_empty() {
            return Err(Error::NoChannels);
        }
        if channels.len() > MAX_CHANNELS {
            return Err(Error::TooManyChannels);
        }
        Ok(ChannelTable { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.iter()
    }
}

/// Everything one acquisition session needs, owned for its whole lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub output: PathBuf,
    /// Requested scan rate in Hz. The card quantizes this to an integer
    /// number of timebase cycles; see [`SessionConfig::effective_rate`].
    pub sample_rate: u32,
    /// `None` means "record until externally signalled".
    pub duration: Option<Duration>,
    pub channels: ChannelTable,
}

impl SessionConfig {
    /// Timebase cycles between successive scans of the channel set.
    pub fn scan_interval(&self) -> u32 {
        (regs::TIMEBASE_HZ / self.sample_rate).max(1)
    }

    /// Cycles between individual A/D conversions within one scan.
    pub fn sample_interval(&self) -> u32 {
        if self.channels.len() == 1 {
            regs::SAMPLE_INTERVAL_MIN
        } else {
            regs::SAMPLE_INTERVAL_MULTI
        }
    }

    /// The scan rate the card will actually run at, after the integer
    /// division of the timebase by the requested rate.
    pub fn effective_rate(&self) -> f64 {
        regs::TIMEBASE_HZ as f64 / self.scan_interval() as f64
    }
}
