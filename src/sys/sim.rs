//! Simulated UD-DASK driver used when the `hardware` feature is disabled.
//!
//! Synthesizes a per-channel sine wave paced against the wall clock at the
//! programmed scan rate, so the poll/transfer/clear protocol behaves like
//! the real card and the whole pipeline can run without one.

use std::f64::consts::TAU;
use std::time::Instant;

use crate::{Error, Result};
use crate::regs::{self, ConfigCtrl, TrigCtrl};
use super::{BufferStatus, Driver};

/// Peak amplitude of the synthesized wave, in raw codes (quarter scale).
const AMPLITUDE: f64 = 8192.0;

/// Base tone frequency in Hz; each channel slot gets a higher multiple.
const BASE_TONE_HZ: f64 = 10.0;

#[derive(Debug)]
pub struct SimDriverImpl {
    started: Option<Instant>,
    scan_interval: u32,
    channels: Vec<(u16, u16)>,
    read_count: u32,
    /// Samples handed to the client so far; also the stream position of the
    /// next sample `transfer` will synthesize.
    consumed: u64,
}

impl SimDriverImpl {
    fn scan_rate(&self) -> f64 {
        regs::TIMEBASE_HZ as f64 / self.scan_interval.max(1) as f64
    }

    /// Samples produced by the virtual card since the acquisition started.
    fn available(&self) -> u64 {
        match self.started {
            Some(started) => {
                let scans = started.elapsed().as_secs_f64() * self.scan_rate();
                scans as u64 * self.channels.len() as u64
            }
            None => 0,
        }
    }

    fn sample(&self, index: u64) -> i16 {
        let channels = self.channels.len().max(1) as u64;
        let time = (index / channels) as f64 / self.scan_rate();
        let slot = (index % channels) as usize;
        let tone = BASE_TONE_HZ * (slot + 1) as f64;
        (AMPLITUDE * (TAU * tone * time).sin()) as i16
    }
}

impl Driver for SimDriverImpl {
    fn open() -> Result<SimDriverImpl> {
        log::debug!("sim: open()");
        Ok(SimDriverImpl {
            started: None,
            scan_interval: regs::TIMEBASE_HZ / 200,
            channels: Vec::new(),
            read_count: regs::AI_BUFFER_SAMPLES as u32,
            consumed: 0,
        })
    }

    fn configure_ai(&mut self, config: ConfigCtrl, trigger: TrigCtrl) -> Result<()> {
        log::debug!("sim: configure_ai({:?}, {:?})", config, trigger);
        Ok(())
    }

    fn set_double_buffered(&mut self, enabled: bool) -> Result<()> {
        log::debug!("sim: set_double_buffered({})", enabled);
        Ok(())
    }

    fn set_intervals(&mut self, scan: u32, sample: u32) -> Result<()> {
        log::debug!("sim: set_intervals(scan = {}, sample = {})", scan, sample);
        self.scan_interval = scan;
        Ok(())
    }

    fn start(&mut self, channels: &[(u16, u16)], read_count: u32) -> Result<()> {
        if channels.is_empty() {
            return Err(Error::NoChannels);
        }
        log::debug!("sim: start({:?}, {})", channels, read_count);
        self.channels = channels.to_vec();
        self.read_count = read_count;
        self.consumed = 0;
        self.started = Some(Instant::now());
        Ok(())
    }

    fn poll(&mut self) -> Result<BufferStatus> {
        let half = self.read_count as u64 / 2;
        Ok(BufferStatus {
            half_ready: self.available() >= self.consumed + half,
            stopped: self.started.is_none(),
        })
    }

    fn transfer(&mut self, data: &mut [i16]) -> Result<()> {
        for (index, slot) in data.iter_mut().enumerate() {
            *slot = self.sample(self.consumed + index as u64);
        }
        self.consumed += data.len() as u64;
        Ok(())
    }

    fn clear(&mut self) -> Result<u32> {
        let trailing = self.available()
            .saturating_sub(self.consumed)
            .min(self.read_count as u64 / 2);
        log::debug!("sim: clear() -> {} trailing samples", trailing);
        self.started = None;
        Ok(trailing as u32)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn started_sim(channels: usize) -> SimDriverImpl {
        let mut sim = SimDriverImpl::open().unwrap();
        let channels = (0..channels as u16)
            .map(|id| (id, regs::AD_B_10_V))
            .collect::<Vec<_>>();
        sim.start(&channels, regs::AI_BUFFER_SAMPLES as u32).unwrap();
        sim
    }

    #[test]
    fn test_stream_is_continuous_across_transfers() {
        let mut sim = started_sim(2);
        let mut first = [0i16; 8];
        let mut second = [0i16; 8];
        sim.transfer(&mut first).unwrap();
        sim.transfer(&mut second).unwrap();
        let mut fresh = started_sim(2);
        let mut whole = [0i16; 16];
        fresh.transfer(&mut whole).unwrap();
        assert_eq!(&whole[..8], &first);
        assert_eq!(&whole[8..], &second);
    }

    #[test]
    fn test_first_scan_starts_at_zero_crossing() {
        let mut sim = started_sim(3);
        let mut data = [1i16; 3];
        sim.transfer(&mut data).unwrap();
        assert_eq!(data, [0, 0, 0]);
    }

    #[test]
    fn test_not_ready_at_one_scan_per_second() {
        let mut sim = SimDriverImpl::open().unwrap();
        sim.set_intervals(regs::TIMEBASE_HZ, regs::SAMPLE_INTERVAL_MIN).unwrap();
        sim.start(&[(0, regs::AD_B_10_V)], regs::AI_BUFFER_SAMPLES as u32).unwrap();
        let status = sim.poll().unwrap();
        assert!(!status.half_ready);
        assert!(!status.stopped);
    }

    #[test]
    fn test_clear_stops_the_stream() {
        let mut sim = started_sim(1);
        sim.clear().unwrap();
        let status = sim.poll().unwrap();
        assert!(status.stopped);
        assert!(!status.half_ready);
    }

    #[test]
    fn test_start_with_no_channels_is_an_error() {
        let mut sim = SimDriverImpl::open().unwrap();
        assert!(matches!(sim.start(&[], 128), Err(Error::NoChannels)));
    }
}
