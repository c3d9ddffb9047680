//! The acquisition loop: poll the driver, feed ready half-buffers through
//! the sample sink, and stop on the requested duration or an external
//! signal. The loop is the sole owner of the device, the sink and the
//! transfer buffer for the session's lifetime.

use std::io::Write;
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::Result;
use crate::config::SessionConfig;
use crate::convert::SampleSink;
use crate::device::{Device, HALF_BUFFER_SAMPLES};
use crate::regs;
use crate::sys::Driver;

/// Sleep per poll iteration while waiting for the driver to fill a half
/// buffer. Cancellation is checked at the same cadence.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Session totals, reported once the loop has drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total_samples: usize,
    pub trailing_samples: usize,
    pub elapsed: Duration,
}

/// Run one acquisition session to completion.
///
/// Exits when `config.duration` elapses, or in unbounded mode when `stop`
/// returns true; either way the acquisition is cleared and the trailing
/// samples are processed. Driver errors are fatal: the acquisition is halted
/// best-effort and the error propagates to the caller, which maps it to an
/// exit code. The device handle itself is released by drop.
pub fn record<D, W, S>(
    device: &mut Device<D>,
    sink: &mut SampleSink<W>,
    config: &SessionConfig,
    mut stop: S,
) -> Result<Summary>
    where D: Driver, W: Write, S: FnMut() -> bool
{
    let mut buffer = vec![0i16; regs::AI_BUFFER_SAMPLES];
    let started = Instant::now();
    let mut total = 0;
    loop {
        sleep(POLL_INTERVAL);

        let status = match device.poll() {
            Ok(status) => status,
            Err(error) => {
                device.abort();
                return Err(error);
            }
        };
        if status.stopped {
            log::debug!("driver reports acquisition stopped");
        }

        if status.half_ready {
            println!("Buffer half ready, writing {} samples to '{}'...",
                HALF_BUFFER_SAMPLES, config.output.display());
            if let Err(error) = device.read_half(&mut buffer) {
                device.abort();
                return Err(error);
            }
            match sink.process(&buffer[..HALF_BUFFER_SAMPLES]) {
                Ok(report) => report.print(),
                Err(error) => {
                    device.abort();
                    return Err(error);
                }
            }
            total += HALF_BUFFER_SAMPLES;
        }

        match config.duration {
            Some(duration) if started.elapsed() > duration => break,
            None if stop() => break,
            _ => {}
        }
    }

    // halt the card and pick up whatever it buffered since the last transfer
    let trailing = device.drain(&mut buffer)?;
    let elapsed = started.elapsed();
    println!("Writing the last {} samples out of {} to '{}'. Total duration {:.3} s.",
        trailing, total + trailing, config.output.display(), elapsed.as_secs_f64());
    if trailing > 0 {
        sink.process(&buffer[..trailing])?.print();
    }
    sink.flush()?;

    Ok(Summary { total_samples: total + trailing, trailing_samples: trailing, elapsed })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Error, Result};
    use crate::config::{ChannelConfig, ChannelTable, VoltageRange};
    use crate::regs::{ConfigCtrl, TrigCtrl};
    use crate::sys::BufferStatus;

    use std::cell::Cell;
    use std::rc::Rc;

    /// Scripted driver: hands out a fixed number of ready half-buffers of
    /// incrementing codes, then goes quiet. `clear` reports a configurable
    /// trailing count and keeps a call count the test can watch.
    #[derive(Debug)]
    struct ScriptedDriver {
        ready_halves: usize,
        trailing: u32,
        position: i16,
        poll_fails: bool,
        clears: Rc<Cell<usize>>,
    }

    impl ScriptedDriver {
        fn new(ready_halves: usize, trailing: u32) -> ScriptedDriver {
            ScriptedDriver {
                ready_halves, trailing, position: 0, poll_fails: false,
                clears: Rc::new(Cell::new(0)),
            }
        }
    }

    impl Driver for ScriptedDriver {
        fn open() -> Result<ScriptedDriver> {
            Ok(ScriptedDriver::new(0, 0))
        }

        fn configure_ai(&mut self, _: ConfigCtrl, _: TrigCtrl) -> Result<()> { Ok(()) }
        fn set_double_buffered(&mut self, _: bool) -> Result<()> { Ok(()) }
        fn set_intervals(&mut self, _: u32, _: u32) -> Result<()> { Ok(()) }
        fn start(&mut self, _: &[(u16, u16)], _: u32) -> Result<()> { Ok(()) }

        fn poll(&mut self) -> Result<BufferStatus> {
            if self.poll_fails {
                return Err(Error::Acquire { op: "UD_AI_AsyncDblBufferHalfReady", code: -6 });
            }
            Ok(BufferStatus { half_ready: self.ready_halves > 0, stopped: false })
        }

        fn transfer(&mut self, data: &mut [i16]) -> Result<()> {
            self.ready_halves = self.ready_halves.saturating_sub(1);
            for slot in data.iter_mut() {
                *slot = self.position;
                self.position = self.position.wrapping_add(1);
            }
            Ok(())
        }

        fn clear(&mut self) -> Result<u32> {
            self.clears.set(self.clears.get() + 1);
            Ok(self.trailing)
        }
    }

    fn config(duration: Option<Duration>) -> SessionConfig {
        SessionConfig {
            output: "data.csv".into(),
            sample_rate: 200,
            duration,
            channels: ChannelTable::new(vec![
                ChannelConfig { id: 0, range: VoltageRange::Volt10 },
                ChannelConfig { id: 1, range: VoltageRange::Volt10 },
            ]).unwrap(),
        }
    }

    fn sink(config: &SessionConfig) -> SampleSink<Vec<u8>> {
        SampleSink::new(Vec::new(), &config.channels).unwrap()
    }

    #[test]
    fn test_duration_bounds_the_run() {
        let config = config(Some(Duration::from_millis(35)));
        let mut device = Device::with_driver(ScriptedDriver::new(0, 0));
        let mut sink = sink(&config);
        let started = Instant::now();
        let summary = record(&mut device, &mut sink, &config, || false).unwrap();
        let elapsed = started.elapsed();
        assert_eq!(summary.total_samples, 0);
        assert!(elapsed >= Duration::from_millis(35));
        // small bounded overshoot only
        assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
    }

    #[test]
    fn test_stop_signal_ends_unbounded_run() {
        let config = config(None);
        let mut device = Device::with_driver(ScriptedDriver::new(0, 0));
        let mut sink = sink(&config);
        let mut polls = 0;
        let summary = record(&mut device, &mut sink, &config, || {
            polls += 1;
            polls >= 3
        }).unwrap();
        assert_eq!(summary.total_samples, 0);
        assert_eq!(polls, 3);
    }

    #[test]
    fn test_half_buffers_and_trailing_are_accumulated() {
        let config = config(Some(Duration::from_millis(25)));
        let mut device = Device::with_driver(ScriptedDriver::new(1, 4));
        let mut sink = sink(&config);
        let summary = record(&mut device, &mut sink, &config, || false).unwrap();
        assert_eq!(summary.total_samples, HALF_BUFFER_SAMPLES + 4);
        assert_eq!(summary.trailing_samples, 4);
        // two channels per row, one full row per completed cycle
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.lines().count(), (HALF_BUFFER_SAMPLES + 4) / 2);
    }

    #[test]
    fn test_poll_error_is_fatal_and_clears() {
        let config = config(Some(Duration::from_millis(100)));
        let mut driver = ScriptedDriver::new(0, 0);
        driver.poll_fails = true;
        let clears = Rc::clone(&driver.clears);
        let mut device = Device::with_driver(driver);
        let mut sink = sink(&config);
        let result = record(&mut device, &mut sink, &config, || false);
        assert!(matches!(result,
            Err(Error::Acquire { op: "UD_AI_AsyncDblBufferHalfReady", code: -6 })));
        assert_eq!(clears.get(), 1);
    }

    #[test]
    fn test_output_error_is_fatal_and_clears() {
        /// Fails every write, like a full disk under the output file.
        struct FailingWriter;
        impl Write for FailingWriter {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
        }

        let config = config(Some(Duration::from_millis(100)));
        let driver = ScriptedDriver::new(1, 0);
        let clears = Rc::clone(&driver.clears);
        let mut device = Device::with_driver(driver);
        let mut sink = SampleSink::new(FailingWriter, &config.channels).unwrap();
        let result = record(&mut device, &mut sink, &config, || false);
        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(clears.get(), 1);
    }

    #[test]
    fn test_offset_carries_between_half_buffer_and_drain() {
        // 10240 samples over 3 channels leaves a remainder of 1
        let config = SessionConfig {
            channels: ChannelTable::new(vec![
                ChannelConfig { id: 0, range: VoltageRange::Volt10 },
                ChannelConfig { id: 1, range: VoltageRange::Volt10 },
                ChannelConfig { id: 2, range: VoltageRange::Volt10 },
            ]).unwrap(),
            ..config(Some(Duration::from_millis(25)))
        };
        let mut device = Device::with_driver(ScriptedDriver::new(1, 2));
        let mut sink = SampleSink::new(Vec::new(), &config.channels).unwrap();
        record(&mut device, &mut sink, &config, || false).unwrap();
        assert_eq!(sink.offset(), (HALF_BUFFER_SAMPLES + 2) % 3);
    }
}
