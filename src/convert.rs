//! Converts raw sample codes to volts and writes delimited rows.
//!
//! The card interleaves samples across the configured channels in round-robin
//! order, and a transfer need not end on a channel-cycle boundary; the
//! rotation offset carried inside [`SampleSink`] keeps the alignment across
//! buffers. Row boundaries follow channel cycles only, never buffer
//! boundaries.

use std::io::Write;

use crate::{Error, Result};
use crate::config::{ChannelTable, VoltageRange};

/// The device delivers signed 16-bit codes with 15 bits of magnitude.
const CODE_SCALE: f64 = (1 << 15) as f64;

/// Full-scale voltage for a raw UD-DASK range code.
///
/// An unknown code means the device is misconfigured. Since this runs per
/// channel inside the per-buffer conversion loop, it degrades to 0.0 V and
/// logs the fault instead of aborting an acquisition already in flight.
pub fn full_scale_volts(code: u16) -> f64 {
    match VoltageRange::from_dask_code(code) {
        Some(range) => range.full_scale(),
        None => {
            log::error!("unknown AD range code {:#06x}", code);
            0.0
        }
    }
}

/// Format like C `printf("%e")`: six fractional digits and a signed exponent
/// of at least two digits. The output file format depends on this exactly.
fn format_exp(value: f64) -> String {
    let formatted = format!("{:.6e}", value);
    // `{:.6e}` emits `5.000000e-1`; pad the exponent to the `e-01` form
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            format!("{}e{:+03}", mantissa, exponent)
        }
        None => formatted,
    }
}

/// Per-buffer channel averages. The sums are local to one `process` call;
/// the reported average covers that buffer only, not the whole session.
#[derive(Debug, Clone)]
pub struct BufferReport {
    ids: Vec<u16>,
    sums: Vec<f64>,
    samples_per_channel: usize,
}

impl BufferReport {
    pub fn average(&self, index: usize) -> f64 {
        self.sums[index] / self.samples_per_channel as f64
    }

    /// True when the buffer held less than one full channel cycle, so no
    /// average exists.
    pub fn is_empty(&self) -> bool {
        self.samples_per_channel == 0
    }

    /// One human-readable line per channel on the console. Stays silent for
    /// a buffer too short to average over.
    pub fn print(&self) {
        if self.is_empty() {
            return;
        }
        for (index, &id) in self.ids.iter().enumerate() {
            println!("  Channel {} average {} V.", id, format_exp(self.average(index)));
        }
    }
}

/// Consumes raw buffers, appends voltage rows to the output, and carries the
/// rotation offset from one buffer to the next.
#[derive(Debug)]
pub struct SampleSink<W: Write> {
    out: W,
    /// Volts per LSB, one entry per configured channel.
    scale: Vec<f64>,
    ids: Vec<u16>,
    /// Channel index the next raw sample belongs to.
    offset: usize,
}

impl<W: Write> SampleSink<W> {
    pub fn new(out: W, channels: &ChannelTable) -> Result<SampleSink<W>> {
        if channels.is_empty() {
            return Err(Error::NoChannels);
        }
        let scale = channels.iter()
            .map(|ch| full_scale_volts(ch.range.dask_code()) / CODE_SCALE)
            .collect();
        let ids = channels.iter().map(|ch| ch.id).collect();
        Ok(SampleSink { out, scale, ids, offset: 0 })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Convert one buffer of interleaved samples and append the rows.
    ///
    /// `raw` holds the logical sample count, which on the final drain is
    /// shorter than the transfer capacity. Advances the rotation offset by
    /// `raw.len() mod channel_count` and returns the per-buffer statistics.
    pub fn process(&mut self, raw: &[i16]) -> Result<BufferReport> {
        let count = self.scale.len();
        let mut sums = vec![0.0f64; count];
        for (index, &code) in raw.iter().enumerate() {
            let channel = (index + self.offset) % count;
            let volts = code as f64 * self.scale[channel];
            sums[channel] += volts;
            if channel + 1 == count {
                write!(self.out, "{}\n", format_exp(volts))?;
            } else {
                write!(self.out, "{},\t", format_exp(volts))?;
            }
        }
        self.offset = (self.offset + raw.len()) % count;
        Ok(BufferReport {
            ids: self.ids.clone(),
            sums,
            samples_per_channel: raw.len() / count,
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.out.flush()?)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
