//! Records analog input from a USB-1901 card in differential, double-buffered
//! mode and appends the converted voltages to a delimited text file.
//!
//! Exit codes: 0 success, 2 argument error, 3 device scan failed, 4 no
//! matching device, 5 registration failed, 6 configuration failed, 7 runtime
//! acquisition error, 8 output I/O error.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::Duration;

use clap::Parser;

use usb1901::{ChannelConfig, ChannelTable, Error, SampleSink, SessionConfig};

/// Record analog input samples from an ADLINK USB-1901 to a file.
#[derive(Debug, Parser)]
#[command(name = "usb1901-record", version)]
struct Args {
    /// Output file for the recorded samples
    #[arg(short = 'o', value_name = "FILE", default_value = "data.csv")]
    output: PathBuf,

    /// Sample rate in Hz
    #[arg(short = 's', value_name = "RATE", default_value_t = 200,
        value_parser = clap::value_parser!(u32).range(1..))]
    sample_rate: u32,

    /// Add a channel to the scan: ID in 0..=15, RANGE 0 (±0.2 V), 1 (±1 V),
    /// 2 (±2 V) or 3 (±10 V); repeatable, at most 8
    #[arg(short = 'c', value_name = "ID:RANGE", required = true)]
    channel: Vec<ChannelConfig>,

    /// Record for a fixed number of seconds instead of until a key press
    #[arg(short = 'd', value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(1..))]
    duration: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::from(exit_code(&error))
        }
    }
}

fn exit_code(error: &Error) -> u8 {
    match error {
        Error::NoChannels | Error::TooManyChannels => 2,
        Error::Scan(_) => 3,
        Error::NoDevice => 4,
        Error::Register(_) => 5,
        Error::Config { .. } => 6,
        Error::Acquire { .. } => 7,
        Error::Io(_) => 8,
    }
}

fn run(args: Args) -> usb1901::Result<()> {
    let config = SessionConfig {
        output: args.output,
        sample_rate: args.sample_rate,
        duration: args.duration.map(Duration::from_secs),
        channels: ChannelTable::new(args.channel)?,
    };

    let mut device = usb1901::Device::open()?;

    // fail fast if the output cannot be created; everything past this
    // point writes into it
    let file = BufWriter::new(File::create(&config.output)?);
    let mut sink = SampleSink::new(file, &config.channels)?;

    println!("Configuring USB-1901 to sample {} channels at {:.3} Hz in double-buffered mode.",
        config.channels.len(), config.effective_rate());
    device.configure(&config)?;

    let unbounded = config.duration.is_none();
    if unbounded {
        println!("Press Enter to stop...");
    }
    let stop = stop_signal(unbounded);
    let summary = usb1901::record(&mut device, &mut sink, &config, stop)?;
    println!("Recorded {} samples to '{}' in {:.3} s.",
        summary.total_samples, config.output.display(), summary.elapsed.as_secs_f64());

    if unbounded {
        println!("Press Enter to exit...");
        let _ = io::stdin().read_line(&mut String::new());
    }
    Ok(())
}

/// A cancellation check backed by a detached stdin reader thread. In
/// duration mode no thread is spawned and the check is always false.
fn stop_signal(enabled: bool) -> impl FnMut() -> bool {
    let receiver = enabled.then(|| {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let _ = io::stdin().read_line(&mut String::new());
            let _ = sender.send(());
        });
        receiver
    });
    move || match &receiver {
        Some(receiver) => !matches!(receiver.try_recv(), Err(TryRecvError::Empty)),
        None => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_args_reject_out_of_range_channel() {
        assert!(Args::try_parse_from(["r", "-c", "16:0"]).is_err());
        assert!(Args::try_parse_from(["r", "-c", "3:9"]).is_err());
        assert!(Args::try_parse_from(["r", "-c", "junk"]).is_err());
    }

    #[test]
    fn test_args_require_a_channel() {
        assert!(Args::try_parse_from(["r"]).is_err());
    }

    #[test]
    fn test_args_reject_bad_rate_and_duration() {
        assert!(Args::try_parse_from(["r", "-c", "0:3", "-s", "0"]).is_err());
        assert!(Args::try_parse_from(["r", "-c", "0:3", "-d", "0"]).is_err());
        assert!(Args::try_parse_from(["r", "-c", "0:3", "-x"]).is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["r", "-c", "0:3"]).unwrap();
        assert_eq!(args.output, PathBuf::from("data.csv"));
        assert_eq!(args.sample_rate, 200);
        assert_eq!(args.duration, None);
        assert_eq!(args.channel.len(), 1);
    }

    #[test]
    fn test_ninth_channel_rejected_by_table() {
        let args = Args::try_parse_from(["r",
            "-c", "0:0", "-c", "1:0", "-c", "2:0", "-c", "3:0",
            "-c", "4:0", "-c", "5:0", "-c", "6:0", "-c", "7:0",
            "-c", "8:0"]).unwrap();
        assert!(matches!(ChannelTable::new(args.channel),
            Err(Error::TooManyChannels)));
    }
}
