#![allow(dead_code)]

use bitflags::bitflags;

/// 80 MHz base clock driving the scan interval counter.
pub const TIMEBASE_HZ: u32 = 80_000_000;

/// Samples per double buffer; half of this is transferred per ready event.
pub const AI_BUFFER_SAMPLES: usize = 20480;

/// Minimum A/D conversion interval in timebase cycles. The USB-1901 manual
/// documents 320 as the minimum; it is only safe to use directly when a
/// single channel is scanned.
pub const SAMPLE_INTERVAL_MIN: u32 = 320;

/// Conversion interval used for multi-channel scans.
pub const SAMPLE_INTERVAL_MULTI: u32 = 128 * 320;

/// UD-DASK module type code for the USB-1901.
pub const MODULE_USB_1901: u16 = 0x01;

pub const INVALID_CARD_ID: u16 = 0xffff;

bitflags! {
    /// Analog input configuration word for `UD_AI_1902_Config`.
    ///
    /// The internal conversion source is the zero encoding, so a plain
    /// `DIFFERENTIAL` word selects differential wiring clocked internally.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConfigCtrl: u16 {
        const DIFFERENTIAL        = 1<<0;
        const NONREF_SINGLE_ENDED = 1<<1;
        const CONVSRC_EXT         = 1<<2;
    }
}

bitflags! {
    /// Trigger control word for `UD_AI_1902_Config`.
    ///
    /// Post-trigger mode with a software trigger source is the zero encoding,
    /// which is the only mode this tool uses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TrigCtrl: u16 {
        const TRGMOD_DELAY = 1<<0;
        const TRGMOD_PRE   = 1<<1;
        const TRGMOD_MID   = 1<<2;
        const TRGSRC_AI    = 1<<4;
        const TRGSRC_EXTD  = 1<<5;
    }
}

/// Bipolar voltage range codes accepted by the continuous-read calls.
pub const AD_B_10_V: u16 = 1;
pub const AD_B_2_V: u16 = 20;
pub const AD_B_0_2_V: u16 = 22;
pub const AD_B_1_V: u16 = 27;
