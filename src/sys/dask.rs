//! Bindings to the vendor UD-DASK driver library for the USB-1901.
//!
//! Only the subset of the API this tool needs is declared. Every call
//! returns a negative code on failure, surfaced unchanged in the error so
//! it can be looked up in the UD-DASK manual.

use crate::{Error, Result};
use crate::regs::{self, ConfigCtrl, TrigCtrl};
use super::{BufferStatus, Driver};

const MAX_USB_DEVICE: usize = 16;

/// `ASYNCH_OP` selector for the continuous-read calls.
const ASYNCH_OP: u16 = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct UsbDaqDevice {
    module_type: u16,
    card_id: u16,
}

#[link(name = "UsbDask")]
extern "C" {
    fn UD_Device_Scan(module_num: *mut u16, devices: *mut UsbDaqDevice) -> i16;
    fn UD_Register_Card(module_type: u16, card_num: u16) -> i16;
    fn UD_Release_Card(card: u16) -> i16;
    fn UD_AI_1902_Config(card: u16, config_ctrl: u16, trig_ctrl: u16,
        trigger_level: u32, retrigger_count: u32, delay_count: u32) -> i16;
    fn UD_AI_AsyncDblBufferMode(card: u16, enable: u8) -> i16;
    fn UD_AI_1902_CounterInterval(card: u16, scan_interval: u32, sample_interval: u32) -> i16;
    fn UD_AI_ContReadChannel(card: u16, channel: u16, ad_range: u16, buffer: *mut u16,
        read_count: u32, trigger_count: u32, sync_mode: u16) -> i16;
    fn UD_AI_ContReadMultiChannels(card: u16, num_chans: u16, chans: *mut u16,
        ad_ranges: *mut u16, buffer: *mut u16, read_count: u32, trigger_count: u32,
        sync_mode: u16) -> i16;
    fn UD_AI_AsyncDblBufferHalfReady(card: u16, half_ready: *mut u8, stopped: *mut u8) -> i16;
    fn UD_AI_AsyncDblBufferTransfer(card: u16, buffer: *mut u16) -> i16;
    fn UD_AI_AsyncClear(card: u16, access_cnt: *mut u32) -> i16;
}

fn config_err(op: &'static str, code: i16) -> Error {
    Error::Config { op, code }
}

fn acquire_err(op: &'static str, code: i16) -> Error {
    Error::Acquire { op, code }
}

#[derive(Debug)]
pub struct UsbDaskDriverImpl {
    card: u16,
}

impl Driver for UsbDaskDriverImpl {
    fn open() -> Result<UsbDaskDriverImpl> {
        let mut module_num: u16 = 0;
        let mut devices = [UsbDaqDevice { module_type: 0, card_id: regs::INVALID_CARD_ID };
            MAX_USB_DEVICE];
        let code = unsafe { UD_Device_Scan(&mut module_num, devices.as_mut_ptr()) };
        if code < 0 {
            return Err(Error::Scan(code));
        }
        // pick the first available device of the right type
        let device = devices[..(module_num as usize).min(MAX_USB_DEVICE)].iter()
            .find(|device| device.module_type == regs::MODULE_USB_1901)
            .ok_or(Error::NoDevice)?;
        let card = unsafe { UD_Register_Card(device.module_type, device.card_id) };
        if card < 0 {
            return Err(Error::Register(card));
        }
        log::debug!("registered USB-1901 card {} (id {})", card, device.card_id);
        Ok(UsbDaskDriverImpl { card: card as u16 })
    }

    fn configure_ai(&mut self, config: ConfigCtrl, trigger: TrigCtrl) -> Result<()> {
        log::debug!("configure_ai({:?}, {:?})", config, trigger);
        // trigger level, retrigger and delay counts are ignored for
        // a software trigger in double-buffer mode
        let code = unsafe {
            UD_AI_1902_Config(self.card, config.bits(), trigger.bits(), 0, 0, 0)
        };
        if code < 0 {
            return Err(config_err("UD_AI_1902_Config", code));
        }
        Ok(())
    }

    fn set_double_buffered(&mut self, enabled: bool) -> Result<()> {
        log::debug!("set_double_buffered({})", enabled);
        let code = unsafe { UD_AI_AsyncDblBufferMode(self.card, enabled as u8) };
        if code < 0 {
            return Err(config_err("UD_AI_AsyncDblBufferMode", code));
        }
        Ok(())
    }

    fn set_intervals(&mut self, scan: u32, sample: u32) -> Result<()> {
        log::debug!("set_intervals(scan = {}, sample = {})", scan, sample);
        let code = unsafe { UD_AI_1902_CounterInterval(self.card, scan, sample) };
        if code < 0 {
            return Err(config_err("UD_AI_1902_CounterInterval", code));
        }
        Ok(())
    }

    fn start(&mut self, channels: &[(u16, u16)], read_count: u32) -> Result<()> {
        log::debug!("start({:?}, {})", channels, read_count);
        // the buffer pointer is unused in double-buffer mode
        let code = match channels {
            [] => return Err(Error::NoChannels),
            &[(id, range)] => unsafe {
                UD_AI_ContReadChannel(self.card, id, range,
                    core::ptr::null_mut(), read_count, 0, ASYNCH_OP)
            },
            _ => {
                let mut ids = channels.iter().map(|&(id, _)| id).collect::<Vec<u16>>();
                let mut ranges = channels.iter().map(|&(_, range)| range).collect::<Vec<u16>>();
                unsafe {
                    UD_AI_ContReadMultiChannels(self.card, channels.len() as u16,
                        ids.as_mut_ptr(), ranges.as_mut_ptr(),
                        core::ptr::null_mut(), read_count, 0, ASYNCH_OP)
                }
            }
        };
        if code < 0 {
            let op = if channels.len() == 1 {
                "UD_AI_ContReadChannel"
            } else {
                "UD_AI_ContReadMultiChannels"
            };
            return Err(config_err(op, code));
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<BufferStatus> {
        let mut half_ready: u8 = 0;
        let mut stopped: u8 = 0;
        let code = unsafe {
            UD_AI_AsyncDblBufferHalfReady(self.card, &mut half_ready, &mut stopped)
        };
        if code < 0 {
            return Err(acquire_err("UD_AI_AsyncDblBufferHalfReady", code));
        }
        Ok(BufferStatus { half_ready: half_ready != 0, stopped: stopped != 0 })
    }

    fn transfer(&mut self, data: &mut [i16]) -> Result<()> {
        // the vendor call takes no length and writes up to a half-buffer;
        // `data` must be at least that large even when fewer samples are valid
        let buffer = bytemuck::cast_slice_mut::<i16, u16>(data);
        let code = unsafe { UD_AI_AsyncDblBufferTransfer(self.card, buffer.as_mut_ptr()) };
        if code < 0 {
            return Err(acquire_err("UD_AI_AsyncDblBufferTransfer", code));
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<u32> {
        let mut access_cnt: u32 = 0;
        let code = unsafe { UD_AI_AsyncClear(self.card, &mut access_cnt) };
        if code < 0 {
            return Err(acquire_err("UD_AI_AsyncClear", code));
        }
        log::debug!("clear() -> {} trailing samples", access_cnt);
        Ok(access_cnt)
    }
}

impl Drop for UsbDaskDriverImpl {
    fn drop(&mut self) {
        let code = unsafe { UD_Release_Card(self.card) };
        if code < 0 {
            log::error!("UD_Release_Card error: {}", code);
        }
    }
}
