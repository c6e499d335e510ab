use super::{CycleReport, KeyCode, KeyEmitter};
use crate::error::CaptureError;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    MapVirtualKeyW, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, MAPVK_VK_TO_VSC, VIRTUAL_KEY,
};

/// Synthesizes key-down / key-up events on the Windows input queue.
#[derive(Debug, Default)]
pub struct SendInputEmitter;

impl SendInputEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl KeyEmitter for SendInputEmitter {
    fn emit(&mut self, key: KeyCode, report: &CycleReport) -> Result<(), CaptureError> {
        let flags = if report.state.is_active() {
            KEYBD_EVENT_FLAGS(0)
        } else {
            KEYEVENTF_KEYUP
        };
        // SAFETY: MapVirtualKeyW is a pure table lookup.
        let scan = unsafe { MapVirtualKeyW(u32::from(key.code()), MAPVK_VK_TO_VSC) } as u16;
        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(key.code()),
                    wScan: scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        // SAFETY: `input` is a fully initialised keyboard INPUT and the size
        // argument matches the struct passed.
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent != 1 {
            return Err(CaptureError::Output(format!(
                "SendInput injected {sent} of 1 events: {}",
                windows::core::Error::from_win32()
            )));
        }
        Ok(())
    }
}
