use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
#[cfg(windows)]
use windows::Win32::Foundation::BOOL;

/// Flag shared with the running session's stop signal.
static STOP_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Only reads an already-initialised OnceLock and flips an atomic, so it is
/// safe from a signal handler or the console control thread.
fn request_stop() {
    if let Some(flag) = STOP_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(unix)]
extern "C" fn handle_sigint(_: libc::c_int) {
    request_stop();
}

#[cfg(windows)]
unsafe extern "system" fn handle_console_ctrl(ctrl_type: u32) -> BOOL {
    use windows::Win32::Foundation::{FALSE, TRUE};
    use windows::Win32::System::Console::{CTRL_BREAK_EVENT, CTRL_C_EVENT};

    if ctrl_type == CTRL_C_EVENT || ctrl_type == CTRL_BREAK_EVENT {
        request_stop();
        TRUE
    } else {
        FALSE
    }
}

/// Route Ctrl-C into `flag` so the session finishes its cycle and tears down.
///
/// Returns an error when no handler could be installed; Ctrl-C then ends the
/// process without teardown.
pub(crate) fn install_stop_handler(flag: Arc<AtomicBool>) -> Result<()> {
    if STOP_FLAG.set(flag).is_err() {
        return Ok(());
    }
    install_platform_handler()
}

#[cfg(unix)]
fn install_platform_handler() -> Result<()> {
    // SAFETY: handle_sigint only reads a OnceLock that is already set and
    // stores to an atomic.
    let installed = unsafe {
        let handler = handle_sigint as *const () as libc::sighandler_t;
        libc::signal(libc::SIGINT, handler) != libc::SIG_ERR
    };
    if !installed {
        anyhow::bail!("failed to install SIGINT handler");
    }
    Ok(())
}

#[cfg(windows)]
fn install_platform_handler() -> Result<()> {
    use windows::Win32::Foundation::TRUE;
    use windows::Win32::System::Console::SetConsoleCtrlHandler;

    // SAFETY: handle_console_ctrl only reads a OnceLock that is already set
    // and stores to an atomic.
    unsafe { SetConsoleCtrlHandler(Some(handle_console_ctrl), TRUE) }
        .map_err(|err| anyhow::anyhow!("failed to install console control handler: {err}"))
}

#[cfg(not(any(unix, windows)))]
fn install_platform_handler() -> Result<()> {
    anyhow::bail!("no Ctrl-C handler available on this platform")
}
