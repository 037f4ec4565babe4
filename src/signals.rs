//! Signal monitor: turns process signals into engine control events.
//!
//! Handlers only write the signal number into a non-blocking self-pipe
//! (async-signal-safe); a reader thread maps each byte to a [`Control`] and
//! forwards it to the engine.

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::Sender;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::thread;

use crate::engine::Control;

/// Signal the bar sends to pause us; advertised in the protocol header.
pub const STOP_SIGNAL: libc::c_int = libc::SIGUSR1;
/// Signal the bar sends to resume us; advertised in the protocol header.
pub const CONT_SIGNAL: libc::c_int = libc::SIGUSR2;

const HANDLED_SIGNALS: [libc::c_int; 4] = [libc::SIGINT, libc::SIGTERM, STOP_SIGNAL, CONT_SIGNAL];

static PIPE_WRITE_FD: AtomicI32 = AtomicI32::new(-1);
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Map a raw signal number to the control event it stands for.
pub fn classify(signo: libc::c_int) -> Option<Control> {
    match signo {
        libc::SIGINT | libc::SIGTERM => Some(Control::Terminate),
        STOP_SIGNAL => Some(Control::Pause),
        CONT_SIGNAL => Some(Control::Resume),
        _ => None,
    }
}

/// Signal handler; only touches an atomic and `write(2)`.
extern "C" fn forward_signal(signo: libc::c_int) {
    let fd = PIPE_WRITE_FD.load(Ordering::SeqCst);
    if fd < 0 {
        return;
    }
    let byte = signo as u8;
    unsafe {
        // SAFETY: write(2) is async-signal-safe and `byte` outlives the call.
        // A full pipe drops the byte; that only loses a repeated signal.
        libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
    }
}

fn set_fd_flags(fd: libc::c_int, nonblocking: bool) -> io::Result<()> {
    unsafe {
        // SAFETY: fcntl on a descriptor we just created.
        if libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) == -1 {
            return Err(io::Error::last_os_error());
        }
        if nonblocking {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            if flags == -1 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == -1 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

fn open_self_pipe() -> io::Result<(libc::c_int, libc::c_int)> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
        return Err(io::Error::last_os_error());
    }
    let (read_fd, write_fd) = (fds[0], fds[1]);
    set_fd_flags(read_fd, false)?;
    set_fd_flags(write_fd, true)?;
    Ok((read_fd, write_fd))
}

/// Block until the next signal byte arrives. `None` once the pipe is closed.
fn read_signal(read_fd: libc::c_int) -> Option<libc::c_int> {
    let mut byte = 0u8;
    loop {
        // SAFETY: reading one byte into a stack buffer of that size.
        let n = unsafe { libc::read(read_fd, &mut byte as *mut u8 as *mut libc::c_void, 1) };
        if n == 1 {
            return Some(byte as libc::c_int);
        }
        if n == 0 {
            return None;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            tracing::warn!("signal pipe read failed: {err}");
            return None;
        }
    }
}

/// Install handlers for terminate, stop and cont signals and forward them as
/// control events on `tx` from a dedicated thread.
///
/// May only be called once per process.
pub fn install_signal_monitor(tx: Sender<Control>) -> Result<thread::JoinHandle<()>> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        bail!("signal monitor already installed");
    }
    let (read_fd, write_fd) =
        open_self_pipe().map_err(|err| anyhow!("failed to create signal pipe: {err}"))?;
    PIPE_WRITE_FD.store(write_fd, Ordering::SeqCst);

    for signo in HANDLED_SIGNALS {
        unsafe {
            // SAFETY: forward_signal is an extern "C" handler that only
            // performs async-signal-safe operations.
            let handler = forward_signal as *const () as libc::sighandler_t;
            if libc::signal(signo, handler) == libc::SIG_ERR {
                bail!("failed to install handler for signal {signo}");
            }
        }
    }

    let handle = thread::Builder::new()
        .name("signal-monitor".to_string())
        .spawn(move || {
            while let Some(signo) = read_signal(read_fd) {
                let Some(control) = classify(signo) else {
                    continue;
                };
                tracing::debug!(signo, ?control, "signal received");
                if tx.send(control).is_err() {
                    break;
                }
            }
        })?;
    Ok(handle)
}
