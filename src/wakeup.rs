//! Self-pipe between the signal trap and the dispatch thread.
//!
//! `WakeupSender::wake` is async-signal-safe: one non-blocking `write(2)`,
//! nothing else. The dispatch thread blocks in `WakeupReceiver::wait`.

use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Write end. Clones share one fd, closed when the last clone drops.
#[derive(Clone)]
pub(crate) struct WakeupSender {
    fd: Arc<PipeFd>,
}

pub(crate) struct WakeupReceiver {
    fd: PipeFd,
}

struct PipeFd(RawFd);

impl Drop for PipeFd {
    fn drop(&mut self) {
        // SAFETY: fd was created by pipe() and is owned exclusively here.
        unsafe {
            libc::close(self.0);
        }
    }
}

// SAFETY: the fd is an integer handle; all operations on it are syscalls.
unsafe impl Send for PipeFd {}
unsafe impl Sync for PipeFd {}

/// Both ends are non-blocking and close-on-exec.
pub(crate) fn wakeup_pipe() -> io::Result<(WakeupSender, WakeupReceiver)> {
    let mut fds = [0 as RawFd; 2];
    // SAFETY: fds is a valid 2-element array.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let read_end = PipeFd(fds[0]);
    let write_end = PipeFd(fds[1]);

    set_flags(read_end.0)?;
    set_flags(write_end.0)?;

    Ok((
        WakeupSender {
            fd: Arc::new(write_end),
        },
        WakeupReceiver { fd: read_end },
    ))
}

fn set_flags(fd: RawFd) -> io::Result<()> {
    // SAFETY: fd is a valid descriptor just created by pipe().
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags == -1 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == -1 {
            return Err(io::Error::last_os_error());
        }
        let fd_flags = libc::fcntl(fd, libc::F_GETFD);
        if fd_flags == -1 || libc::fcntl(fd, libc::F_SETFD, fd_flags | libc::FD_CLOEXEC) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

impl WakeupSender {
    /// A full pipe (EAGAIN) already means a wakeup is pending, so the result
    /// is ignored.
    pub(crate) fn wake(&self) {
        // SAFETY: fd is a valid pipe write end; buf is a valid 1-byte buffer.
        unsafe {
            libc::write(self.fd.0, [1u8].as_ptr().cast(), 1);
        }
    }
}

impl WakeupReceiver {
    /// Block until the pipe is readable. Returns `Ok(false)` on timeout or
    /// when the wait was interrupted by a signal.
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd.0,
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = match timeout {
            Some(t) => t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
            None => -1,
        };
        // SAFETY: pfd is a valid pollfd and nfds is 1.
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(ret > 0)
    }

    /// Consume every pending byte; returns how many were read.
    pub(crate) fn drain(&self) -> usize {
        let mut buf = [0u8; 64];
        let mut total = 0;
        loop {
            // SAFETY: fd is a valid non-blocking pipe read end; buf is valid.
            let n = unsafe { libc::read(self.fd.0, buf.as_mut_ptr().cast(), buf.len()) };
            if n <= 0 {
                break;
            }
            total += n as usize;
        }
        total
    }
}

#[cfg(test)]
#[path = "../tests/unit/wakeup.rs"]
mod tests;
