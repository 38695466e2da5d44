//! Readiness multiplexing over the child's pipes.
//!
//! Waits on whichever pipes are still open until at least one is readable,
//! has hung up, or the timeout elapses. An empty set simply sleeps for the
//! timeout, which keeps the caller's loop bounded after both pipes close.

/// Readiness flags for stdout and stderr, in that order.
pub(crate) type Readiness = [bool; 2];

#[cfg(unix)]
pub(crate) use unix::{Descriptor, descriptor, wait_readable};

#[cfg(not(unix))]
pub(crate) use fallback::{Descriptor, descriptor, wait_readable};

#[cfg(unix)]
mod unix {
    use std::io;
    use std::os::fd::{AsRawFd, RawFd};
    use std::time::Duration;

    use super::Readiness;

    pub(crate) type Descriptor = RawFd;

    pub(crate) fn descriptor<T: AsRawFd>(stream: &T) -> Descriptor {
        stream.as_raw_fd()
    }

    pub(crate) fn wait_readable(
        descriptors: [Option<Descriptor>; 2],
        timeout: Duration,
    ) -> io::Result<Readiness> {
        let mut polled: Vec<libc::pollfd> = descriptors
            .iter()
            .flatten()
            .map(|fd| libc::pollfd {
                fd: *fd,
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        let nfds = libc::nfds_t::try_from(polled.len()).unwrap_or(0);
        let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        // SAFETY: `polled` is a live, correctly sized buffer of `nfds`
        // entries for the duration of the call.
        let rc = unsafe { libc::poll(polled.as_mut_ptr(), nfds, timeout_ms) };
        if rc < 0 {
            let error = io::Error::last_os_error();
            if error.kind() == io::ErrorKind::Interrupted {
                return Ok([false, false]);
            }
            return Err(error);
        }

        let wake_mask = libc::POLLIN | libc::POLLHUP | libc::POLLERR;
        let mut events = polled.iter().map(|entry| entry.revents & wake_mask != 0);
        let mut ready = [false, false];
        for (slot, fd) in ready.iter_mut().zip(descriptors.iter()) {
            if fd.is_some() {
                *slot = events.next().unwrap_or(false);
            }
        }
        Ok(ready)
    }
}

#[cfg(not(unix))]
mod fallback {
    use std::io;
    use std::time::Duration;

    use super::Readiness;

    pub(crate) type Descriptor = ();

    pub(crate) fn descriptor<T>(_stream: &T) -> Descriptor {}

    pub(crate) fn wait_readable(
        _descriptors: [Option<Descriptor>; 2],
        _timeout: Duration,
    ) -> io::Result<Readiness> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "readiness polling requires a POSIX platform",
        ))
    }
}
