//! I/O multiplexing backend for the reactor (spec.md §6, "Polling backend
//! capability"). Generalized into a trait from the teacher's per-platform
//! `ApiState` (`src/ae/io_event.rs`): that file hard-codes epoll on Linux
//! and kqueue on macOS behind the same method names but never unifies them
//! behind a shared interface. Here the two become trait impls so the
//! reactor is written once against `PollBackend` and any conforming
//! multiplexing primitive can be swapped in.

use std::mem::zeroed;

use crate::error::AeError;

use super::{Fd, FiredEvent, Mask};

/// Capability the reactor requires of its polling backend (spec.md §6).
/// `add_event`/`del_event` take the fd's previous mask alongside the
/// target state because edge-level backends like epoll need to know
/// whether this is an add-new-watch or modify-existing-watch operation.
pub trait PollBackend {
    fn add_event(&mut self, fd: Fd, old_mask: Mask, mask: Mask) -> Result<(), AeError>;
    fn del_event(&mut self, fd: Fd, old_mask: Mask, mask: Mask) -> Result<(), AeError>;
    fn resize(&mut self, new_setsize: usize) -> Result<(), AeError>;
    /// Populates `fired[0..n)` with at most `fired.len()` readiness tuples,
    /// blocking for `timeout_ms` (`None` = block indefinitely, `Some(0)` =
    /// don't block). Returns the number of events written. A retryable
    /// (interrupted) backend failure is reported as `Ok(0)` per spec.md §7;
    /// only fatal failures become `Err`.
    fn poll(&mut self, fired: &mut [FiredEvent], timeout_ms: Option<i64>) -> Result<usize, AeError>;
    fn name(&self) -> &'static str;
}

fn last_errno_message() -> String {
    unsafe {
        let msg = libc::strerror(*libc::__errno_location());
        std::ffi::CStr::from_ptr(msg).to_string_lossy().into_owned()
    }
}

#[cfg(target_os = "linux")]
pub struct EpollBackend {
    epfd: i32,
    events: Vec<libc::epoll_event>,
}

#[cfg(target_os = "linux")]
impl EpollBackend {
    pub fn create(setsize: usize) -> Result<Self, AeError> {
        let epfd = unsafe { libc::epoll_create(1024) };
        if epfd == -1 {
            return Err(AeError::Backend(last_errno_message()));
        }
        Ok(EpollBackend {
            epfd,
            events: vec![unsafe { zeroed() }; setsize],
        })
    }
}

#[cfg(target_os = "linux")]
impl PollBackend for EpollBackend {
    fn add_event(&mut self, fd: Fd, old_mask: Mask, mask: Mask) -> Result<(), AeError> {
        let combined = old_mask | mask;
        let op = if old_mask.is_none() { libc::EPOLL_CTL_ADD } else { libc::EPOLL_CTL_MOD };
        let mut ee: libc::epoll_event = unsafe { zeroed() };
        if combined.is_readable() {
            ee.events |= libc::EPOLLIN as u32;
        }
        if combined.is_writable() {
            ee.events |= libc::EPOLLOUT as u32;
        }
        ee.u64 = fd as u64;
        let ret = unsafe { libc::epoll_ctl(self.epfd, op, fd, &mut ee) };
        if ret == -1 {
            return Err(AeError::Backend(format!("epoll_ctl add: {}", last_errno_message())));
        }
        Ok(())
    }

    fn del_event(&mut self, fd: Fd, old_mask: Mask, mask: Mask) -> Result<(), AeError> {
        let remaining = old_mask.without(mask);
        let mut ee: libc::epoll_event = unsafe { zeroed() };
        if remaining.is_readable() {
            ee.events |= libc::EPOLLIN as u32;
        }
        if remaining.is_writable() {
            ee.events |= libc::EPOLLOUT as u32;
        }
        ee.u64 = fd as u64;
        // Kernels before 2.6.9 require a non-null event pointer even for
        // EPOLL_CTL_DEL.
        let op = if remaining.is_none() { libc::EPOLL_CTL_DEL } else { libc::EPOLL_CTL_MOD };
        let ret = unsafe { libc::epoll_ctl(self.epfd, op, fd, &mut ee) };
        if ret == -1 {
            return Err(AeError::Backend(format!("epoll_ctl del: {}", last_errno_message())));
        }
        Ok(())
    }

    fn resize(&mut self, new_setsize: usize) -> Result<(), AeError> {
        self.events.resize(new_setsize, unsafe { zeroed() });
        Ok(())
    }

    fn poll(&mut self, fired: &mut [FiredEvent], timeout_ms: Option<i64>) -> Result<usize, AeError> {
        let timeout = match timeout_ms {
            Some(ms) => ms as i32,
            None => -1,
        };
        let cap = self.events.len().min(fired.len());
        let ret = unsafe { libc::epoll_wait(self.epfd, self.events.as_mut_ptr(), cap as i32, timeout) };
        if ret == -1 {
            if unsafe { *libc::__errno_location() } == libc::EINTR {
                return Ok(0);
            }
            return Err(AeError::Backend(format!("epoll_wait: {}", last_errno_message())));
        }
        let n = ret as usize;
        for j in 0..n {
            let e = self.events[j];
            let mut mask = Mask::NONE;
            if e.events & (libc::EPOLLIN as u32) != 0 {
                mask = mask | Mask::READABLE;
            }
            if e.events & (libc::EPOLLOUT as u32) != 0 {
                mask = mask | Mask::WRITABLE;
            }
            fired[j] = FiredEvent { fd: e.u64 as Fd, mask };
        }
        Ok(n)
    }

    fn name(&self) -> &'static str {
        "epoll"
    }
}

#[cfg(target_os = "linux")]
impl Drop for EpollBackend {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epfd);
        }
    }
}

#[cfg(target_os = "macos")]
pub struct KqueueBackend {
    kqfd: i32,
    events: Vec<libc::kevent>,
}

#[cfg(target_os = "macos")]
impl KqueueBackend {
    pub fn create(setsize: usize) -> Result<Self, AeError> {
        let kqfd = unsafe { libc::kqueue() };
        if kqfd == -1 {
            return Err(AeError::Backend(last_errno_message()));
        }
        Ok(KqueueBackend {
            kqfd,
            events: vec![unsafe { zeroed() }; setsize],
        })
    }

    fn change(&self, fd: Fd, filter: i16, flags: u16) -> Result<(), AeError> {
        let ke = libc::kevent {
            ident: fd as usize,
            filter,
            flags,
            fflags: 0,
            data: 0,
            udata: std::ptr::null_mut(),
        };
        let ret = unsafe { libc::kevent(self.kqfd, &ke, 1, std::ptr::null_mut(), 0, std::ptr::null()) };
        if ret == -1 {
            return Err(AeError::Backend(last_errno_message()));
        }
        Ok(())
    }
}

#[cfg(target_os = "macos")]
impl PollBackend for KqueueBackend {
    fn add_event(&mut self, fd: Fd, _old_mask: Mask, mask: Mask) -> Result<(), AeError> {
        if mask.is_readable() {
            self.change(fd, libc::EVFILT_READ, libc::EV_ADD)?;
        }
        if mask.is_writable() {
            self.change(fd, libc::EVFILT_WRITE, libc::EV_ADD)?;
        }
        Ok(())
    }

    fn del_event(&mut self, fd: Fd, _old_mask: Mask, mask: Mask) -> Result<(), AeError> {
        if mask.is_readable() {
            self.change(fd, libc::EVFILT_READ, libc::EV_DELETE)?;
        }
        if mask.is_writable() {
            self.change(fd, libc::EVFILT_WRITE, libc::EV_DELETE)?;
        }
        Ok(())
    }

    fn resize(&mut self, new_setsize: usize) -> Result<(), AeError> {
        self.events.resize(new_setsize, unsafe { zeroed() });
        Ok(())
    }

    fn poll(&mut self, fired: &mut [FiredEvent], timeout_ms: Option<i64>) -> Result<usize, AeError> {
        let ts;
        let ts_ptr = match timeout_ms {
            Some(ms) => {
                ts = libc::timespec { tv_sec: ms / 1000, tv_nsec: (ms % 1000) * 1_000_000 };
                &ts as *const libc::timespec
            }
            None => std::ptr::null(),
        };
        let cap = self.events.len().min(fired.len());
        let ret = unsafe {
            libc::kevent(self.kqfd, std::ptr::null(), 0, self.events.as_mut_ptr(), cap as i32, ts_ptr)
        };
        if ret == -1 {
            if unsafe { *libc::__error() } == libc::EINTR {
                return Ok(0);
            }
            return Err(AeError::Backend(last_errno_message()));
        }
        let n = ret as usize;
        for j in 0..n {
            let e = self.events[j];
            let mut mask = Mask::NONE;
            if e.filter == libc::EVFILT_READ {
                mask = mask | Mask::READABLE;
            }
            if e.filter == libc::EVFILT_WRITE {
                mask = mask | Mask::WRITABLE;
            }
            fired[j] = FiredEvent { fd: e.ident as Fd, mask };
        }
        Ok(n)
    }

    fn name(&self) -> &'static str {
        "kqueue"
    }
}

#[cfg(target_os = "macos")]
impl Drop for KqueueBackend {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.kqfd);
        }
    }
}

#[cfg(target_os = "linux")]
pub fn create_default(setsize: usize) -> Result<Box<dyn PollBackend>, AeError> {
    Ok(Box::new(EpollBackend::create(setsize)?))
}

#[cfg(target_os = "macos")]
pub fn create_default(setsize: usize) -> Result<Box<dyn PollBackend>, AeError> {
    Ok(Box::new(KqueueBackend::create(setsize)?))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn create_default(_setsize: usize) -> Result<Box<dyn PollBackend>, AeError> {
    Err(AeError::Backend("no polling backend for this platform".to_string()))
}
