//! A single-threaded reactor: file-descriptor readiness multiplexed with
//! time-driven callbacks (spec.md §4.1). Grounded in the teacher's
//! `EventLoop` (`src/ae.rs` in the reference pack), which already models
//! this as an owned struct rather than the sibling global-`Lazy`-statics
//! variant the same repo also carries (`src/eventloop.rs`) — the
//! struct-owned shape is the one spec.md's data model describes, so it is
//! the one kept and generalized here.

mod backend;
mod timer;

use std::any::Any;
use std::ops::{BitAnd, BitOr};
use std::rc::Rc;

use libc::{fd_set, select, timeval, FD_ISSET, FD_SET, FD_ZERO};

use crate::error::AeError;
use crate::log::{LogLevel, Logger};
use crate::util::{add_ms_to_now, now_sec_ms};

pub use backend::PollBackend;
#[cfg(target_os = "linux")]
pub use backend::EpollBackend;
#[cfg(target_os = "macos")]
pub use backend::KqueueBackend;

use timer::{run_finalizers, TimerList};

/// Suggested default capacity, carried over from the teacher's
/// `SET_SIZE = 1024 * 10`. `EventLoop::create` takes its own `setsize` per
/// spec.md §4.1; this is just a convenient default for callers who don't
/// have a better number.
pub const DEFAULT_SET_SIZE: usize = 1024 * 10;

/// File descriptor type alias: kept as the bare `i32` libc/POSIX
/// representation used throughout the teacher's code rather than wrapping
/// it in `RawFd`, since this crate talks to the backend trait via plain
/// integers at every layer.
pub type Fd = i32;

const NOMORE: i32 = -1;

/// Readiness/registration bitmask: `NONE=0`, `READABLE=1`, `WRITABLE=2`,
/// `BARRIER=4` (spec.md §6, bit-exact). A hand-rolled bitmask newtype
/// generalizing the teacher's own single-purpose flag enums, rather than
/// pulling in a `bitflags` dependency for three bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Mask(u8);

impl Mask {
    pub const NONE: Mask = Mask(0);
    pub const READABLE: Mask = Mask(1);
    pub const WRITABLE: Mask = Mask(2);
    pub const BARRIER: Mask = Mask(4);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_readable(self) -> bool {
        self.0 & Self::READABLE.0 != 0
    }

    pub fn is_writable(self) -> bool {
        self.0 & Self::WRITABLE.0 != 0
    }

    pub fn has_barrier(self) -> bool {
        self.0 & Self::BARRIER.0 != 0
    }

    /// `self` with every bit set in `other` cleared.
    pub fn without(self, other: Mask) -> Mask {
        Mask(self.0 & !other.0)
    }
}

impl BitOr for Mask {
    type Output = Mask;
    fn bitor(self, rhs: Self) -> Mask {
        Mask(self.0 | rhs.0)
    }
}

impl BitAnd for Mask {
    type Output = Mask;
    fn bitand(self, rhs: Self) -> Mask {
        Mask(self.0 & rhs.0)
    }
}

/// Flags controlling one call to `process_events` (spec.md §6, bit-exact).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EventFlag(u8);

impl EventFlag {
    pub const NONE: EventFlag = EventFlag(0);
    pub const FILE_EVENTS: EventFlag = EventFlag(1);
    pub const TIME_EVENTS: EventFlag = EventFlag(2);
    pub const DONT_WAIT: EventFlag = EventFlag(4);
    pub const CALL_BEFORE_SLEEP: EventFlag = EventFlag(8);
    pub const CALL_AFTER_SLEEP: EventFlag = EventFlag(16);

    pub fn all_events() -> EventFlag {
        EventFlag::FILE_EVENTS | EventFlag::TIME_EVENTS | EventFlag::CALL_BEFORE_SLEEP | EventFlag::CALL_AFTER_SLEEP
    }

    pub fn contains(self, other: EventFlag) -> bool {
        self.0 & other.0 == other.0
    }

    fn wants_file_events(self) -> bool {
        self.contains(EventFlag::FILE_EVENTS)
    }

    fn wants_time_events(self) -> bool {
        self.contains(EventFlag::TIME_EVENTS)
    }

    fn dont_wait(self) -> bool {
        self.contains(EventFlag::DONT_WAIT)
    }
}

impl BitOr for EventFlag {
    type Output = EventFlag;
    fn bitor(self, rhs: Self) -> EventFlag {
        EventFlag(self.0 | rhs.0)
    }
}

impl BitAnd for EventFlag {
    type Output = EventFlag;
    fn bitand(self, rhs: Self) -> EventFlag {
        EventFlag(self.0 & rhs.0)
    }
}

pub type FileProc = Rc<dyn Fn(&mut EventLoop, Fd, Mask)>;
pub type TimeProc = Rc<dyn Fn(&mut EventLoop, i64, Option<Rc<dyn Any>>) -> i32>;
pub type EventFinalizerProc = Rc<dyn Fn(&mut EventLoop, Option<Rc<dyn Any>>)>;
pub type BeforeSleepProc = Rc<dyn Fn(&mut EventLoop)>;

#[derive(Clone, Default)]
struct FileEvent {
    mask: Mask,
    on_read: Option<FileProc>,
    on_write: Option<FileProc>,
    userdata: Option<Rc<dyn Any>>,
}

#[derive(Clone, Copy, Default)]
pub struct FiredEvent {
    pub fd: Fd,
    pub mask: Mask,
}

/// State of an event-driven program (spec.md §3 "Event loop").
pub struct EventLoop {
    setsize: usize,
    max_fd: i32,
    events: Vec<FileEvent>,
    fired: Vec<FiredEvent>,
    timers: TimerList,
    last_time_sec: i64,
    backend: Box<dyn PollBackend>,
    before_sleep: Option<BeforeSleepProc>,
    after_sleep: Option<BeforeSleepProc>,
    stop: bool,
    logger: Logger,
}

impl EventLoop {
    /// Allocates fd-indexed registration and fired arrays of length
    /// `setsize` and installs the default platform backend (spec.md
    /// §4.1 `create`).
    pub fn create(setsize: usize) -> Result<EventLoop, AeError> {
        let backend = backend::create_default(setsize)?;
        Ok(EventLoop::with_backend(setsize, backend))
    }

    pub fn with_backend(setsize: usize, backend: Box<dyn PollBackend>) -> EventLoop {
        EventLoop {
            setsize,
            max_fd: -1,
            events: vec![FileEvent::default(); setsize],
            fired: vec![FiredEvent::default(); setsize],
            timers: TimerList::new(),
            last_time_sec: now_sec_ms().0,
            backend,
            before_sleep: None,
            after_sleep: None,
            stop: false,
            logger: Logger::default(),
        }
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn setsize(&self) -> usize {
        self.setsize
    }

    pub fn max_fd(&self) -> i32 {
        self.max_fd
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn stop(&mut self) {
        self.stop = true;
    }

    pub fn set_before_sleep(&mut self, proc: Option<BeforeSleepProc>) {
        self.before_sleep = proc;
    }

    pub fn set_after_sleep(&mut self, proc: Option<BeforeSleepProc>) {
        self.after_sleep = proc;
    }

    pub fn resize_setsize(&mut self, new_setsize: usize) -> Result<(), AeError> {
        if (self.max_fd as i64) >= new_setsize as i64 {
            return Err(AeError::SetSizeExceeded { fd: self.max_fd, setsize: new_setsize });
        }
        self.backend.resize(new_setsize)?;
        self.events.resize(new_setsize, FileEvent::default());
        self.fired.resize(new_setsize, FiredEvent::default());
        self.setsize = new_setsize;
        Ok(())
    }

    /// Registers interest in `mask` for `fd`, installing `on_read`/
    /// `on_write` for whichever directions are requested (spec.md §4.1
    /// `register`). Or-combines into any existing registration.
    pub fn register(
        &mut self,
        fd: Fd,
        mask: Mask,
        on_read: Option<FileProc>,
        on_write: Option<FileProc>,
        userdata: Option<Rc<dyn Any>>,
    ) -> Result<(), AeError> {
        if fd as usize >= self.setsize {
            return Err(AeError::SetSizeExceeded { fd, setsize: self.setsize });
        }
        let old_mask = self.events[fd as usize].mask;
        self.backend.add_event(fd, old_mask, mask)?;

        let fe = &mut self.events[fd as usize];
        fe.mask = fe.mask | mask;
        if mask.is_readable() {
            fe.on_read = on_read;
        }
        if mask.is_writable() {
            fe.on_write = on_write;
        }
        fe.userdata = userdata;

        if fd > self.max_fd {
            self.max_fd = fd;
        }
        self.logger.log(LogLevel::Debug, &format!("registered fd {fd} mask {:?}", fe.mask));
        Ok(())
    }

    /// Clears `mask`'s bits from `fd`'s registration; a no-op for
    /// unregistered fds (spec.md §4.1 `unregister`).
    pub fn unregister(&mut self, fd: Fd, mask: Mask) {
        if fd as usize >= self.setsize {
            return;
        }
        let old_mask = self.events[fd as usize].mask;
        if old_mask.is_none() {
            return;
        }
        let new_mask = old_mask.without(mask);
        self.events[fd as usize].mask = new_mask;
        if mask.is_readable() {
            self.events[fd as usize].on_read = None;
        }
        if mask.is_writable() {
            self.events[fd as usize].on_write = None;
        }

        if fd == self.max_fd && new_mask.is_none() {
            let mut j = self.max_fd - 1;
            while j >= 0 && self.events[j as usize].mask.is_none() {
                j -= 1;
            }
            self.max_fd = j;
        }

        if let Err(e) = self.backend.del_event(fd, old_mask, mask) {
            self.logger.log(LogLevel::Warning, &format!("del_event({fd}): {e}"));
        }
    }

    pub fn get_mask(&self, fd: Fd) -> Mask {
        if fd < 0 || fd as usize >= self.setsize {
            return Mask::NONE;
        }
        self.events[fd as usize].mask
    }

    /// Schedules `proc` to run `after_ms` from now; returns a fresh,
    /// monotonically increasing id (spec.md §4.1 `create_timer`).
    pub fn create_timer(
        &mut self,
        after_ms: i64,
        proc: TimeProc,
        userdata: Option<Rc<dyn Any>>,
        finalizer: Option<EventFinalizerProc>,
    ) -> i64 {
        let deadline_ms_total = add_ms_to_now(after_ms);
        let deadline_sec = deadline_ms_total / 1000;
        let deadline_ms = deadline_ms_total % 1000;
        self.timers.create(deadline_sec, deadline_ms, proc, userdata, finalizer)
    }

    /// Marks the timer deleted; if it isn't mid-callback its finalizer
    /// runs immediately, otherwise deferred to the next sweep (spec.md
    /// §4.1 `delete_timer`).
    pub fn delete_timer(&mut self, id: i64) -> Result<(), AeError> {
        match self.timers.mark_deleted(id) {
            None => Err(AeError::UnknownTimer(id)),
            Some(None) => Ok(()),
            Some(Some(timer)) => {
                if let Some(f) = timer.finalizer {
                    f(self, timer.userdata);
                }
                Ok(())
            }
        }
    }

    /// One-shot helper, independent of the loop: blocks up to
    /// `timeout_ms` for `fd` to become ready in the directions named by
    /// `mask` (spec.md §4.1 `wait`).
    pub fn wait(fd: Fd, mask: Mask, timeout_ms: i64) -> Result<Mask, AeError> {
        let mut timeout = timeval { tv_sec: timeout_ms / 1000, tv_usec: ((timeout_ms % 1000) * 1000) as i64 };
        let mut rfds: fd_set = unsafe { std::mem::zeroed() };
        let mut wfds: fd_set = unsafe { std::mem::zeroed() };
        let mut efds: fd_set = unsafe { std::mem::zeroed() };
        unsafe {
            FD_ZERO(&mut rfds);
            FD_ZERO(&mut wfds);
            FD_ZERO(&mut efds);
            if mask.is_readable() {
                FD_SET(fd, &mut rfds);
            }
            if mask.is_writable() {
                FD_SET(fd, &mut wfds);
            }
            let ret = select(fd + 1, &mut rfds, &mut wfds, &mut efds, &mut timeout);
            if ret > 0 {
                let mut ret_mask = Mask::NONE;
                if FD_ISSET(fd, &mut rfds) {
                    ret_mask = ret_mask | Mask::READABLE;
                }
                if FD_ISSET(fd, &mut wfds) {
                    ret_mask = ret_mask | Mask::WRITABLE;
                }
                Ok(ret_mask)
            } else if ret == 0 {
                Ok(Mask::NONE)
            } else {
                Err(AeError::Backend("select failed".to_string()))
            }
        }
    }

    /// Runs iterations with all events and both sleep hooks enabled until
    /// `stop()` is called (spec.md §4.1 `run`).
    pub fn run(&mut self) {
        self.stop = false;
        while !self.stop {
            self.process_events(EventFlag::all_events());
        }
    }

    /// One iteration of the reactor (spec.md §4.1 "Iteration algorithm").
    /// Returns the number of file + time events dispatched, or a negative
    /// value on a fatal backend error.
    pub fn process_events(&mut self, flags: EventFlag) -> i32 {
        let mut processed = 0i32;

        if !flags.wants_file_events() && !flags.wants_time_events() {
            return processed;
        }

        self.detect_clock_skew();

        if self.max_fd != -1 || (flags.wants_time_events() && !flags.dont_wait()) {
            let timeout_ms = self.compute_timeout(flags);

            if flags.contains(EventFlag::CALL_BEFORE_SLEEP) {
                if let Some(f) = self.before_sleep.clone() {
                    f(self);
                }
            }

            let mut fired = std::mem::take(&mut self.fired);
            let poll_result = self.backend.poll(&mut fired, timeout_ms);
            self.fired = fired;

            if flags.contains(EventFlag::CALL_AFTER_SLEEP) {
                if let Some(f) = self.after_sleep.clone() {
                    f(self);
                }
            }

            let n = match poll_result {
                Ok(n) => n,
                Err(e) => {
                    self.logger.log(LogLevel::Warning, &format!("poll failed: {e}"));
                    return -1;
                }
            };

            if flags.wants_file_events() {
                for j in 0..n {
                    let fd = self.fired[j].fd;
                    let ready = self.fired[j].mask;
                    if fd < 0 || fd as usize >= self.events.len() {
                        continue;
                    }
                    let fe = self.events[fd as usize].clone();
                    let mut read_fired = false;

                    let fire_read = fe.mask.is_readable() && ready.is_readable();
                    let fire_write = fe.mask.is_writable() && ready.is_writable();

                    if fe.mask.has_barrier() {
                        // Write-then-read: the application may e.g. fsync
                        // before replying in the same iteration.
                        if fire_write {
                            if let Some(w) = &fe.on_write {
                                w(self, fd, ready);
                            }
                        }
                        if fire_read {
                            if let Some(r) = &fe.on_read {
                                r(self, fd, ready);
                            }
                        }
                    } else {
                        if fire_read {
                            read_fired = true;
                            if let Some(r) = &fe.on_read {
                                r(self, fd, ready);
                            }
                        }
                        if fire_write {
                            let same_proc = match (&fe.on_read, &fe.on_write) {
                                (Some(r), Some(w)) => Rc::ptr_eq(r, w),
                                _ => false,
                            };
                            if !read_fired || !same_proc {
                                if let Some(w) = &fe.on_write {
                                    w(self, fd, ready);
                                }
                            }
                        }
                    }
                    processed += 1;
                }
            }
        }

        if flags.wants_time_events() {
            processed += self.process_time_events() as i32;
        }

        processed
    }

    fn compute_timeout(&self, flags: EventFlag) -> Option<i64> {
        if flags.dont_wait() {
            return Some(0);
        }
        if !flags.wants_time_events() {
            return None;
        }
        match self.timers.nearest_deadline() {
            Some((sec, ms)) => {
                let deadline_ms = sec * 1000 + ms;
                let now = add_ms_to_now(0);
                Some((deadline_ms - now).max(0))
            }
            None => None,
        }
    }

    fn detect_clock_skew(&mut self) {
        let (now_sec, _) = now_sec_ms();
        if now_sec < self.last_time_sec {
            self.logger.log(LogLevel::Notice, "clock moved backward, forcing timers to fire");
            self.timers.force_all_due();
        }
        self.last_time_sec = now_sec;
    }

    /// Dispatches matured timers (spec.md §4.1 "Timer dispatch"). A
    /// `max_id` snapshot at entry keeps handlers that create new timers
    /// from being dispatched in the same pass.
    fn process_time_events(&mut self) -> u32 {
        let mut processed = 0u32;
        let max_id = self.timers.next_id_ceiling();
        let slots = self.timers.snapshot_order();
        let (now_sec, now_ms) = now_sec_ms();

        for slot in slots {
            let (id, due) = match self.timers.get(slot) {
                Some(t) if t.id != -1 && t.id <= max_id => {
                    let due = t.deadline_sec < now_sec || (t.deadline_sec == now_sec && t.deadline_ms <= now_ms);
                    (t.id, due)
                }
                _ => continue,
            };
            if !due {
                continue;
            }

            let (proc, userdata) = match self.timers.get(slot) {
                Some(t) => (t.proc.clone(), t.userdata.clone()),
                None => continue,
            };
            self.timers.bump_refcount(slot);
            let ret = proc(self, id, userdata);
            processed += 1;
            self.timers.release_refcount(slot);

            if ret != NOMORE {
                let new_deadline = add_ms_to_now(ret as i64);
                self.timers.reschedule(slot, new_deadline / 1000, new_deadline % 1000);
            } else {
                self.timers.delete_in_place(slot);
            }
        }

        let dead = self.timers.sweep();
        run_finalizers(self, dead);

        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct NullBackend {
        setsize: usize,
    }
    impl PollBackend for NullBackend {
        fn add_event(&mut self, _fd: Fd, _old_mask: Mask, _mask: Mask) -> Result<(), AeError> {
            Ok(())
        }
        fn del_event(&mut self, _fd: Fd, _old_mask: Mask, _mask: Mask) -> Result<(), AeError> {
            Ok(())
        }
        fn resize(&mut self, new_setsize: usize) -> Result<(), AeError> {
            self.setsize = new_setsize;
            Ok(())
        }
        fn poll(&mut self, _fired: &mut [FiredEvent], timeout_ms: Option<i64>) -> Result<usize, AeError> {
            if let Some(ms) = timeout_ms {
                std::thread::sleep(std::time::Duration::from_millis(ms as u64));
            }
            Ok(0)
        }
        fn name(&self) -> &'static str {
            "null"
        }
    }

    fn null_loop(setsize: usize) -> EventLoop {
        EventLoop::with_backend(setsize, Box::new(NullBackend { setsize }))
    }

    #[test]
    fn mask_bitor_combines_directions_and_barrier() {
        let m = Mask::READABLE | Mask::WRITABLE | Mask::BARRIER;
        assert!(m.is_readable());
        assert!(m.is_writable());
        assert!(m.has_barrier());
    }

    #[test]
    fn register_then_unregister_complement_leaves_expected_mask() {
        let mut el = null_loop(16);
        el.register(3, Mask::READABLE | Mask::WRITABLE, None, None, None).unwrap();
        el.unregister(3, Mask::WRITABLE);
        assert_eq!(el.get_mask(3), Mask::READABLE);
    }

    #[test]
    fn max_fd_tracks_highest_registered_fd() {
        let mut el = null_loop(16);
        el.register(3, Mask::READABLE, None, None, None).unwrap();
        el.register(7, Mask::READABLE, None, None, None).unwrap();
        assert_eq!(el.max_fd(), 7);
        el.unregister(7, Mask::READABLE);
        assert_eq!(el.max_fd(), 3);
        el.unregister(3, Mask::READABLE);
        assert_eq!(el.max_fd(), -1);
    }

    #[test]
    fn register_beyond_setsize_errors() {
        let mut el = null_loop(4);
        let err = el.register(10, Mask::READABLE, None, None, None).unwrap_err();
        assert_eq!(err, AeError::SetSizeExceeded { fd: 10, setsize: 4 });
    }

    #[test]
    fn timer_fires_once_and_respects_nomore() {
        let mut el = null_loop(4);
        let fired = Rc::new(RefCell::new(0));
        let f = fired.clone();
        let proc: TimeProc = Rc::new(move |_el, _id, _ud| {
            *f.borrow_mut() += 1;
            NOMORE
        });
        el.create_timer(0, proc, None, None);
        for _ in 0..5 {
            el.process_events(EventFlag::TIME_EVENTS | EventFlag::DONT_WAIT);
            if *fired.borrow() > 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn timer_reschedule_keeps_firing() {
        let mut el = null_loop(4);
        let fired = Rc::new(RefCell::new(0));
        let f = fired.clone();
        let proc: TimeProc = Rc::new(move |_el, _id, _ud| {
            *f.borrow_mut() += 1;
            if *f.borrow() >= 3 {
                NOMORE
            } else {
                0
            }
        });
        el.create_timer(0, proc, None, None);
        for _ in 0..50 {
            el.process_events(EventFlag::TIME_EVENTS | EventFlag::DONT_WAIT);
            if *fired.borrow() >= 3 {
                break;
            }
        }
        assert_eq!(*fired.borrow(), 3);
    }

    #[test]
    fn delete_timer_runs_finalizer_when_not_reentrant() {
        let mut el = null_loop(4);
        let finalized = Rc::new(RefCell::new(false));
        let fin = finalized.clone();
        let proc: TimeProc = Rc::new(|_el, _id, _ud| 1000);
        let finalizer: EventFinalizerProc = Rc::new(move |_el, _ud| {
            *fin.borrow_mut() = true;
        });
        let id = el.create_timer(1000, proc, None, Some(finalizer));
        el.delete_timer(id).unwrap();
        assert!(*finalized.borrow());
    }

    #[test]
    fn delete_unknown_timer_errors() {
        let mut el = null_loop(4);
        assert_eq!(el.delete_timer(12345), Err(AeError::UnknownTimer(12345)));
    }

    #[test]
    fn wait_reports_readable_once_data_is_written() {
        let mut fds = [0i32; 2];
        let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(ret, 0);
        let (read_fd, write_fd) = (fds[0], fds[1]);

        let before = EventLoop::wait(read_fd, Mask::READABLE, 20).unwrap();
        assert_eq!(before, Mask::NONE);

        let byte = [1u8];
        unsafe {
            libc::write(write_fd, byte.as_ptr() as *const libc::c_void, 1);
        }
        let after = EventLoop::wait(read_fd, Mask::READABLE, 1000).unwrap();
        assert!(after.is_readable());

        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
        }
    }

    #[test]
    fn resize_setsize_grows_capacity_and_rejects_shrinking_below_max_fd() {
        let mut el = null_loop(8);
        el.register(5, Mask::READABLE, None, None, None).unwrap();
        el.resize_setsize(32).unwrap();
        assert_eq!(el.setsize(), 32);
        assert_eq!(el.get_mask(5), Mask::READABLE);
        let err = el.resize_setsize(4).unwrap_err();
        assert_eq!(err, AeError::SetSizeExceeded { fd: 5, setsize: 4 });
    }

    #[test]
    fn barrier_runs_write_before_read() {
        let mut el = null_loop(4);
        let order = Rc::new(RefCell::new(Vec::new()));
        let o1 = order.clone();
        let o2 = order.clone();
        let on_read: FileProc = Rc::new(move |_el, _fd, _mask| o1.borrow_mut().push("read"));
        let on_write: FileProc = Rc::new(move |_el, _fd, _mask| o2.borrow_mut().push("write"));
        el.register(5, Mask::READABLE | Mask::WRITABLE | Mask::BARRIER, Some(on_read), Some(on_write), None)
            .unwrap();
        let fe = el.events[5].clone();
        if fe.mask.has_barrier() {
            if let Some(w) = &fe.on_write {
                w(&mut el, 5, Mask::READABLE | Mask::WRITABLE);
            }
            if let Some(r) = &fe.on_read {
                r(&mut el, 5, Mask::READABLE | Mask::WRITABLE);
            }
        }
        assert_eq!(*order.borrow(), vec!["write", "read"]);
    }
}
