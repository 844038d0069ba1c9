use {
    crate::utils::{errorfmt::ErrorFmt, numcell::NumCell, oserror::OsError},
    ahash::AHashMap,
    std::{
        cell::{Cell, RefCell},
        error::Error,
        rc::{Rc, Weak},
    },
    thiserror::Error,
    uapi::{Errno, OwnedFd, c},
};


#[derive(Debug, Error)]
pub enum EventLoopError {
    #[error("Could not create an epoll fd")]
    CreateFailed(#[source] OsError),
    #[error("epoll_wait failed")]
    WaitFailed(#[source] OsError),
    #[error("A dispatcher returned a fatal error: {0}")]
    DispatcherError(Box<dyn Error>),
    #[error("Could not insert an fd to wait on")]
    InsertFailed(#[source] OsError),
    #[error("Could not remove an fd to wait on")]
    RemoveFailed(#[source] OsError),
    #[error("Entry is not registered")]
    NoEntry,
    #[error("Event loop is already destroyed")]
    Destroyed,
}

#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct EventLoopId(pub u64);

pub trait EventLoopDispatcher {
    fn dispatch(&self, events: i32) -> Result<(), Box<dyn Error>>;
}

/// The part of the event loop used by selection transfers.
pub trait Reactor {
    /// Invokes `dispatcher` whenever `fd` is writable until the watch is removed.
    fn watch_writable(
        &self,
        fd: c::c_int,
        dispatcher: Rc<dyn EventLoopDispatcher>,
    ) -> Result<EventLoopId, EventLoopError>;

    fn unwatch(&self, id: EventLoopId);
}

#[derive(Clone)]
struct Entry {
    fd: c::c_int,
    dispatcher: Rc<dyn EventLoopDispatcher>,
}

struct EventLoopData {
    epoll: OwnedFd,
    run: Cell<bool>,
    next_id: NumCell<u64>,
    entries: RefCell<AHashMap<u64, Entry>>,
}

pub struct EventLoop {
    data: Rc<EventLoopData>,
}

#[derive(Clone)]
pub struct EventLoopRef {
    data: Weak<EventLoopData>,
}

impl EventLoopData {
    fn insert(
        &self,
        fd: c::c_int,
        events: i32,
        dispatcher: Rc<dyn EventLoopDispatcher>,
    ) -> Result<EventLoopId, EventLoopError> {
        let id = self.next_id.fetch_add(1);
        let event = c::epoll_event {
            events: events as _,
            u64: id,
        };
        if let Err(e) = uapi::epoll_ctl(self.epoll.raw(), c::EPOLL_CTL_ADD, fd, Some(&event)) {
            return Err(EventLoopError::InsertFailed(e.into()));
        }
        self.entries.borrow_mut().insert(id, Entry { fd, dispatcher });
        Ok(EventLoopId(id))
    }

    fn remove(&self, id: EventLoopId) -> Result<(), EventLoopError> {
        let entry = match self.entries.borrow_mut().remove(&id.0) {
            Some(e) => e,
            None => return Err(EventLoopError::NoEntry),
        };
        if let Err(e) = uapi::epoll_ctl(self.epoll.raw(), c::EPOLL_CTL_DEL, entry.fd, None) {
            return Err(EventLoopError::RemoveFailed(e.into()));
        }
        Ok(())
    }

    fn run(&self) -> Result<(), EventLoopError> {
        let mut buf = [c::epoll_event { events: 0, u64: 0 }; 16];
        while self.run.get() {
            let num = match uapi::epoll_wait(self.epoll.raw(), &mut buf, -1) {
                Ok(n) => n,
                Err(Errno(c::EINTR)) => continue,
                Err(e) => return Err(EventLoopError::WaitFailed(e.into())),
            };
            for event in &buf[..num] {
                if !self.run.get() {
                    break;
                }
                let id = event.u64;
                let entry = self.entries.borrow().get(&id).cloned();
                let entry = match entry {
                    Some(e) => e,
                    None => {
                        log::debug!("Watch {} fired but has already been removed", id);
                        continue;
                    }
                };
                if let Err(e) = entry.dispatcher.dispatch(event.events as i32) {
                    return Err(EventLoopError::DispatcherError(e));
                }
            }
        }
        Ok(())
    }
}

impl EventLoop {
    pub fn new() -> Result<Self, EventLoopError> {
        let epoll = match uapi::epoll_create1(c::EPOLL_CLOEXEC) {
            Ok(e) => e,
            Err(e) => return Err(EventLoopError::CreateFailed(e.into())),
        };
        Ok(Self {
            data: Rc::new(EventLoopData {
                epoll,
                run: Cell::new(true),
                next_id: NumCell::new(1),
                entries: Default::default(),
            }),
        })
    }

    pub fn to_ref(&self) -> EventLoopRef {
        EventLoopRef {
            data: Rc::downgrade(&self.data),
        }
    }

    /// Dispatches events until `EventLoopRef::stop` is called.
    pub fn run(&self) -> Result<(), EventLoopError> {
        self.data.run.set(true);
        self.data.run()
    }
}

impl EventLoopRef {
    pub fn stop(&self) {
        if let Some(d) = self.data.upgrade() {
            d.run.set(false);
        }
    }

    pub fn insert(
        &self,
        fd: c::c_int,
        events: i32,
        dispatcher: Rc<dyn EventLoopDispatcher>,
    ) -> Result<EventLoopId, EventLoopError> {
        match self.data.upgrade() {
            Some(d) => d.insert(fd, events, dispatcher),
            None => Err(EventLoopError::Destroyed),
        }
    }

    pub fn remove(&self, id: EventLoopId) -> Result<(), EventLoopError> {
        match self.data.upgrade() {
            Some(d) => d.remove(id),
            None => Err(EventLoopError::Destroyed),
        }
    }
}

impl Reactor for EventLoopRef {
    fn watch_writable(
        &self,
        fd: c::c_int,
        dispatcher: Rc<dyn EventLoopDispatcher>,
    ) -> Result<EventLoopId, EventLoopError> {
        self.insert(fd, c::EPOLLOUT, dispatcher)
    }

    fn unwatch(&self, id: EventLoopId) {
        if let Err(e) = self.remove(id) {
            log::warn!("Could not remove watch {}: {}", id.0, ErrorFmt(e));
        }
    }
}
