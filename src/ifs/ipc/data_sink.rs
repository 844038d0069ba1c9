use {
    crate::utils::{nonblock::set_nonblock, oserror::OsError},
    uapi::{OwnedFd, c},
};


/// The write end of a selection transfer, usually a pipe supplied by a wayland client.
pub trait DataSink {
    /// The fd to watch for writability.
    fn raw(&self) -> c::c_int;

    fn set_nonblock(&self) -> Result<(), OsError>;

    /// Performs a single write. Returns the number of bytes written.
    fn write(&self, buf: &[u8]) -> Result<usize, OsError>;
}

impl DataSink for OwnedFd {
    fn raw(&self) -> c::c_int {
        OwnedFd::raw(self)
    }

    fn set_nonblock(&self) -> Result<(), OsError> {
        set_nonblock(OwnedFd::raw(self))
    }

    fn write(&self, buf: &[u8]) -> Result<usize, OsError> {
        Ok(uapi::write(OwnedFd::raw(self), buf)?)
    }
}
