use {
    std::{
        error::Error,
        fmt::{Display, Formatter},
        io,
    },
    uapi::{Errno, c},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OsError(pub c::c_int);

impl OsError {
    pub fn is_retryable(self) -> bool {
        self.0 == c::EAGAIN || self.0 == c::EWOULDBLOCK || self.0 == c::EINTR
    }
}

impl From<Errno> for OsError {
    fn from(e: Errno) -> Self {
        Self(e.0)
    }
}

impl From<io::Error> for OsError {
    fn from(v: io::Error) -> Self {
        Self(v.raw_os_error().unwrap_or(c::EINVAL))
    }
}

impl Error for OsError {}

impl Display for OsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let e = io::Error::from_raw_os_error(self.0);
        write!(f, "{}", e)
    }
}
