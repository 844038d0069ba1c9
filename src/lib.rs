#![allow(clippy::len_zero, clippy::new_without_default)]

#[macro_use]
mod macros;
pub mod config;
pub mod event_loop;
pub mod ifs;
pub mod logger;
pub mod utils;
pub mod xcon;
pub mod xwayland;

pub use {
    config::SelectionConfig,
    event_loop::{EventLoop, EventLoopDispatcher, EventLoopId, EventLoopRef, Reactor},
    ifs::ipc::{
        IpcLocation, SelectionSeat,
        data_sink::DataSink,
        x_data_source::{XDataSource, XDataSourceError, XMimeType},
    },
    xcon::XConnection,
    xwayland::selection::{SelectionEvent, SelectionKind, TransferPhase, XSelections},
};
