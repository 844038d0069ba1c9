use {
    crate::{ifs::ipc::x_data_source::XDataSource, xwayland::selection::SelectionKind},
    std::rc::Rc,
};

pub mod data_sink;
pub mod x_data_source;

/// The seat registry an `XDataSource` is published to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IpcLocation {
    Clipboard,
    PrimarySelection,
}

impl IpcLocation {
    pub fn for_selection(kind: SelectionKind) -> Option<Self> {
        match kind {
            SelectionKind::Clipboard => Some(Self::Clipboard),
            SelectionKind::Primary => Some(Self::PrimarySelection),
            SelectionKind::DragAndDrop => None,
        }
    }
}

/// The wayland seat as seen by the selection bridge.
pub trait SelectionSeat {
    /// Returns whether a surface of the X server currently has keyboard focus.
    fn has_focus(&self) -> bool;

    fn next_serial(&self) -> u32;

    fn set_selection(&self, source: Rc<XDataSource>, serial: u32);

    fn set_primary_selection(&self, source: Rc<XDataSource>, serial: u32);

    fn unset_selection(&self, serial: u32);

    fn unset_primary_selection(&self, serial: u32);
}

pub fn set_seat_selection(seat: &dyn SelectionSeat, source: &Rc<XDataSource>) {
    let serial = seat.next_serial();
    match source.location {
        IpcLocation::Clipboard => seat.set_selection(source.clone(), serial),
        IpcLocation::PrimarySelection => seat.set_primary_selection(source.clone(), serial),
    }
}

pub fn unset_seat_selection(seat: &dyn SelectionSeat, location: IpcLocation) {
    let serial = seat.next_serial();
    match location {
        IpcLocation::Clipboard => seat.unset_selection(serial),
        IpcLocation::PrimarySelection => seat.unset_primary_selection(serial),
    }
}
