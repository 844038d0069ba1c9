//! The X to wayland direction of the clipboard and primary selection.
//!
//! Ownership changes of X selections are observed through XFixes. When an X client
//! takes a selection, its targets are converted into an `XDataSource` that is
//! published to the seat. When a wayland client reads from that source, the selection
//! is converted into `_WL_SELECTION` on the proxy window and streamed into the fd of
//! the client, possibly via the `INCR` protocol.
//!
//! All selections share the proxy window and the `_WL_SELECTION` property, so
//! transfers of different selections that overlap in time use the same property.

use {
    crate::{
        config::SelectionConfig,
        event_loop::Reactor,
        ifs::ipc::{
            IpcLocation, SelectionSeat, unset_seat_selection,
            x_data_source::{XDataSource, XDataSourceIds},
        },
        xcon::{
            PropertyNotify, SelectionNotify, XConnection, XfixesSelectionNotify,
            consts::{ATOM_NONE, WINDOW_NONE},
        },
        xwayland::XWaylandError,
    },
    linearize::{Linearize, LinearizeExt, StaticMap, static_map},
    std::{
        cell::{Cell, RefCell},
        rc::{Rc, Weak},
    },
};

mod mime;
mod owner;
mod targets;
mod transfer;


pub use {
    mime::{AtomMime, TEXT_PLAIN, TEXT_PLAIN_UTF8, atom_to_mime, classify_atom},
    targets::TargetsError,
    transfer::TransferPhase,
};

use transfer::SelectionTransfer;

atoms! {
    Atoms;

    CLIPBOARD,
    INCR,
    PRIMARY,
    TARGETS,
    TEXT,
    TIMESTAMP,
    UTF8_STRING,
    _WL_SELECTION,
    XdndSelection,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Linearize)]
pub enum SelectionKind {
    Clipboard,
    Primary,
    DragAndDrop,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectionEvent {
    SelectionNotify(SelectionNotify),
    PropertyNotify(PropertyNotify),
    XfixesSelectionNotify(XfixesSelectionNotify),
}

pub struct SelectionState {
    pub kind: SelectionKind,
    /// The proxy window that requests conversions of this selection.
    pub window: u32,
    pub atom: u32,
    owner: Cell<u32>,
    timestamp: Cell<u32>,
    transfer: RefCell<Option<SelectionTransfer>>,
    source: RefCell<Weak<XDataSource>>,
}

impl SelectionState {
    fn new(kind: SelectionKind, window: u32, atom: u32) -> Self {
        Self {
            kind,
            window,
            atom,
            owner: Cell::new(WINDOW_NONE),
            timestamp: Cell::new(0),
            transfer: Default::default(),
            source: Default::default(),
        }
    }

    pub fn owner(&self) -> u32 {
        self.owner.get()
    }

    /// The time at which the proxy window last became the owner of this selection.
    pub fn timestamp(&self) -> u32 {
        self.timestamp.get()
    }

    pub fn transfer_phase(&self) -> Option<TransferPhase> {
        self.transfer.borrow().as_ref().map(|t| t.phase())
    }

    pub fn source(&self) -> Option<Rc<XDataSource>> {
        self.source.borrow().upgrade()
    }
}

pub struct XSelections {
    pub(crate) c: Rc<dyn XConnection>,
    pub(crate) seat: Rc<dyn SelectionSeat>,
    pub(crate) reactor: Rc<dyn Reactor>,
    pub(crate) atoms: Atoms,
    pub(crate) config: SelectionConfig,
    pub(crate) source_ids: XDataSourceIds,
    selections: StaticMap<SelectionKind, SelectionState>,
    destroyed: Cell<bool>,
}

impl XSelections {
    pub fn new(
        c: Rc<dyn XConnection>,
        seat: Rc<dyn SelectionSeat>,
        reactor: Rc<dyn Reactor>,
        window: u32,
        config: SelectionConfig,
    ) -> Result<Rc<Self>, XWaylandError> {
        config.validate().map_err(XWaylandError::Config)?;
        let atoms = Atoms::load(&*c).map_err(XWaylandError::LoadAtoms)?;
        let selections: StaticMap<SelectionKind, SelectionState> = static_map! {
            kind => {
                let atom = match kind {
                    SelectionKind::Clipboard => atoms.CLIPBOARD,
                    SelectionKind::Primary => atoms.PRIMARY,
                    SelectionKind::DragAndDrop => atoms.XdndSelection,
                };
                SelectionState::new(kind, window, atom)
            }
        };
        Ok(Rc::new(Self {
            c,
            seat,
            reactor,
            atoms,
            config,
            source_ids: Default::default(),
            selections,
            destroyed: Cell::new(false),
        }))
    }

    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    pub fn selection(&self, kind: SelectionKind) -> &SelectionState {
        &self.selections[kind]
    }

    pub fn kind_of(&self, atom: u32) -> Option<SelectionKind> {
        SelectionKind::variants().find(|&kind| self.selections[kind].atom == atom)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Returns whether the event belonged to the selection bridge.
    pub fn handle_event(self: &Rc<Self>, event: &SelectionEvent) -> bool {
        if self.destroyed.get() {
            return false;
        }
        match event {
            SelectionEvent::SelectionNotify(e) => self.handle_selection_notify(e),
            SelectionEvent::PropertyNotify(e) => self.handle_property_notify(e),
            SelectionEvent::XfixesSelectionNotify(e) => self.handle_xfixes_selection_notify(e),
        }
    }

    pub fn handle_selection_notify(self: &Rc<Self>, event: &SelectionNotify) -> bool {
        log::debug!(
            "SELECTION_NOTIFY (selection={}, property={}, target={})",
            event.selection,
            event.property,
            event.target,
        );
        let Some(kind) = self.kind_of(event.selection) else {
            return false;
        };
        if event.property == ATOM_NONE {
            if event.target == self.atoms.TARGETS {
                log::warn!("The owner of the {:?} selection did not send its targets", kind);
            } else {
                log::error!("Conversion of the {:?} selection failed", kind);
                self.finish_transfer(kind);
            }
        } else if event.target == self.atoms.TARGETS {
            self.handle_targets(kind);
        } else {
            self.get_data(kind);
        }
        true
    }

    /// Stops all transfers and withdraws the sources of this bridge from the seat.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        for kind in SelectionKind::variants() {
            if self.selections[kind].is_incremental() {
                self.delete_selection_property(kind);
            }
            self.finish_transfer(kind);
            let source = self.selections[kind].source.take().upgrade();
            let (Some(source), Some(location)) = (source, IpcLocation::for_selection(kind)) else {
                continue;
            };
            if !source.is_destroyed() {
                unset_seat_selection(&*self.seat, location);
                source.destroy();
            }
        }
    }
}
