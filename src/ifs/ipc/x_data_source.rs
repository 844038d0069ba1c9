use {
    crate::{
        ifs::ipc::{IpcLocation, data_sink::DataSink},
        utils::oserror::OsError,
        xcon::XconError,
        xwayland::selection::{SelectionKind, XSelections},
    },
    std::{
        cell::{Cell, RefCell},
        rc::{Rc, Weak},
    },
    thiserror::Error,
};

linear_ids!(XDataSourceIds, XDataSourceId, u64);

#[derive(Debug, Error)]
pub enum XDataSourceError {
    #[error("The X selection does not offer the mime type {0}")]
    UnsupportedMimeType(String),
    #[error("The data source has already been destroyed")]
    Destroyed,
    #[error("The selection bridge no longer exists")]
    BridgeDestroyed,
    #[error("Another transfer of this selection is in progress")]
    TransferInProgress,
    #[error("Could not make the fd non-blocking")]
    SetNonblock(#[source] OsError),
    #[error("Could not request the selection conversion")]
    ConvertSelection(#[source] XconError),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct XMimeType {
    pub mime_type: String,
    pub atom: u32,
}

/// A wayland data source backed by the selection of an X client.
pub struct XDataSource {
    pub id: XDataSourceId,
    pub kind: SelectionKind,
    pub location: IpcLocation,
    selections: Weak<XSelections>,
    mime_types: RefCell<Vec<XMimeType>>,
    destroyed: Cell<bool>,
}

impl XDataSource {
    pub(crate) fn new(
        selections: &Rc<XSelections>,
        kind: SelectionKind,
        location: IpcLocation,
        mime_types: Vec<XMimeType>,
    ) -> Self {
        Self {
            id: selections.source_ids.next(),
            kind,
            location,
            selections: Rc::downgrade(selections),
            mime_types: RefCell::new(mime_types),
            destroyed: Cell::new(false),
        }
    }

    pub fn mime_types(&self) -> Vec<String> {
        self.mime_types
            .borrow()
            .iter()
            .map(|t| t.mime_type.clone())
            .collect()
    }

    pub fn available_types(&self) -> Vec<XMimeType> {
        self.mime_types.borrow().clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Asks the X client to write the selection in `mime_type` to `sink`.
    ///
    /// The sink is closed unless it becomes the destination of a new transfer.
    pub fn send(&self, mime_type: &str, sink: Rc<dyn DataSink>) -> Result<(), XDataSourceError> {
        if self.destroyed.get() {
            return Err(XDataSourceError::Destroyed);
        }
        let atom = self
            .mime_types
            .borrow()
            .iter()
            .find(|t| t.mime_type == mime_type)
            .map(|t| t.atom);
        let Some(atom) = atom else {
            log::debug!(
                "Cannot send X selection to wayland: unsupported mime type {}",
                mime_type,
            );
            return Err(XDataSourceError::UnsupportedMimeType(mime_type.to_string()));
        };
        let Some(selections) = self.selections.upgrade() else {
            return Err(XDataSourceError::BridgeDestroyed);
        };
        selections.start_transfer(self.kind, atom, sink)
    }

    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        log::debug!("Destroying X data source {}", self.id);
        self.mime_types.take();
    }
}
