use {
    crate::{
        ifs::ipc::{
            IpcLocation, set_seat_selection,
            x_data_source::{XDataSource, XMimeType},
        },
        utils::errorfmt::ErrorFmt,
        xcon::{
            GetProperty, XconError,
            consts::{ATOM_ANY, ATOM_ATOM},
        },
        xwayland::selection::{SelectionKind, XSelections, mime::atom_to_mime},
    },
    std::rc::Rc,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum TargetsError {
    #[error("Could not retrieve the targets property")]
    Fetch(#[source] XconError),
    #[error("The targets property has type {0} instead of ATOM")]
    NotAtoms(u32),
}

impl XSelections {
    pub(super) fn handle_targets(self: &Rc<Self>, kind: SelectionKind) {
        if self.config.require_focus && !self.seat.has_focus() {
            log::debug!(
                "Not publishing the {:?} selection because no X surface has focus",
                kind
            );
            return;
        }
        let Some(location) = IpcLocation::for_selection(kind) else {
            log::debug!("Ignoring the targets of the X drag-and-drop selection");
            return;
        };
        let mime_types = match self.get_targets(kind) {
            Ok(t) => t,
            Err(e) => {
                log::error!("Could not get the targets of {:?}: {}", kind, ErrorFmt(e));
                return;
            }
        };
        let source = Rc::new(XDataSource::new(self, kind, location, mime_types));
        log::debug!(
            "Publishing X data source {} with mime types {:?}",
            source.id,
            source.mime_types(),
        );
        *self.selections[kind].source.borrow_mut() = Rc::downgrade(&source);
        set_seat_selection(&*self.seat, &source);
    }

    fn get_targets(&self, kind: SelectionKind) -> Result<Vec<XMimeType>, TargetsError> {
        let selection = &self.selections[kind];
        let req = GetProperty {
            delete: true,
            window: selection.window,
            property: self.atoms._WL_SELECTION,
            ty: ATOM_ANY,
            long_offset: 0,
            long_length: self.config.targets_length,
        };
        let reply = self.c.get_property(&req).map_err(TargetsError::Fetch)?;
        if reply.ty != ATOM_ATOM {
            return Err(TargetsError::NotAtoms(reply.ty));
        }
        let mut mime_types = vec![];
        for atom in reply.values32() {
            if let Some(mime_type) = atom_to_mime(&*self.c, &self.atoms, atom) {
                mime_types.push(XMimeType { mime_type, atom });
            }
        }
        Ok(mime_types)
    }
}
