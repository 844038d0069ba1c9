use {
    crate::{
        ifs::ipc::{IpcLocation, unset_seat_selection},
        utils::errorfmt::ErrorFmt,
        xcon::{ConvertSelection, XfixesSelectionNotify, consts::WINDOW_NONE},
        xwayland::selection::{SelectionKind, XSelections},
    },
    std::rc::Rc,
};

impl XSelections {
    pub fn handle_xfixes_selection_notify(self: &Rc<Self>, event: &XfixesSelectionNotify) -> bool {
        let Some(kind) = self.kind_of(event.selection) else {
            return false;
        };
        if kind == SelectionKind::Primary && !self.config.primary_selection {
            return false;
        }
        let selection = &self.selections[kind];
        log::debug!(
            "XFIXES_SELECTION_NOTIFY (subtype={}, window={}, selection={:?}, owner={}, timestamp={}, selection_timestamp={})",
            event.subtype,
            event.window,
            kind,
            event.owner,
            event.timestamp,
            event.selection_timestamp,
        );
        if event.owner == WINDOW_NONE {
            if selection.owner.get() != selection.window {
                match IpcLocation::for_selection(kind) {
                    Some(location) => unset_seat_selection(&*self.seat, location),
                    None => log::debug!("The X drag-and-drop selection was cleared"),
                }
            }
            selection.owner.set(WINDOW_NONE);
            return true;
        }
        selection.owner.set(event.owner);
        if event.owner == selection.window {
            selection.timestamp.set(event.timestamp);
            return true;
        }
        if let Some(transfer) = &mut *selection.transfer.borrow_mut() {
            transfer.incr = false;
        }
        let req = ConvertSelection {
            requestor: selection.window,
            selection: selection.atom,
            target: self.atoms.TARGETS,
            property: self.atoms._WL_SELECTION,
            time: event.timestamp,
        };
        if let Err(e) = self.c.convert_selection(&req) {
            log::error!("Could not request the targets of {:?}: {}", kind, ErrorFmt(e));
            return true;
        }
        if let Err(e) = self.c.flush() {
            log::error!("Could not flush the X connection: {}", ErrorFmt(e));
        }
        true
    }
}
