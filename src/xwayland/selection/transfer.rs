use {
    crate::{
        event_loop::{EventLoopDispatcher, EventLoopId},
        ifs::ipc::{data_sink::DataSink, x_data_source::XDataSourceError},
        utils::{errorfmt::ErrorFmt, oserror::OsError, rc_eq::rc_eq},
        xcon::{
            ConvertSelection, GetProperty, GetPropertyReply, PropertyNotify, XconError,
            consts::{ATOM_ANY, PROPERTY_DELETE, PROPERTY_NEW_VALUE, TIME_CURRENT_TIME},
        },
        xwayland::selection::{SelectionKind, SelectionState, XSelections},
    },
    isnt::std_1::primitive::IsntSliceExt,
    linearize::LinearizeExt,
    std::{
        error::Error,
        rc::{Rc, Weak},
    },
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransferPhase {
    /// The conversion has been requested but no data has arrived yet.
    Requested,
    /// A chunk of data is being written to the sink.
    Streaming,
    /// Waiting for the owner to write the next `INCR` chunk.
    Incremental,
    /// The sink has been closed. The remaining `INCR` chunks are discarded.
    Draining,
}

struct PendingChunk {
    data: Vec<u8>,
    offset: usize,
}

pub(super) struct SelectionTransfer {
    pub(super) sink: Option<Rc<dyn DataSink>>,
    pub(super) incr: bool,
    chunk: Option<PendingChunk>,
    watch: Option<EventLoopId>,
}

enum WriteStatus {
    Idle,
    Blocked,
    ChunkDone,
    Failed(OsError),
}

impl SelectionTransfer {
    fn new(sink: Rc<dyn DataSink>) -> Self {
        Self {
            sink: Some(sink),
            incr: false,
            chunk: None,
            watch: None,
        }
    }

    pub(super) fn phase(&self) -> TransferPhase {
        if self.sink.is_none() {
            TransferPhase::Draining
        } else if self.chunk.is_some() {
            TransferPhase::Streaming
        } else if self.incr {
            TransferPhase::Incremental
        } else {
            TransferPhase::Requested
        }
    }

    fn write(&mut self) -> WriteStatus {
        let (Some(sink), Some(chunk)) = (&self.sink, &mut self.chunk) else {
            return WriteStatus::Idle;
        };
        let pending = &chunk.data[chunk.offset..];
        if pending.is_not_empty() {
            match sink.write(pending) {
                Ok(n) => chunk.offset += n,
                Err(e) if e.is_retryable() => return WriteStatus::Blocked,
                Err(e) => {
                    self.chunk = None;
                    return WriteStatus::Failed(e);
                }
            }
        }
        if chunk.offset < chunk.data.len() {
            return WriteStatus::Blocked;
        }
        self.chunk = None;
        WriteStatus::ChunkDone
    }
}

impl SelectionState {
    /// The number of bytes of the current chunk that have already been written.
    pub fn pending_offset(&self) -> Option<usize> {
        let transfer = self.transfer.borrow();
        transfer.as_ref()?.chunk.as_ref().map(|c| c.offset)
    }

    pub fn is_incremental(&self) -> bool {
        self.transfer.borrow().as_ref().is_some_and(|t| t.incr)
    }

    pub fn has_watch(&self) -> bool {
        self.transfer
            .borrow()
            .as_ref()
            .is_some_and(|t| t.watch.is_some())
    }
}

struct TransferWriter {
    selections: Weak<XSelections>,
    kind: SelectionKind,
}

impl EventLoopDispatcher for TransferWriter {
    fn dispatch(&self, _events: i32) -> Result<(), Box<dyn Error>> {
        if let Some(selections) = self.selections.upgrade() {
            selections.write_chunk(self.kind);
        }
        Ok(())
    }
}

impl XSelections {
    pub(crate) fn start_transfer(
        &self,
        kind: SelectionKind,
        target: u32,
        sink: Rc<dyn DataSink>,
    ) -> Result<(), XDataSourceError> {
        if self.is_destroyed() {
            return Err(XDataSourceError::BridgeDestroyed);
        }
        let selection = &self.selections[kind];
        if let Some(transfer) = &*selection.transfer.borrow() {
            if transfer.sink.as_ref().is_some_and(|s| rc_eq(s, &sink)) {
                log::debug!("The fd is already the destination of the {:?} transfer", kind);
                return Ok(());
            }
            log::error!(
                "Cannot send the {:?} selection: another transfer is in progress",
                kind
            );
            return Err(XDataSourceError::TransferInProgress);
        }
        sink.set_nonblock().map_err(XDataSourceError::SetNonblock)?;
        let req = ConvertSelection {
            requestor: selection.window,
            selection: selection.atom,
            target,
            property: self.atoms._WL_SELECTION,
            time: TIME_CURRENT_TIME,
        };
        self.c
            .convert_selection(&req)
            .map_err(XDataSourceError::ConvertSelection)?;
        self.c.flush().map_err(XDataSourceError::ConvertSelection)?;
        log::debug!("Requested conversion of {:?} to atom {}", kind, target);
        *selection.transfer.borrow_mut() = Some(SelectionTransfer::new(sink));
        Ok(())
    }

    pub(super) fn get_data(self: &Rc<Self>, kind: SelectionKind) {
        let selection = &self.selections[kind];
        let busy = match &*selection.transfer.borrow() {
            None => None,
            Some(t) => Some(t.chunk.is_some() || t.incr),
        };
        match busy {
            None => {
                log::debug!("Discarding {:?} data without a transfer", kind);
                self.delete_selection_property(kind);
                return;
            }
            Some(true) => {
                log::error!("Received {:?} data while a transfer is still streaming", kind);
                return;
            }
            Some(false) => {}
        }
        let reply = match self.read_selection_property(kind, true) {
            Ok(r) => r,
            Err(e) => {
                log::error!("Could not retrieve the {:?} data: {}", kind, ErrorFmt(e));
                self.finish_transfer(kind);
                return;
            }
        };
        if reply.ty == self.atoms.INCR {
            log::debug!("Starting an INCR transfer of {:?}", kind);
            if let Some(t) = &mut *selection.transfer.borrow_mut() {
                t.incr = true;
            }
            return;
        }
        if reply.bytes_after > 0 {
            log::warn!(
                "The {:?} data has been truncated, {} bytes were not retrieved",
                kind,
                reply.bytes_after,
            );
        }
        self.write_selection_property(kind, reply.data);
    }

    /// Returns whether the event belonged to the proxy window.
    pub fn handle_property_notify(self: &Rc<Self>, event: &PropertyNotify) -> bool {
        let on_proxy = SelectionKind::variants().any(|k| self.selections[k].window == event.window);
        if !on_proxy {
            return false;
        }
        if event.atom != self.atoms._WL_SELECTION {
            return true;
        }
        if event.state == PROPERTY_DELETE {
            log::debug!("The selection property of window {} was deleted", event.window);
            return true;
        }
        if event.state != PROPERTY_NEW_VALUE {
            return true;
        }
        // All selections share the proxy window. The first incremental transfer
        // receives the chunk.
        let kind = SelectionKind::variants().find(|&k| {
            self.selections[k].window == event.window && self.selections[k].is_incremental()
        });
        if let Some(kind) = kind {
            self.get_incr_chunk(kind);
        }
        true
    }

    fn get_incr_chunk(self: &Rc<Self>, kind: SelectionKind) {
        let selection = &self.selections[kind];
        let (draining, pending) = match &*selection.transfer.borrow() {
            None => return,
            Some(t) => (t.sink.is_none(), t.chunk.is_some()),
        };
        if pending {
            log::error!("Received a new {:?} chunk before the last one was written", kind);
            return;
        }
        let reply = match draining {
            true => self.get_selection_property(kind, false, 0, 0),
            false => self.read_selection_property(kind, false),
        };
        let reply = match reply {
            Ok(r) => r,
            Err(e) => {
                log::error!("Could not retrieve an INCR chunk of {:?}: {}", kind, ErrorFmt(e));
                self.finish_transfer(kind);
                return;
            }
        };
        if reply.data.is_empty() && reply.bytes_after == 0 {
            log::debug!("INCR transfer of {:?} complete", kind);
            self.finish_transfer(kind);
            return;
        }
        if draining {
            self.delete_selection_property(kind);
            return;
        }
        if reply.bytes_after > 0 {
            log::warn!(
                "An INCR chunk of {:?} has been truncated, {} bytes were not retrieved",
                kind,
                reply.bytes_after,
            );
        }
        self.write_selection_property(kind, reply.data);
    }

    fn write_selection_property(self: &Rc<Self>, kind: SelectionKind, data: Vec<u8>) {
        if let Some(t) = &mut *self.selections[kind].transfer.borrow_mut() {
            t.chunk = Some(PendingChunk { data, offset: 0 });
        }
        self.write_chunk(kind);
    }

    fn write_chunk(self: &Rc<Self>, kind: SelectionKind) {
        let selection = &self.selections[kind];
        let (status, incr) = match &mut *selection.transfer.borrow_mut() {
            None => return,
            Some(t) => (t.write(), t.incr),
        };
        match status {
            WriteStatus::Idle => self.remove_watch(kind),
            WriteStatus::Blocked => self.ensure_watch(kind),
            WriteStatus::ChunkDone if incr => self.notify_ready_for_next_incr_chunk(kind),
            WriteStatus::ChunkDone => {
                log::debug!("Transfer of {:?} complete", kind);
                self.finish_transfer(kind);
            }
            WriteStatus::Failed(e) => {
                log::error!("Could not write the {:?} selection: {}", kind, ErrorFmt(e));
                self.abandon_sink(kind);
            }
        }
    }

    /// Closes the sink. An `INCR` owner keeps being answered until its last chunk.
    fn abandon_sink(&self, kind: SelectionKind) {
        let sink = match &mut *self.selections[kind].transfer.borrow_mut() {
            Some(t) if t.incr => {
                t.chunk = None;
                t.sink.take()
            }
            _ => None,
        };
        if sink.is_none() {
            self.finish_transfer(kind);
            return;
        }
        drop(sink);
        self.notify_ready_for_next_incr_chunk(kind);
    }

    fn ensure_watch(self: &Rc<Self>, kind: SelectionKind) {
        let selection = &self.selections[kind];
        let fd = match &*selection.transfer.borrow() {
            Some(SelectionTransfer {
                sink: Some(sink),
                watch: None,
                ..
            }) => sink.raw(),
            _ => return,
        };
        let writer = Rc::new(TransferWriter {
            selections: Rc::downgrade(self),
            kind,
        });
        let id = match self.reactor.watch_writable(fd, writer) {
            Ok(id) => id,
            Err(e) => {
                log::error!("Could not wait for the {:?} fd: {}", kind, ErrorFmt(e));
                self.abandon_sink(kind);
                return;
            }
        };
        let stale = match &mut *selection.transfer.borrow_mut() {
            Some(t) => t.watch.replace(id),
            None => Some(id),
        };
        if let Some(stale) = stale {
            self.reactor.unwatch(stale);
        }
    }

    fn remove_watch(&self, kind: SelectionKind) {
        let watch = match &mut *self.selections[kind].transfer.borrow_mut() {
            Some(t) => t.watch.take(),
            None => None,
        };
        if let Some(watch) = watch {
            self.reactor.unwatch(watch);
        }
    }

    fn notify_ready_for_next_incr_chunk(&self, kind: SelectionKind) {
        self.remove_watch(kind);
        self.delete_selection_property(kind);
    }

    pub(super) fn delete_selection_property(&self, kind: SelectionKind) {
        let window = self.selections[kind].window;
        if let Err(e) = self.c.delete_property(window, self.atoms._WL_SELECTION) {
            log::error!("Could not delete the selection property: {}", ErrorFmt(e));
            return;
        }
        if let Err(e) = self.c.flush() {
            log::error!("Could not flush the X connection: {}", ErrorFmt(e));
        }
    }

    fn get_selection_property(
        &self,
        kind: SelectionKind,
        delete: bool,
        long_offset: u32,
        long_length: u32,
    ) -> Result<GetPropertyReply, XconError> {
        let req = GetProperty {
            delete,
            window: self.selections[kind].window,
            property: self.atoms._WL_SELECTION,
            ty: ATOM_ANY,
            long_offset,
            long_length,
        };
        self.c.get_property(&req)
    }

    /// Reads the whole selection property in pieces of at most `chunk-length` units.
    ///
    /// With `delete`, the server removes the property together with the last piece.
    fn read_selection_property(
        &self,
        kind: SelectionKind,
        delete: bool,
    ) -> Result<GetPropertyReply, XconError> {
        let length = self.config.chunk_length;
        let mut reply = self.get_selection_property(kind, delete, 0, length)?;
        while reply.bytes_after > 0 {
            let offset = (reply.data.len() / 4) as u32;
            let next = self.get_selection_property(kind, delete, offset, length)?;
            if next.data.is_empty() {
                break;
            }
            reply.data.extend_from_slice(&next.data);
            reply.value_len += next.value_len;
            reply.bytes_after = next.bytes_after;
        }
        Ok(reply)
    }

    /// Releases the chunk, the watch and the sink of the transfer of `kind`.
    pub(super) fn finish_transfer(&self, kind: SelectionKind) {
        let transfer = self.selections[kind].transfer.borrow_mut().take();
        let Some(mut transfer) = transfer else {
            return;
        };
        if let Some(watch) = transfer.watch.take() {
            self.reactor.unwatch(watch);
        }
        log::debug!("Finished the transfer of {:?}", kind);
    }
}
