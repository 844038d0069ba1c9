use {
    crate::{
        config::SelectionConfig,
        event_loop::{EventLoopDispatcher, EventLoopError, EventLoopId, Reactor},
        ifs::ipc::{SelectionSeat, data_sink::DataSink, x_data_source::XDataSource},
        logger::Logger,
        utils::{numcell::NumCell, oserror::OsError},
        xcon::{
            ConvertSelection, GetProperty, GetPropertyReply, PropertyNotify, SelectionNotify,
            XConnection, XconError, XfixesSelectionNotify,
            consts::{ATOM_ATOM, ATOM_NONE, PROPERTY_NEW_VALUE},
        },
        xwayland::selection::{Atoms, SelectionEvent, SelectionKind, XSelections},
    },
    ahash::AHashMap,
    bstr::BString,
    byteorder::{ByteOrder, NativeEndian},
    log::Level,
    std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
        error::Error,
        rc::Rc,
    },
    uapi::c,
};

pub const WINDOW: u32 = 7;
pub const OWNER: u32 = 9;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    GetProperty(GetProperty),
    GetAtomName(u32),
    ConvertSelection(ConvertSelection),
    DeleteProperty { window: u32, property: u32 },
    Flush,
}

struct TestProperty {
    ty: u32,
    format: u8,
    data: Vec<u8>,
}

/// An X server that only knows atoms and window properties.
pub struct TestXcon {
    next_atom: NumCell<u32>,
    atoms: RefCell<AHashMap<String, u32>>,
    names: RefCell<AHashMap<u32, BString>>,
    properties: RefCell<AHashMap<(u32, u32), TestProperty>>,
    pub requests: RefCell<Vec<Request>>,
    pub fail_get_property: Cell<bool>,
    pub fail_convert: Cell<bool>,
}

impl TestXcon {
    pub fn new() -> Self {
        Self {
            next_atom: NumCell::new(100),
            atoms: Default::default(),
            names: Default::default(),
            properties: Default::default(),
            requests: Default::default(),
            fail_get_property: Cell::new(false),
            fail_convert: Cell::new(false),
        }
    }

    pub fn atom(&self, name: &str) -> u32 {
        if let Some(atom) = self.atoms.borrow().get(name) {
            return *atom;
        }
        let atom = self.next_atom.fetch_add(1);
        self.atoms.borrow_mut().insert(name.to_string(), atom);
        self.names.borrow_mut().insert(atom, name.into());
        atom
    }

    pub fn set_property(&self, window: u32, property: u32, ty: u32, format: u8, data: &[u8]) {
        let prop = TestProperty {
            ty,
            format,
            data: data.to_vec(),
        };
        self.properties.borrow_mut().insert((window, property), prop);
    }

    pub fn set_atoms(&self, window: u32, property: u32, atoms: &[u32]) {
        let mut data = vec![0; atoms.len() * 4];
        NativeEndian::write_u32_into(atoms, &mut data);
        self.set_property(window, property, ATOM_ATOM, 32, &data);
    }

    pub fn has_property(&self, window: u32, property: u32) -> bool {
        self.properties.borrow().contains_key(&(window, property))
    }

    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }

    pub fn conversions(&self) -> Vec<ConvertSelection> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|r| match r {
                Request::ConvertSelection(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    pub fn fetches(&self) -> Vec<GetProperty> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|r| match r {
                Request::GetProperty(g) => Some(*g),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| matches!(r, Request::DeleteProperty { .. }))
            .count()
    }

    pub fn name_lookups(&self) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| matches!(r, Request::GetAtomName(_)))
            .count()
    }
}

impl XConnection for TestXcon {
    fn intern_atom(&self, name: &str) -> Result<u32, XconError> {
        Ok(self.atom(name))
    }

    fn get_property(&self, req: &GetProperty) -> Result<GetPropertyReply, XconError> {
        self.requests.borrow_mut().push(Request::GetProperty(*req));
        if self.fail_get_property.get() {
            return Err(XconError::Dead);
        }
        let mut properties = self.properties.borrow_mut();
        let key = (req.window, req.property);
        let Some(prop) = properties.get(&key) else {
            return Ok(GetPropertyReply {
                ty: ATOM_NONE,
                ..Default::default()
            });
        };
        let len = prop.data.len();
        let offset = 4 * req.long_offset as usize;
        if offset > len {
            return Err(XconError::CoreError(2));
        }
        let n = (len - offset).min(4 * req.long_length as usize);
        let data = prop.data[offset..offset + n].to_vec();
        let reply = GetPropertyReply {
            format: prop.format,
            ty: prop.ty,
            bytes_after: (len - offset - n) as u32,
            value_len: (n / (prop.format as usize / 8).max(1)) as u32,
            data,
        };
        if req.delete && reply.bytes_after == 0 {
            properties.remove(&key);
        }
        Ok(reply)
    }

    fn get_atom_name(&self, atom: u32) -> Result<BString, XconError> {
        self.requests.borrow_mut().push(Request::GetAtomName(atom));
        match self.names.borrow().get(&atom) {
            Some(name) => Ok(name.clone()),
            None => Err(XconError::CoreError(5)),
        }
    }

    fn convert_selection(&self, req: &ConvertSelection) -> Result<(), XconError> {
        self.requests.borrow_mut().push(Request::ConvertSelection(*req));
        if self.fail_convert.get() {
            return Err(XconError::Dead);
        }
        Ok(())
    }

    fn delete_property(&self, window: u32, property: u32) -> Result<(), XconError> {
        self.requests
            .borrow_mut()
            .push(Request::DeleteProperty { window, property });
        self.properties.borrow_mut().remove(&(window, property));
        Ok(())
    }

    fn flush(&self) -> Result<(), XconError> {
        self.requests.borrow_mut().push(Request::Flush);
        Ok(())
    }
}

#[derive(Default)]
pub struct TestSeat {
    pub focus: Cell<bool>,
    serial: NumCell<u32>,
    pub serials: RefCell<Vec<u32>>,
    pub selection: RefCell<Option<Rc<XDataSource>>>,
    pub primary: RefCell<Option<Rc<XDataSource>>>,
    pub unset_selection: Cell<usize>,
    pub unset_primary: Cell<usize>,
}

impl TestSeat {
    fn replace(&self, slot: &RefCell<Option<Rc<XDataSource>>>, new: Option<Rc<XDataSource>>) {
        let old = slot.replace(new);
        if let Some(old) = old {
            old.destroy();
        }
    }
}

impl SelectionSeat for TestSeat {
    fn has_focus(&self) -> bool {
        self.focus.get()
    }

    fn next_serial(&self) -> u32 {
        self.serial.fetch_add(1)
    }

    fn set_selection(&self, source: Rc<XDataSource>, serial: u32) {
        self.serials.borrow_mut().push(serial);
        self.replace(&self.selection, Some(source));
    }

    fn set_primary_selection(&self, source: Rc<XDataSource>, serial: u32) {
        self.serials.borrow_mut().push(serial);
        self.replace(&self.primary, Some(source));
    }

    fn unset_selection(&self, serial: u32) {
        self.serials.borrow_mut().push(serial);
        self.unset_selection.set(self.unset_selection.get() + 1);
        self.replace(&self.selection, None);
    }

    fn unset_primary_selection(&self, serial: u32) {
        self.serials.borrow_mut().push(serial);
        self.unset_primary.set(self.unset_primary.get() + 1);
        self.replace(&self.primary, None);
    }
}

/// A reactor whose watches only fire when the test says so.
#[derive(Default)]
pub struct TestReactor {
    next_id: NumCell<u64>,
    pub watches: RefCell<AHashMap<u64, (c::c_int, Rc<dyn EventLoopDispatcher>)>>,
    pub fail: Cell<bool>,
}

impl TestReactor {
    /// Dispatches every registered watch once. Returns the number of dispatches.
    pub fn fire(&self) -> usize {
        let mut ids: Vec<_> = self.watches.borrow().keys().copied().collect();
        ids.sort();
        let mut fired = 0;
        for id in ids {
            let dispatcher = match self.watches.borrow().get(&id) {
                Some((_, d)) => d.clone(),
                None => continue,
            };
            dispatcher.dispatch(c::EPOLLOUT).unwrap();
            fired += 1;
        }
        fired
    }

    pub fn len(&self) -> usize {
        self.watches.borrow().len()
    }
}

impl Reactor for TestReactor {
    fn watch_writable(
        &self,
        fd: c::c_int,
        dispatcher: Rc<dyn EventLoopDispatcher>,
    ) -> Result<EventLoopId, EventLoopError> {
        if self.fail.get() {
            return Err(EventLoopError::Destroyed);
        }
        let id = self.next_id.fetch_add(1);
        self.watches.borrow_mut().insert(id, (fd, dispatcher));
        Ok(EventLoopId(id))
    }

    fn unwatch(&self, id: EventLoopId) {
        assert!(self.watches.borrow_mut().remove(&id.0).is_some());
    }
}

#[derive(Default)]
pub struct SinkState {
    pub data: RefCell<Vec<u8>>,
    pub writes: RefCell<Vec<usize>>,
    /// The maximum sizes of the next writes. A limit of 0 makes the write fail with
    /// `EAGAIN`.
    pub limits: RefCell<VecDeque<usize>>,
    pub broken: Cell<bool>,
    pub nonblock: Cell<bool>,
    pub closed: Cell<bool>,
}

pub struct TestSink {
    state: Rc<SinkState>,
}

impl DataSink for TestSink {
    fn raw(&self) -> c::c_int {
        1000
    }

    fn set_nonblock(&self) -> Result<(), OsError> {
        self.state.nonblock.set(true);
        Ok(())
    }

    fn write(&self, buf: &[u8]) -> Result<usize, OsError> {
        if self.state.broken.get() {
            return Err(OsError(c::EPIPE));
        }
        let n = match self.state.limits.borrow_mut().pop_front() {
            Some(0) => return Err(OsError(c::EAGAIN)),
            Some(limit) => limit.min(buf.len()),
            None => buf.len(),
        };
        self.state.data.borrow_mut().extend_from_slice(&buf[..n]);
        self.state.writes.borrow_mut().push(n);
        Ok(n)
    }
}

impl Drop for TestSink {
    fn drop(&mut self) {
        self.state.closed.set(true);
    }
}

pub fn sink() -> (Rc<dyn DataSink>, Rc<SinkState>) {
    let state = Rc::new(SinkState::default());
    let sink = Rc::new(TestSink {
        state: state.clone(),
    });
    (sink, state)
}

pub fn install_logger() {
    Logger::install_stderr(Level::Debug).unwrap();
}

pub struct Harness {
    pub xcon: Rc<TestXcon>,
    pub seat: Rc<TestSeat>,
    pub reactor: Rc<TestReactor>,
    pub selections: Rc<XSelections>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SelectionConfig::default())
    }

    pub fn with_config(config: SelectionConfig) -> Self {
        install_logger();
        let reactor = Rc::new(TestReactor::default());
        let xcon = Rc::new(TestXcon::new());
        let seat = Rc::new(TestSeat::default());
        seat.focus.set(true);
        let selections =
            XSelections::new(xcon.clone(), seat.clone(), reactor.clone(), WINDOW, config)
                .unwrap();
        Self {
            xcon,
            seat,
            reactor,
            selections,
        }
    }

    pub fn atoms(&self) -> Atoms {
        *self.selections.atoms()
    }

    pub fn selection_atom(&self, kind: SelectionKind) -> u32 {
        self.selections.selection(kind).atom
    }

    pub fn event(&self, event: SelectionEvent) -> bool {
        self.selections.handle_event(&event)
    }

    pub fn set_owner(&self, kind: SelectionKind, owner: u32, timestamp: u32) -> bool {
        self.event(SelectionEvent::XfixesSelectionNotify(XfixesSelectionNotify {
            subtype: 0,
            window: WINDOW,
            owner,
            selection: self.selection_atom(kind),
            timestamp,
            selection_timestamp: timestamp,
        }))
    }

    pub fn selection_notify(&self, kind: SelectionKind, target: u32, property: u32) -> bool {
        self.event(SelectionEvent::SelectionNotify(SelectionNotify {
            time: 0,
            requestor: WINDOW,
            selection: self.selection_atom(kind),
            target,
            property,
        }))
    }

    /// Lets an X client take the selection and answer the `TARGETS` request.
    pub fn offer(&self, kind: SelectionKind, targets: &[&str]) -> bool {
        self.set_owner(kind, OWNER, 1);
        let atoms: Vec<_> = targets.iter().map(|t| self.xcon.atom(t)).collect();
        let atoms_ = self.atoms();
        self.xcon.set_atoms(WINDOW, atoms_._WL_SELECTION, &atoms);
        self.selection_notify(kind, atoms_.TARGETS, atoms_._WL_SELECTION)
    }

    pub fn clipboard(&self) -> Rc<XDataSource> {
        self.seat.selection.borrow().clone().unwrap()
    }

    pub fn primary(&self) -> Rc<XDataSource> {
        self.seat.primary.borrow().clone().unwrap()
    }

    /// Answers a data conversion with a value that fits into a single property.
    pub fn reply_data(&self, kind: SelectionKind, target: u32, data: &[u8]) -> bool {
        let property = self.atoms()._WL_SELECTION;
        self.xcon.set_property(WINDOW, property, target, 8, data);
        self.selection_notify(kind, target, property)
    }

    /// Answers a data conversion by starting an `INCR` transfer.
    pub fn reply_incr(&self, kind: SelectionKind, target: u32, size: u32) -> bool {
        let atoms = self.atoms();
        self.xcon
            .set_property(WINDOW, atoms._WL_SELECTION, atoms.INCR, 32, &size.to_ne_bytes());
        self.selection_notify(kind, target, atoms._WL_SELECTION)
    }

    pub fn reply_failure(&self, kind: SelectionKind, target: u32) -> bool {
        self.selection_notify(kind, target, ATOM_NONE)
    }

    pub fn incr_chunk(&self, target: u32, data: &[u8]) -> bool {
        let property = self.atoms()._WL_SELECTION;
        self.xcon.set_property(WINDOW, property, target, 8, data);
        self.event(SelectionEvent::PropertyNotify(PropertyNotify {
            window: WINDOW,
            atom: property,
            time: 0,
            state: PROPERTY_NEW_VALUE,
        }))
    }
}

pub struct StopWhenIdle<F: Fn() -> bool> {
    pub idle: F,
    pub stop: Box<dyn Fn()>,
}

impl<F: Fn() -> bool> EventLoopDispatcher for StopWhenIdle<F> {
    fn dispatch(&self, _events: i32) -> Result<(), Box<dyn Error>> {
        if (self.idle)() {
            (self.stop)();
        }
        Ok(())
    }
}
