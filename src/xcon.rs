use {bstr::BString, thiserror::Error};

pub mod consts;
pub mod wire;

pub use wire::{
    ConvertSelection, GetProperty, GetPropertyReply, PropertyNotify, SelectionNotify,
    XfixesSelectionNotify,
};

#[derive(Debug, Error)]
pub enum XconError {
    #[error("The connection to the server has already been closed")]
    Dead,
    #[error("The server did not send a reply to a request")]
    MissingReply,
    #[error("The server returned error {0}")]
    CoreError(u8),
    #[error("The server sent a malformed reply")]
    MalformedReply,
}

/// The X connection as seen by the selection bridge.
///
/// Requests that produce a reply return once the reply is available. All other
/// requests are only queued and reach the server with the next `flush`.
pub trait XConnection {
    fn intern_atom(&self, name: &str) -> Result<u32, XconError>;

    fn get_property(&self, req: &GetProperty) -> Result<GetPropertyReply, XconError>;

    fn get_atom_name(&self, atom: u32) -> Result<BString, XconError>;

    fn convert_selection(&self, req: &ConvertSelection) -> Result<(), XconError>;

    fn delete_property(&self, window: u32, property: u32) -> Result<(), XconError>;

    fn flush(&self) -> Result<(), XconError>;
}
