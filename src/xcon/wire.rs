use {
    byteorder::{ByteOrder, NativeEndian},
    std::fmt::{Debug, Formatter},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GetProperty {
    pub delete: bool,
    pub window: u32,
    pub property: u32,
    pub ty: u32,
    pub long_offset: u32,
    pub long_length: u32,
}

#[derive(Clone, Default, Eq, PartialEq)]
pub struct GetPropertyReply {
    pub format: u8,
    pub ty: u32,
    pub bytes_after: u32,
    /// The length of `data` in units of `format` bits.
    pub value_len: u32,
    pub data: Vec<u8>,
}

impl GetPropertyReply {
    /// Iterates over the value of a property with format 32.
    pub fn values32(&self) -> impl Iterator<Item = u32> + '_ {
        let data: &[u8] = match self.format {
            32 => &self.data,
            _ => &[],
        };
        data.chunks_exact(4).map(NativeEndian::read_u32)
    }
}

impl Debug for GetPropertyReply {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetPropertyReply")
            .field("format", &self.format)
            .field("ty", &self.ty)
            .field("bytes_after", &self.bytes_after)
            .field("value_len", &self.value_len)
            .field("data", &format_args!("[{} bytes]", self.data.len()))
            .finish()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConvertSelection {
    pub requestor: u32,
    pub selection: u32,
    pub target: u32,
    pub property: u32,
    pub time: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SelectionNotify {
    pub time: u32,
    pub requestor: u32,
    pub selection: u32,
    pub target: u32,
    pub property: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PropertyNotify {
    pub window: u32,
    pub atom: u32,
    pub time: u32,
    pub state: u8,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct XfixesSelectionNotify {
    pub subtype: u8,
    pub window: u32,
    pub owner: u32,
    pub selection: u32,
    pub timestamp: u32,
    pub selection_timestamp: u32,
}
