pub const ATOM_NONE: u32 = 0;
pub const ATOM_ANY: u32 = 0;
pub const ATOM_ATOM: u32 = 4;

pub const WINDOW_NONE: u32 = 0;

pub const TIME_CURRENT_TIME: u32 = 0;

pub const PROPERTY_NEW_VALUE: u8 = 0;
pub const PROPERTY_DELETE: u8 = 1;
