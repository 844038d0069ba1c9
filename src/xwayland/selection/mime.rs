use {
    crate::{utils::errorfmt::ErrorFmt, xcon::XConnection, xwayland::selection::Atoms},
    bstr::ByteSlice,
};

pub const TEXT_PLAIN_UTF8: &str = "text/plain;charset=utf-8";
pub const TEXT_PLAIN: &str = "text/plain";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AtomMime {
    Fixed(&'static str),
    Skip,
    Lookup,
}

/// Classifies a target atom without talking to the server.
pub fn classify_atom(atoms: &Atoms, atom: u32) -> AtomMime {
    if atom == atoms.UTF8_STRING {
        AtomMime::Fixed(TEXT_PLAIN_UTF8)
    } else if atom == atoms.TEXT {
        AtomMime::Fixed(TEXT_PLAIN)
    } else if atom == atoms.TARGETS || atom == atoms.TIMESTAMP {
        AtomMime::Skip
    } else {
        AtomMime::Lookup
    }
}

/// Returns the mime type of a target atom.
///
/// Atoms whose names do not look like mime types are not offered to wayland clients.
pub fn atom_to_mime(c: &dyn XConnection, atoms: &Atoms, atom: u32) -> Option<String> {
    match classify_atom(atoms, atom) {
        AtomMime::Fixed(mime) => Some(mime.to_string()),
        AtomMime::Skip => None,
        AtomMime::Lookup => {
            let name = match c.get_atom_name(atom) {
                Ok(n) => n,
                Err(e) => {
                    log::warn!("Could not get the name of atom {}: {}", atom, ErrorFmt(e));
                    return None;
                }
            };
            name.find_byte(b'/')?;
            Some(name.to_str_lossy().into_owned())
        }
    }
}
