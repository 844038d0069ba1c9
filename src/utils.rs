pub mod errorfmt;
pub mod nonblock;
pub mod numcell;
pub mod oserror;
pub mod rc_eq;
