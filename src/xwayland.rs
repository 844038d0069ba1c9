use {
    crate::{config::ConfigError, xcon::XconError},
    thiserror::Error,
};

pub mod selection;

#[derive(Debug, Error)]
pub enum XWaylandError {
    #[error("Could not load the atoms")]
    LoadAtoms(#[source] XconError),
    #[error("The selection config is invalid")]
    Config(#[source] ConfigError),
}
