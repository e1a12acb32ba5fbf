//! CLI command implementations

pub(crate) mod common;
pub(crate) mod down;
pub(crate) mod history;
pub(crate) mod new;
pub(crate) mod status;
pub(crate) mod unlock;
pub(crate) mod up;
pub(crate) mod verify;
