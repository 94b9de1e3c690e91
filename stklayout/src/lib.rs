pub mod boundary;
pub mod config;
pub mod design;
pub mod error;
pub mod io;
pub mod layout;
pub mod pass;
pub mod rect;
pub mod stack;
pub mod stats;
pub mod synth;
pub mod tech;
pub mod validation;

pub use self::config::LayoutConfig;
pub use self::design::{Circuit, Design, Instance};
pub use self::error::{Result, StkError};
pub use self::pass::{CellLayout, StackLayoutPass};

pub(crate) mod log;
