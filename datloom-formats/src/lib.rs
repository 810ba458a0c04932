//! Parsers and writers for the DAT dialect zoo.
//!
//! Every dialect converts to and from the canonical tree in
//! [`datloom_core`]; cross-dialect conversion always goes through that
//! tree, never dialect to dialect.

pub mod attractmode;
pub mod block;
pub mod clrmamepro;
pub mod doscenter;
pub mod error;
pub mod everdrive;
pub mod format;
pub mod hashfile;
pub mod listrom;
pub mod logiqx;
pub mod romcenter;
pub mod separated;

pub use error::DatError;
pub use format::{Format, convert};
pub use hashfile::HashKind;
