mod convert;
mod decoder;
mod encoder;
mod error;
mod graph_io;
mod midi_io;
mod model;
mod provenance;
mod store;
mod timing;
mod util;

pub use convert::*;
pub use decoder::*;
pub use encoder::*;
pub use error::*;
pub use graph_io::*;
pub use midi_io::*;
pub use model::config::*;
pub use model::piece::*;
pub use model::statement::*;
pub use model::vocab::*;
pub use provenance::*;
pub use store::*;
pub use timing::*;
pub use util::*;
