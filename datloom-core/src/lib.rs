pub mod item;
pub mod model;

pub use item::{DatItem, Disk, ItemStatus, Media, Rom, Sample};
pub use model::{Header, Machine, MetadataFile};
