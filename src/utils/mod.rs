//! Table I/O utilities

pub mod data_loader;
pub mod sink;

pub use data_loader::{DataLoader, DataSaver, TableFormat};
pub use sink::{IfExists, LocalWarehouse, TableId, TableSink};
