pub mod csv_upload;
pub mod layout;

pub use csv_upload::CsvUploadSource;
pub use layout::{builtin_layouts, ColumnSpec, CsvLayout};
