pub mod csv_writer;

pub use csv_writer::{CsvConfig, CsvStreamWriter, WriterStats};
