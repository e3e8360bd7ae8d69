pub mod csv_loader;

pub use csv_loader::{load_csv_file, parse_csv, save_csv_file, write_csv, CsvTable, ANSWER_COLUMN};
