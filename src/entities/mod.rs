pub mod prelude;

pub mod capture_records;
