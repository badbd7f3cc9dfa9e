pub use super::capture_records::Entity as CaptureRecords;
