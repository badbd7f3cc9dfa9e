pub mod metadata;
pub mod relay;
pub mod staging;
pub mod storage;
