pub mod atomic_write;
pub mod backoff;
pub mod checksum;
pub mod home;
pub mod logging;
