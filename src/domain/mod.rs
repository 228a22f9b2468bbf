pub mod csv;
pub mod dates;
pub mod expiry;
pub mod fifo;
pub mod metrics;
pub mod suggestions;
