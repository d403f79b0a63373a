pub mod pmtable;
pub mod smu;
