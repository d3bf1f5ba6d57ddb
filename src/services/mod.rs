pub mod availability;
pub mod catalog;
pub mod ingress;
pub mod lots;
pub mod report;
