// Core services
pub mod orders;
