pub mod delivery_address;
pub mod item;
pub mod order;
