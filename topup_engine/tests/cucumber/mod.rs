pub mod setups;
pub mod steps;
pub mod topup_world;

pub use topup_world::TopupWorld;
