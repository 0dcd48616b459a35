mod dshop_world;
mod setups;
mod steps;

pub use dshop_world::DshopWorld;
