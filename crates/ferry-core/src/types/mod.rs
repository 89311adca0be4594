pub mod beacon;
pub mod bridge;
pub mod execution;
pub mod light;
pub mod ssz;
