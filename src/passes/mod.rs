pub mod collect;
pub mod emit;
pub mod group;
pub mod index;
pub mod resync;
pub mod schedule;
pub mod sort;
pub mod symbolings;
