pub mod cycles;
pub mod fystack;
pub mod proposals;
