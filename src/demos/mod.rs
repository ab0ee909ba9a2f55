//! Ready-made testbenches built on the simulation core

pub mod register;
