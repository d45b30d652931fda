//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了协调器使用的同步机制。

pub mod single_flight;

pub use self::single_flight::{Flight, SingleFlight};
