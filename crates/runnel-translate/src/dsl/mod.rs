//! Text front-ends that build a logical `Pipeline`.

pub mod yaml;
