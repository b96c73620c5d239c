//! Runtime limits and defaults

pub mod limits;
