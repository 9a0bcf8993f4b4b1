//! Validates a neural-network airfoil surrogate against XFoil by drawing
//! both CL-CD polars over a sweep of Reynolds numbers on one figure.

pub mod colors;
pub mod config;
pub mod datatypes;
pub mod error;
pub mod format;
pub mod geometry;
pub mod kulfan;
pub mod logging;
pub mod post_processor;
pub mod solver;
pub mod surrogate;
pub mod sweep;
