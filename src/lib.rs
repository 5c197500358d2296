#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(clippy::all, clippy::nursery, missing_docs)]
#![doc = include_str!("../README.md")]

/// Unit conversions between hertz and the Laplace variable.
pub mod constants;
/// Shared scalar aliases and phasor helpers.
pub mod math;
/// Netlists, admittance builders, solve strategies, and AC sweeps.
pub mod circuits;
/// Frequency sample generation and post-processing helpers.
pub mod sweep;
/// Sweep configuration and the top-level sweep runner.
pub mod simulation;
/// Error types shared between submodules.
pub mod errors;

/// Common exports for downstream crates.
pub mod prelude;
