//! Exact diffuse Kalman filtering and smoothing for linear state-space models
//!
//! Scalar-measurement Gaussian filtering/smoothing where part of the initial
//! state has an exactly diffuse prior, handled with a square-root array
//! algorithm: the diffuse covariance is carried as a constraint matrix `B`
//! whose column count shrinks through rank-reducing Givens rotations until
//! the diffuse subspace collapses and the ordinary Kalman recursion takes
//! over.
//!
//! # Features
//!
//! - **Exact diffuse initialization**: no large-kappa approximation
//! - **Square-root stability**: the diffuse covariance never leaves factored form
//! - **no_std Support**: works without the standard library (`alloc` required)

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod types;
pub mod models;
pub mod filters;
pub mod smoothers;

pub mod prelude {
    pub use crate::types::state::*;
    pub use crate::types::update::*;
    pub use crate::types::rotation::*;
    pub use crate::models::*;
    pub use crate::filters::{filter, FilterOptions, FilteringResults, StorageMode};
    pub use crate::smoothers::{smooth, SmootherOptions, SmoothingResults};
}

/// Error types for the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsfError {
    /// State/measurement dimensions are inconsistent (raised at setup)
    DimensionMismatch {
        /// Dimension required by the surrounding structure
        expected: usize,
        /// Dimension actually supplied
        actual: usize,
    },
    /// NaN or negative variance where none is expected; no partial result is trustworthy
    ModelDegeneracy {
        /// Position at which the degeneracy was detected
        pos: usize,
    },
    /// The diffuse dimension failed to collapse by the end of the series
    DiffuseNotCollapsed {
        /// Diffuse directions still unresolved at the last position
        remaining: usize,
    },
    /// Smoothing was requested on results stored in light mode
    SmoothingUnavailable,
}

#[cfg(feature = "std")]
impl std::error::Error for SsfError {}

impl ::core::fmt::Display for SsfError {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        match self {
            SsfError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            SsfError::ModelDegeneracy { pos } => {
                write!(f, "Model degeneracy at position {}", pos)
            }
            SsfError::DiffuseNotCollapsed { remaining } => {
                write!(
                    f,
                    "Diffuse dimension failed to collapse: {} direction(s) left at series end",
                    remaining
                )
            }
            SsfError::SmoothingUnavailable => {
                write!(f, "Smoothing requires results stored in full mode")
            }
        }
    }
}

pub type Result<T> = ::core::result::Result<T, SsfError>;
