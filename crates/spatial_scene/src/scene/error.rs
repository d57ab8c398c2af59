//! Scene error types

use crate::foundation::math::Vec3;

use super::scene_graph::ObjectKey;

/// Errors raised by scene mutations and spatial index maintenance
///
/// Every error leaves the scene exactly as it was before the call, except
/// [`SceneError::CreatedOutsideIndex`], which reports an object that was
/// created but could not be indexed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// A scale component was zero, negative or non-finite
    #[error("Invalid scale {0:?}: every component must be finite and greater than zero")]
    InvalidScale(Vec3),

    /// A position, rotation or matrix contained NaN or infinity
    #[error("Non-finite value for {0}")]
    NonFiniteValue(&'static str),

    /// A matrix could not be decomposed into position, rotation and positive scale
    #[error("Degenerate transform: {0}")]
    DegenerateTransform(String),

    /// Reparenting would make an object its own ancestor
    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    /// The key does not refer to a live object
    #[error("Object not found")]
    ObjectNotFound,

    /// The anchor point of an object lies outside the index footprint
    #[error("Object anchored at {anchor:?} lies outside the index footprint")]
    OutOfBounds {
        /// Point used to place the object in the tree
        anchor: Vec3,
    },

    /// A static object was created outside the footprint of the built index
    ///
    /// The object exists and takes part in linear scans; it is left out of
    /// the tree until it moves back inside or the index is rebuilt.
    #[error("Object {key:?} was created at {anchor:?}, outside the index footprint")]
    CreatedOutsideIndex {
        /// Key of the new object
        key: ObjectKey,
        /// Point used to place the object in the tree
        anchor: Vec3,
    },

    /// A footprint with non-finite corners or no area in XZ
    #[error("Invalid footprint {min:?} .. {max:?}")]
    InvalidFootprint {
        /// Requested minimum corner
        min: Vec3,
        /// Requested maximum corner
        max: Vec3,
    },
}
