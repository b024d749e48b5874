//! Public library API for parsing FBX scene files into linked scene graphs.

/// FBX parsing, scene building, connection linking, and animation evaluation.
pub mod fbx;
