/// File-level information command.
pub mod info;
/// JSON scene summary command.
pub mod scene;
/// Parsed node-tree dump command.
pub mod tree;
