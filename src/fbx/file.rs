use std::io::Read;
use std::path::Path;

use crate::fbx::ascii::parse_ascii;
use crate::fbx::binary::{ParseEnv, parse_binary};
use crate::fbx::budget::MemoryBudget;
use crate::fbx::builder::build_scene;
use crate::fbx::cursor::{Progress, ProgressTracker};
use crate::fbx::header::{FbxFormat, FbxHeader};
use crate::fbx::link::link_scene;
use crate::fbx::scene::Scene;
use crate::fbx::strings::StringPool;
use crate::fbx::{BudgetLimits, Frames, Result};

/// Progress callback: return `false` to cancel the load.
pub type ProgressFn<'a> = &'a mut dyn FnMut(Progress) -> bool;

/// Behavior switches and limits for one load call.
#[derive(Debug, Clone)]
pub struct LoadOptions {
	/// Fail on repairable format defects instead of repairing them.
	pub strict: bool,
	/// Keep out-of-bounds vertex/attribute indices instead of clamping.
	pub allow_out_of_bounds_indices: bool,
	/// Attach parentless nodes to the root in post-6000 files too.
	pub connect_orphans: bool,
	/// Allocation accounting limits.
	pub limits: BudgetLimits,
	/// Bytes between progress callback invocations.
	pub progress_interval: u64,
}

impl Default for LoadOptions {
	fn default() -> Self {
		Self {
			strict: false,
			allow_out_of_bounds_indices: false,
			connect_orphans: true,
			limits: BudgetLimits::default(),
			progress_interval: 64 * 1024,
		}
	}
}

/// Load a scene from an in-memory FBX byte stream.
pub fn load_memory(bytes: &[u8], options: &LoadOptions) -> Result<Scene> {
	load_impl(bytes, options, None)
}

/// [`load_memory`] with a progress/cancellation callback.
pub fn load_memory_with_progress(bytes: &[u8], options: &LoadOptions, progress: ProgressFn<'_>) -> Result<Scene> {
	load_impl(bytes, options, Some(progress))
}

/// Load a scene from a file path.
pub fn load_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Scene> {
	let bytes = std::fs::read(path)?;
	load_impl(&bytes, options, None)
}

/// Load a scene from any reader, buffering it fully first.
pub fn load_reader(reader: &mut dyn Read, options: &LoadOptions) -> Result<Scene> {
	let mut bytes = Vec::new();
	reader.read_to_end(&mut bytes)?;
	load_impl(&bytes, options, None)
}

/// Parse only the generic node tree, without building a scene.
///
/// Useful for format inspection tooling; the returned root is synthetic
/// and holds the file's top-level records as children.
pub fn parse_node_tree(bytes: &[u8], options: &LoadOptions) -> Result<crate::fbx::node::GenericNode> {
	let header = FbxHeader::parse(bytes).frame("parse_node_tree", line!(), "header detection")?;
	let mut budget = MemoryBudget::new(options.limits);
	let mut pool = StringPool::new(&mut budget)?;
	let mut tracker = ProgressTracker::new(None, bytes.len() as u64, options.progress_interval);
	let mut env = ParseEnv {
		pool: &mut pool,
		budget: &mut budget,
		progress: &mut tracker,
	};
	match header.format {
		FbxFormat::Binary => parse_binary(bytes, &header, &mut env),
		FbxFormat::Ascii => parse_ascii(bytes, &mut env),
	}
}

fn load_impl(bytes: &[u8], options: &LoadOptions, progress: Option<ProgressFn<'_>>) -> Result<Scene> {
	let header = FbxHeader::parse(bytes).frame("load", line!(), "header detection")?;

	let mut budget = MemoryBudget::new(options.limits);
	let mut pool = StringPool::new(&mut budget)?;
	let mut tracker = ProgressTracker::new(progress, bytes.len() as u64, options.progress_interval);

	let root = {
		let mut env = ParseEnv {
			pool: &mut pool,
			budget: &mut budget,
			progress: &mut tracker,
		};
		match header.format {
			FbxFormat::Binary => parse_binary(bytes, &header, &mut env).frame("load", line!(), "binary node tree")?,
			FbxFormat::Ascii => parse_ascii(bytes, &mut env).frame("load", line!(), "ascii node tree")?,
		}
	};

	let built = {
		let mut env = ParseEnv {
			pool: &mut pool,
			budget: &mut budget,
			progress: &mut tracker,
		};
		build_scene(&root, header.version, options, &mut env).frame("load", line!(), "scene build")?
	};

	let mut scene = link_scene(built, options).frame("load", line!(), "scene link")?;
	scene.metadata.format = Some(header.format);
	if scene.metadata.version == 0 {
		scene.metadata.version = header.version;
	}
	Ok(scene)
}

#[cfg(test)]
mod tests {
	use super::{LoadOptions, load_memory, load_memory_with_progress};
	use crate::fbx::element::ElementKind;
	use crate::fbx::testdata::BinaryFbxWriter;
	use crate::fbx::FbxError;

	fn minimal_v7400() -> Vec<u8> {
		let mut writer = BinaryFbxWriter::new(7400);
		writer.begin_node("FBXHeaderExtension");
		writer.leaf_i64("FBXVersion", 7400);
		writer.end_node();
		writer.begin_node("Definitions");
		writer.end_node();
		writer.begin_node("Objects");
		writer.end_node();
		writer.begin_node("Connections");
		writer.end_node();
		writer.finish_top_level();
		writer.into_bytes()
	}

	#[test]
	fn minimal_binary_scene_has_only_the_root() {
		let scene = load_memory(&minimal_v7400(), &LoadOptions::default()).expect("load");
		assert_eq!(scene.count_of(ElementKind::Node), 1);
		assert_eq!(scene.count_of(ElementKind::Mesh), 0);
		assert_eq!(scene.metadata.version, 7400);
		let root = scene.element(scene.root);
		assert!(root.as_node().expect("root node").is_root);
	}

	#[test]
	fn trailing_garbage_after_sentinel_is_tolerated() {
		let mut bytes = minimal_v7400();
		bytes.extend_from_slice(&[0xDE, 0xAD]);
		let scene = load_memory(&bytes, &LoadOptions::default()).expect("load");
		assert_eq!(scene.count_of(ElementKind::Node), 1);
	}

	#[test]
	fn cancellation_on_second_progress_report_yields_no_scene() {
		let mut writer = BinaryFbxWriter::new(7400);
		writer.begin_node("Objects");
		// Enough payload to cross several progress intervals.
		for index in 0..64 {
			writer.begin_node("Geometry");
			writer.value_i64(index);
			let values: Vec<i32> = (0..4096).collect();
			writer.array_i32("PolygonVertexIndex", &values);
			writer.end_node();
		}
		writer.end_node();
		writer.finish_top_level();
		let bytes = writer.into_bytes();

		let mut calls = 0_u32;
		let mut progress = |_: crate::fbx::Progress| {
			calls += 1;
			calls < 2
		};
		let options = LoadOptions {
			progress_interval: 1024,
			..LoadOptions::default()
		};
		let err = load_memory_with_progress(&bytes, &options, &mut progress).unwrap_err();
		assert!(matches!(err.root(), FbxError::Cancelled));
		assert_eq!(calls, 2);
	}
}
