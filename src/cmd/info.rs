use std::path::PathBuf;

use fbxdoc::fbx::{ElementKind, FbxHeader, LoadOptions, Result, load_memory};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Fail on repairable format defects.
	#[arg(long)]
	pub strict: bool,
}

/// Print high-level file and element statistics.
pub fn run(args: Args) -> Result<()> {
	let Args { path, strict } = args;

	let bytes = std::fs::read(&path)?;
	let header = FbxHeader::parse(&bytes)?;
	let options = LoadOptions {
		strict,
		..LoadOptions::default()
	};
	let scene = load_memory(&bytes, &options)?;

	println!("path: {}", path.display());
	println!("format: {}", header.format.as_str());
	println!("version: {}", scene.metadata.version);
	println!("creator: {}", scene.metadata.creator);
	println!("elements: {}", scene.elements.len());
	println!("connections: {}", scene.connections_src.len());
	println!("anim_stacks: {}", scene.anim_stacks.len());

	let mut counts: Vec<(ElementKind, usize)> = scene
		.typed
		.iter()
		.enumerate()
		.filter(|(_, bucket)| !bucket.is_empty())
		.map(|(kind, bucket)| (kind_from_index(kind), bucket.len()))
		.collect();
	counts.sort_by(|left, right| right.1.cmp(&left.1));

	println!("kinds:");
	for (kind, count) in counts {
		println!("  {kind:?}: {count}");
	}

	Ok(())
}

fn kind_from_index(index: usize) -> ElementKind {
	use ElementKind::*;
	const KINDS: [ElementKind; 22] = [
		Node,
		Mesh,
		Light,
		Camera,
		Bone,
		Empty,
		Material,
		Texture,
		Video,
		SkinDeformer,
		SkinCluster,
		BlendDeformer,
		BlendChannel,
		BlendShape,
		NurbsCurve,
		NurbsSurface,
		AnimStack,
		AnimLayer,
		AnimValue,
		AnimCurve,
		Pose,
		Unknown,
	];
	KINDS[index]
}
