use std::path::PathBuf;

use fbxdoc::fbx::{ElementKind, LoadOptions, Result, Scene, load_file};
use serde::Serialize;

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
}

#[derive(Serialize)]
struct SceneSummary {
	version: u32,
	creator: String,
	num_elements: usize,
	num_connections: usize,
	root: NodeSummary,
	meshes: Vec<MeshSummary>,
	anim_stacks: Vec<StackSummary>,
}

#[derive(Serialize)]
struct NodeSummary {
	name: String,
	depth: u32,
	children: Vec<NodeSummary>,
}

#[derive(Serialize)]
struct MeshSummary {
	name: String,
	num_vertices: usize,
	num_faces: usize,
	num_indices: usize,
	num_uv_sets: usize,
	has_normals: bool,
	num_skin_deformers: usize,
}

#[derive(Serialize)]
struct StackSummary {
	name: String,
	num_layers: usize,
	time_begin: f64,
	time_end: f64,
}

/// Print a JSON summary of the linked scene.
pub fn run(args: Args) -> Result<()> {
	let Args { path } = args;
	let scene = load_file(&path, &LoadOptions::default())?;

	let summary = SceneSummary {
		version: scene.metadata.version,
		creator: scene.metadata.creator.to_string(),
		num_elements: scene.elements.len(),
		num_connections: scene.connections_src.len(),
		root: node_summary(&scene, scene.root),
		meshes: scene
			.elements_of(ElementKind::Mesh)
			.filter_map(|element| {
				let mesh = element.as_mesh()?;
				Some(MeshSummary {
					name: element.name.to_string(),
					num_vertices: mesh.vertices.len(),
					num_faces: mesh.faces.len(),
					num_indices: mesh.num_indices,
					num_uv_sets: mesh.uv_sets.len(),
					has_normals: mesh.normals.is_some(),
					num_skin_deformers: mesh.skin_deformers.len(),
				})
			})
			.collect(),
		anim_stacks: scene
			.elements_of(ElementKind::AnimStack)
			.filter_map(|element| {
				let fbxdoc::fbx::ElementData::AnimStack(stack) = &element.data else {
					return None;
				};
				Some(StackSummary {
					name: element.name.to_string(),
					num_layers: stack.layers.len(),
					time_begin: stack.time_begin,
					time_end: stack.time_end,
				})
			})
			.collect(),
	};

	println!("{}", serde_json::to_string_pretty(&summary).expect("summary serializes"));
	Ok(())
}

fn node_summary(scene: &Scene, id: fbxdoc::fbx::ElementId) -> NodeSummary {
	let element = scene.element(id);
	let (depth, children) = element
		.as_node()
		.map(|node| (node.depth, node.children.as_slice()))
		.unwrap_or((0, &[]));
	NodeSummary {
		name: element.name.to_string(),
		depth,
		children: children.iter().map(|child| node_summary(scene, *child)).collect(),
	}
}
