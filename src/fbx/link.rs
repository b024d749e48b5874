use std::collections::HashMap;
use std::sync::Arc;

use crate::fbx::builder::{BuiltScene, ConnRef};
use crate::fbx::element::{
	AnimProp, ElementData, ElementId, ElementKind, IndexBuffer, MappingMode, MaterialFaces, SkinVertex, SkinWeight,
};
use crate::fbx::file::LoadOptions;
use crate::fbx::props::{PROP_FLAG_ANIMATED, PROP_FLAG_CONNECTED, prop_key};
use crate::fbx::scene::{Connection, Scene, empty_typed_buckets};
use crate::fbx::strings::fnv1a;
use crate::fbx::{FbxError, Result};

/// Resolve buffered connections and finalize all cross-references,
/// producing the immutable scene.
pub fn link_scene(built: BuiltScene, options: &LoadOptions) -> Result<Scene> {
	let BuiltScene {
		mut elements,
		connections,
		root_id,
		metadata,
		settings,
		id_map,
		name_map,
	} = built;

	// Phase 1: resolve endpoints, dropping connections that reference
	// objects the file never defined. Broken references degrade, they do
	// not fail the load.
	let mut resolved: Vec<Connection> = Vec::with_capacity(connections.len());
	for raw in &connections {
		let Some(src) = resolve_ref(&raw.src, &id_map, &name_map) else {
			log::debug!("dropping connection with unresolved source {:?}", raw.src);
			continue;
		};
		let Some(dst) = resolve_ref(&raw.dst, &id_map, &name_map) else {
			log::debug!("dropping connection with unresolved destination {:?}", raw.dst);
			continue;
		};
		resolved.push(Connection {
			src,
			dst,
			src_prop: raw.src_prop.clone(),
			dst_prop: raw.dst_prop.clone(),
		});
	}

	// Phase 2: two stable-sorted copies for range queries from either end.
	let mut connections_src = resolved.clone();
	connections_src.sort_by(|left, right| {
		left.src
			.cmp(&right.src)
			.then_with(|| left.src_prop.as_ref().cmp(right.src_prop.as_ref()))
			.then_with(|| left.dst_prop.as_ref().cmp(right.dst_prop.as_ref()))
	});
	let mut connections_dst = resolved;
	connections_dst.sort_by(|left, right| {
		left.dst
			.cmp(&right.dst)
			.then_with(|| left.dst_prop.as_ref().cmp(right.dst_prop.as_ref()))
			.then_with(|| left.src_prop.as_ref().cmp(right.src_prop.as_ref()))
	});

	// Phase 3: per-element adjacency ranges via one linear sweep each.
	sweep_ranges(&mut elements, &connections_src, |conn| conn.src, |element, range| {
		element.src_connections = range;
	});
	sweep_ranges(&mut elements, &connections_dst, |conn| conn.dst, |element, range| {
		element.dst_connections = range;
	});

	let mut linker = Linker {
		elements,
		root_id,
		options,
	};

	// Phase 4 onward: hierarchy, then per-kind cross-references.
	linker.apply_object_links(&connections_src)?;
	linker.apply_property_links(&connections_src);
	linker.attach_orphans(metadata.version);
	linker.compute_depths();
	linker.finalize_blend_channels();
	linker.finalize_videos();
	linker.finalize_skins();
	linker.finalize_nurbs()?;
	linker.finalize_anim_layers();
	linker.resolve_poses(&id_map);
	let (zero_indices, consecutive_indices) = linker.assign_shared_buffers();
	linker.bucket_material_faces();

	let mut elements = linker.elements;

	// Typed buckets and dense per-kind IDs.
	let mut typed = empty_typed_buckets();
	for element in &mut elements {
		let bucket = &mut typed[element.kind() as usize];
		element.typed_id = bucket.len() as u32;
		bucket.push(element.element_id);
	}

	let mut by_name: Vec<(Arc<str>, ElementKind, ElementId)> = elements
		.iter()
		.map(|element| (element.name.clone(), element.kind(), element.element_id))
		.collect();
	by_name.sort_by(|left, right| {
		left.0
			.as_ref()
			.cmp(right.0.as_ref())
			.then_with(|| left.1.cmp(&right.1))
			.then_with(|| left.2.cmp(&right.2))
	});

	let anim_stacks = typed[ElementKind::AnimStack as usize].clone();

	Ok(Scene {
		metadata,
		settings,
		elements,
		typed,
		by_name,
		connections_src,
		connections_dst,
		root: root_id,
		zero_indices,
		consecutive_indices,
		anim_stacks,
	})
}

fn resolve_ref(
	conn_ref: &ConnRef,
	id_map: &crate::fbx::map::RhMap<crate::fbx::builder::IdMapEntry>,
	name_map: &crate::fbx::map::RhMap<crate::fbx::builder::NameMapEntry>,
) -> Option<ElementId> {
	match conn_ref {
		ConnRef::Id(raw) => {
			let hash = raw.wrapping_mul(0x9E37_79B9_7F4A_7C15);
			let found = id_map.find(hash, |entry| entry.raw == *raw)?;
			Some(id_map.get(found).element)
		}
		ConnRef::Name(name) => {
			let hash = fnv1a(name.as_bytes());
			let found = name_map.find(hash, |entry| entry.key.as_ref() == name.as_ref())?;
			Some(name_map.get(found).element)
		}
	}
}

fn sweep_ranges(
	elements: &mut [crate::fbx::element::Element],
	sorted: &[Connection],
	key: impl Fn(&Connection) -> ElementId,
	mut assign: impl FnMut(&mut crate::fbx::element::Element, (u32, u32)),
) {
	let mut begin = 0_usize;
	while begin < sorted.len() {
		let id = key(&sorted[begin]);
		let mut end = begin + 1;
		while end < sorted.len() && key(&sorted[end]) == id {
			end += 1;
		}
		assign(&mut elements[id as usize], (begin as u32, end as u32));
		begin = end;
	}
}

struct Linker<'o> {
	elements: Vec<crate::fbx::element::Element>,
	root_id: ElementId,
	options: &'o LoadOptions,
}

impl Linker<'_> {
	fn kind(&self, id: ElementId) -> ElementKind {
		self.elements[id as usize].kind()
	}

	/// Wire all object-object links by endpoint kind pair.
	fn apply_object_links(&mut self, connections: &[Connection]) -> Result<()> {
		for conn in connections {
			if !conn.src_prop.is_empty() || !conn.dst_prop.is_empty() {
				continue;
			}
			let (src, dst) = (conn.src, conn.dst);
			if src == dst {
				continue;
			}

			match (self.kind(src), self.kind(dst)) {
				(ElementKind::Node, ElementKind::Node) => {
					if let ElementData::Node(node) = &mut self.elements[src as usize].data {
						if node.parent.is_some() {
							log::debug!("node {src} has multiple parents, keeping the first");
							continue;
						}
						node.parent = Some(dst);
					}
					if let ElementData::Node(node) = &mut self.elements[dst as usize].data {
						node.children.push(src);
					}
				}
				(ElementKind::Mesh, ElementKind::Node) => {
					if let ElementData::Node(node) = &mut self.elements[dst as usize].data {
						node.attrib = Some(src);
						node.mesh = Some(src);
					}
				}
				(
					ElementKind::Light
					| ElementKind::Camera
					| ElementKind::Bone
					| ElementKind::Empty
					| ElementKind::NurbsCurve
					| ElementKind::NurbsSurface,
					ElementKind::Node,
				) => {
					if let ElementData::Node(node) = &mut self.elements[dst as usize].data {
						node.attrib = Some(src);
					}
				}
				(ElementKind::Material, ElementKind::Node) => {
					if let ElementData::Node(node) = &mut self.elements[dst as usize].data {
						node.materials.push(src);
					}
				}
				(ElementKind::SkinDeformer, ElementKind::Mesh) => {
					if let ElementData::Mesh(mesh) = &mut self.elements[dst as usize].data {
						mesh.skin_deformers.push(src);
					}
				}
				(ElementKind::SkinCluster, ElementKind::SkinDeformer) => {
					if let ElementData::SkinDeformer(skin) = &mut self.elements[dst as usize].data {
						skin.clusters.push(src);
					}
				}
				(ElementKind::Node, ElementKind::SkinCluster) => {
					if let ElementData::SkinCluster(cluster) = &mut self.elements[dst as usize].data {
						cluster.bone_node = Some(src);
					}
				}
				(ElementKind::BlendDeformer, ElementKind::Mesh) => {
					if let ElementData::Mesh(mesh) = &mut self.elements[dst as usize].data {
						mesh.blend_deformers.push(src);
					}
				}
				(ElementKind::BlendChannel, ElementKind::BlendDeformer) => {
					if let ElementData::BlendDeformer(blend) = &mut self.elements[dst as usize].data {
						blend.channels.push(src);
					}
				}
				(ElementKind::BlendShape, ElementKind::BlendChannel) => {
					if let ElementData::BlendChannel(channel) = &mut self.elements[dst as usize].data {
						// Fill shape slots left open by FullWeights order.
						if let Some(slot) = channel.keyframes.iter_mut().find(|key| key.shape == u32::MAX) {
							slot.shape = src;
						} else {
							channel.keyframes.push(crate::fbx::element::BlendKeyframe {
								shape: src,
								target_weight: 100.0,
							});
						}
					}
				}
				(ElementKind::Video, ElementKind::Texture) => {
					if let ElementData::Texture(texture) = &mut self.elements[dst as usize].data {
						texture.video = Some(src);
					}
				}
				(ElementKind::AnimLayer, ElementKind::AnimStack) => {
					if let ElementData::AnimStack(stack) = &mut self.elements[dst as usize].data {
						stack.layers.push(src);
					}
				}
				_ => {}
			}
		}
		Ok(())
	}

	/// Wire property-targeted links: curves into values, values into
	/// layers and targets, textures into material slots.
	fn apply_property_links(&mut self, connections: &[Connection]) {
		// AnimValue membership and targets are gathered first because one
		// value may feed several layers.
		let mut value_layers: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
		let mut value_targets: HashMap<ElementId, Vec<(ElementId, Arc<str>)>> = HashMap::new();

		for conn in connections {
			let (src, dst) = (conn.src, conn.dst);
			match (self.kind(src), self.kind(dst)) {
				(ElementKind::AnimCurve, ElementKind::AnimValue) => {
					let axis = match conn.dst_prop.as_ref() {
						"d|X" => 0,
						"d|Y" => 1,
						"d|Z" => 2,
						_ => continue,
					};
					if let ElementData::AnimValue(value) = &mut self.elements[dst as usize].data {
						value.curves[axis] = Some(src);
					}
				}
				(ElementKind::AnimValue, ElementKind::AnimLayer) => {
					value_layers.entry(src).or_default().push(dst);
				}
				(ElementKind::AnimValue, _) if !conn.dst_prop.is_empty() => {
					value_targets.entry(src).or_default().push((dst, conn.dst_prop.clone()));
					self.mark_prop_flag(dst, conn.dst_prop.as_ref(), PROP_FLAG_ANIMATED);
				}
				(ElementKind::Texture, ElementKind::Material) if !conn.dst_prop.is_empty() => {
					let slot = conn.dst_prop.as_ref().to_owned();
					if let ElementData::Material(material) = &mut self.elements[dst as usize].data {
						let map = match slot.as_str() {
							"DiffuseColor" => &mut material.diffuse,
							"SpecularColor" => &mut material.specular,
							"AmbientColor" => &mut material.ambient,
							"EmissiveColor" => &mut material.emissive,
							"NormalMap" => &mut material.normal_map,
							"Bump" => &mut material.bump,
							"TransparentColor" | "Opacity" => &mut material.opacity,
							"ShininessExponent" | "Shininess" => &mut material.shininess,
							"ReflectionColor" => &mut material.reflection,
							_ => continue,
						};
						map.texture = Some(src);
					}
				}
				_ => {
					if !conn.dst_prop.is_empty() {
						self.mark_prop_flag(dst, conn.dst_prop.as_ref(), PROP_FLAG_CONNECTED);
					}
					if !conn.src_prop.is_empty() {
						self.mark_prop_flag(src, conn.src_prop.as_ref(), PROP_FLAG_CONNECTED);
					}
				}
			}
		}

		// Expand (value -> layers) x (value -> targets) into layer-local
		// bindings.
		for (value, layers) in value_layers {
			let Some(targets) = value_targets.get(&value) else {
				continue;
			};
			for layer_id in layers {
				if let ElementData::AnimLayer(layer) = &mut self.elements[layer_id as usize].data {
					for (target, prop_name) in targets {
						layer.anim_props.push(AnimProp {
							element: *target,
							internal_key: prop_key(prop_name.as_ref()),
							prop_name: prop_name.clone(),
							anim_value: value,
						});
					}
				}
			}
		}
	}

	fn mark_prop_flag(&mut self, element: ElementId, prop_name: &str, flag: u32) {
		let props = &mut self.elements[element as usize].props;
		let key = prop_key(prop_name);
		if let Ok(index) = props.props.binary_search_by(|prop| {
			prop.internal_key
				.cmp(&key)
				.then_with(|| prop.name.as_ref().cmp(prop_name))
		}) {
			props.props[index].flags |= flag;
		}
	}

	/// Default-attach nodes with no parent to the scene root.
	fn attach_orphans(&mut self, version: u32) {
		if version >= 6000 && !self.options.connect_orphans {
			return;
		}

		let orphans: Vec<ElementId> = self
			.elements
			.iter()
			.filter(|element| {
				element.element_id != self.root_id
					&& element
						.as_node()
						.map(|node| node.parent.is_none())
						.unwrap_or(false)
			})
			.map(|element| element.element_id)
			.collect();

		for orphan in orphans {
			if let ElementData::Node(node) = &mut self.elements[orphan as usize].data {
				node.parent = Some(self.root_id);
			}
			let root = self.root_id;
			if let ElementData::Node(node) = &mut self.elements[root as usize].data {
				node.children.push(orphan);
			}
		}
	}

	/// Breadth-first depth assignment; cycles are broken by detaching.
	fn compute_depths(&mut self) {
		let mut visited = vec![false; self.elements.len()];
		let mut queue = std::collections::VecDeque::new();
		queue.push_back((self.root_id, 0_u32));
		visited[self.root_id as usize] = true;

		while let Some((id, depth)) = queue.pop_front() {
			let children = if let ElementData::Node(node) = &mut self.elements[id as usize].data {
				node.depth = depth;
				node.children.clone()
			} else {
				continue;
			};

			for child in children {
				if visited[child as usize] {
					log::debug!("hierarchy cycle at node {child}, detaching");
					if let ElementData::Node(node) = &mut self.elements[id as usize].data {
						node.children.retain(|existing| *existing != child);
					}
					continue;
				}
				visited[child as usize] = true;
				queue.push_back((child, depth + 1));
			}
		}
	}

	/// Sort blend keyframes by ascending target weight.
	fn finalize_blend_channels(&mut self) {
		for element in &mut self.elements {
			if let ElementData::BlendChannel(channel) = &mut element.data {
				channel.keyframes.retain(|key| key.shape != u32::MAX);
				channel
					.keyframes
					.sort_by(|left, right| left.target_weight.total_cmp(&right.target_weight));
			}
		}
	}

	/// Share embedded content between videos with the same filename.
	fn finalize_videos(&mut self) {
		let mut by_filename: HashMap<Arc<str>, Arc<[u8]>> = HashMap::new();
		for element in &self.elements {
			if let ElementData::Video(video) = &element.data
				&& let Some(content) = &video.content
				&& !video.filename.is_empty()
			{
				by_filename.entry(video.filename.clone()).or_insert_with(|| content.clone());
			}
		}

		for element in &mut self.elements {
			if let ElementData::Video(video) = &mut element.data
				&& video.content.is_none()
				&& let Some(shared) = by_filename.get(&video.filename)
			{
				log::debug!("sharing embedded content for duplicated video {:?}", video.filename);
				video.content = Some(shared.clone());
			}
		}
	}

	/// Build per-vertex weight layouts for every skin deformer.
	fn finalize_skins(&mut self) {
		// Pair every skin with the vertex count of its owning mesh.
		let mut skin_vertex_counts: HashMap<ElementId, usize> = HashMap::new();
		for element in &self.elements {
			if let ElementData::Mesh(mesh) = &element.data {
				for skin in &mesh.skin_deformers {
					skin_vertex_counts.insert(*skin, mesh.vertices.len());
				}
			}
		}

		// Collect cluster contents up front to avoid aliased borrows.
		let mut cluster_data: HashMap<ElementId, (Vec<i32>, Vec<f64>)> = HashMap::new();
		for element in &self.elements {
			if let ElementData::SkinCluster(cluster) = &element.data {
				cluster_data.insert(element.element_id, (cluster.vertices.clone(), cluster.weights.clone()));
			}
		}

		for element in &mut self.elements {
			let ElementData::SkinDeformer(skin) = &mut element.data else {
				continue;
			};
			let num_vertices = skin_vertex_counts.get(&element.element_id).copied().unwrap_or(0);

			let mut per_vertex: Vec<Vec<SkinWeight>> = vec![Vec::new(); num_vertices];
			for (cluster_index, cluster_id) in skin.clusters.iter().enumerate() {
				let Some((vertices, weights)) = cluster_data.get(cluster_id) else {
					continue;
				};
				for (vertex, weight) in vertices.iter().zip(weights) {
					let Ok(vertex) = usize::try_from(*vertex) else {
						continue;
					};
					if vertex >= num_vertices {
						continue;
					}
					per_vertex[vertex].push(SkinWeight {
						cluster_index: cluster_index as u32,
						weight: *weight,
					});
				}
			}

			skin.vertices = Vec::with_capacity(num_vertices);
			skin.weights.clear();
			skin.max_weights_per_vertex = 0;
			for mut weights in per_vertex {
				weights.sort_by(|left, right| right.weight.total_cmp(&left.weight));
				let begin = skin.weights.len() as u32;
				let count = weights.len() as u32;
				skin.max_weights_per_vertex = skin.max_weights_per_vertex.max(count);
				skin.weights.extend(weights);
				skin.vertices.push(SkinVertex {
					weight_begin: begin,
					num_weights: count,
				});
			}
		}
	}

	/// Validate knot vectors and deduplicate spans.
	fn finalize_nurbs(&mut self) -> Result<()> {
		let strict = self.options.strict;
		for element in &mut self.elements {
			let bases: Vec<&mut crate::fbx::element::NurbsBasis> = match &mut element.data {
				ElementData::NurbsCurve(curve) => vec![&mut curve.basis],
				ElementData::NurbsSurface(surface) => vec![&mut surface.basis_u, &mut surface.basis_v],
				_ => continue,
			};

			for basis in bases {
				match first_decreasing_knot(&basis.knots) {
					Some(span) if strict => return Err(FbxError::BadKnotVector { span }),
					Some(span) => {
						log::debug!("non-monotonic knot vector at span {span}, marking invalid");
						basis.valid = false;
					}
					None => {
						basis.valid = !basis.knots.is_empty();
						basis.spans.clear();
						for knot in &basis.knots {
							if basis.spans.last().is_none_or(|last| *last < *knot) {
								basis.spans.push(*knot);
							}
						}
					}
				}
			}
		}
		Ok(())
	}

	/// Sort layer bindings and compute the fast-reject element window.
	fn finalize_anim_layers(&mut self) {
		for element in &mut self.elements {
			if let ElementData::AnimLayer(layer) = &mut element.data {
				layer.anim_props.sort_by(|left, right| {
					left.element
						.cmp(&right.element)
						.then_with(|| left.internal_key.cmp(&right.internal_key))
						.then_with(|| left.prop_name.as_ref().cmp(right.prop_name.as_ref()))
				});
				layer.min_element_id = layer.anim_props.first().map(|prop| prop.element).unwrap_or(0);
				layer.max_element_id = layer.anim_props.last().map(|prop| prop.element).unwrap_or(0);
			}
		}
	}

	/// Rewrite raw pose node IDs into element indices.
	fn resolve_poses(&mut self, id_map: &crate::fbx::map::RhMap<crate::fbx::builder::IdMapEntry>) {
		for element in &mut self.elements {
			let ElementData::Pose(pose) = &mut element.data else {
				continue;
			};

			let mut kept = Vec::with_capacity(pose.bone_poses.len());
			for (slot, raw) in pose.raw_node_ids.iter().enumerate() {
				let hash = raw.wrapping_mul(0x9E37_79B9_7F4A_7C15);
				let Some(found) = id_map.find(hash, |entry| entry.raw == *raw) else {
					log::debug!("dropping pose entry for unknown node id {raw}");
					continue;
				};
				let mut bone_pose = pose.bone_poses[slot];
				bone_pose.node = id_map.get(found).element;
				kept.push(bone_pose);
			}
			pose.bone_poses = kept;
			pose.raw_node_ids = Vec::new();
		}
	}

	/// Allocate the shared procedural index buffers once, sized for the
	/// largest consumer, and patch them into every user.
	fn assign_shared_buffers(&mut self) -> (Arc<[i32]>, Arc<[i32]>) {
		let mut max_zero = 0_usize;
		let mut max_consecutive = 0_usize;

		for element in &self.elements {
			if let ElementData::Mesh(mesh) = &element.data {
				if mesh.face_material_all_same == Some(0) {
					max_zero = max_zero.max(mesh.faces.len());
				}
				for attrib in mesh_attribs(mesh) {
					if attrib.direct {
						max_consecutive = max_consecutive.max(direct_index_count(mesh, attrib));
					}
				}
			}
		}

		let zero: Arc<[i32]> = vec![0_i32; max_zero].into();
		let consecutive: Arc<[i32]> = (0..max_consecutive as i32).collect();

		for element in &mut self.elements {
			if let ElementData::Mesh(mesh) = &mut element.data {
				match mesh.face_material_all_same {
					Some(0) => {
						mesh.face_material = IndexBuffer::shared(zero.clone(), mesh.faces.len());
					}
					Some(material) => {
						mesh.face_material = IndexBuffer::own(vec![material; mesh.faces.len()]);
					}
					None => {}
				}

				let counts: Vec<usize> = mesh_attribs(mesh).map(|attrib| direct_index_count(mesh, attrib)).collect();
				for (attrib, count) in mesh_attribs_mut(mesh).zip(counts) {
					if attrib.direct {
						attrib.indices = IndexBuffer::shared(consecutive.clone(), count);
					}
				}
			}
		}

		(zero, consecutive)
	}

	/// Group faces per material slot for every mesh.
	fn bucket_material_faces(&mut self) {
		for element in &mut self.elements {
			let ElementData::Mesh(mesh) = &mut element.data else {
				continue;
			};
			if mesh.face_material.is_empty() || mesh.faces.is_empty() {
				continue;
			}

			let face_material = mesh.face_material.as_slice();
			let mut buckets: Vec<MaterialFaces> = Vec::new();
			for (face_index, material) in face_material.iter().take(mesh.faces.len()).enumerate() {
				let material = (*material).max(0) as u32;
				let slot = match buckets.iter().position(|bucket| bucket.material_index == material) {
					Some(slot) => slot,
					None => {
						buckets.push(MaterialFaces {
							material_index: material,
							face_indices: Vec::new(),
						});
						buckets.len() - 1
					}
				};
				buckets[slot].face_indices.push(face_index as u32);
			}
			buckets.sort_by_key(|bucket| bucket.material_index);
			mesh.material_faces = buckets;
		}
	}
}

fn first_decreasing_knot(knots: &[f64]) -> Option<usize> {
	knots
		.windows(2)
		.position(|pair| pair[1] < pair[0])
		.map(|position| position + 1)
}

fn mesh_attribs(mesh: &crate::fbx::element::MeshData) -> impl Iterator<Item = &crate::fbx::element::VertexAttrib> {
	mesh.normals.iter().chain(mesh.uv_sets.iter()).chain(mesh.color_sets.iter())
}

fn mesh_attribs_mut(mesh: &mut crate::fbx::element::MeshData) -> impl Iterator<Item = &mut crate::fbx::element::VertexAttrib> {
	mesh.normals
		.iter_mut()
		.chain(mesh.uv_sets.iter_mut())
		.chain(mesh.color_sets.iter_mut())
}

fn direct_index_count(mesh: &crate::fbx::element::MeshData, attrib: &crate::fbx::element::VertexAttrib) -> usize {
	let by_mapping = match attrib.mapping {
		MappingMode::ByPolygonVertex => mesh.num_indices,
		MappingMode::ByVertex => mesh.vertices.len(),
		MappingMode::ByPolygon => mesh.faces.len(),
		MappingMode::ByEdge => mesh.edges.len(),
		MappingMode::AllSame => 1,
	};
	let num_values = if attrib.components == 0 {
		0
	} else {
		attrib.values.len() / attrib.components
	};
	by_mapping.min(num_values)
}

#[cfg(test)]
mod tests {
	use super::first_decreasing_knot;

	#[test]
	fn knot_monotonicity_check_finds_first_violation() {
		assert_eq!(first_decreasing_knot(&[0.0, 0.0, 1.0, 2.0]), None);
		assert_eq!(first_decreasing_knot(&[0.0, 1.0, 0.5, 2.0]), Some(2));
		assert_eq!(first_decreasing_knot(&[]), None);
	}
}
