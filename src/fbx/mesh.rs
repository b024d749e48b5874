use std::sync::Arc;

use crate::fbx::element::{Face, IndexBuffer, MappingMode, MeshData, VertexAttrib};
use crate::fbx::file::LoadOptions;
use crate::fbx::node::GenericNode;
use crate::fbx::{FbxError, Result};

/// Build mesh geometry from a `Geometry` (or legacy `Model`) record.
///
/// Polygon faces are delimited by bit-complemented final indices; the last
/// index of every face is decoded back to its positive value. A missing
/// terminator on the final face is auto-repaired unless strict mode is on.
pub fn build_mesh(object: &GenericNode, options: &LoadOptions) -> Result<MeshData> {
	let mut mesh = MeshData::default();

	if let Some(array) = object.find_array("Vertices") {
		let flat = array.to_f64_vec();
		mesh.vertices = flat.chunks_exact(3).map(|chunk| [chunk[0], chunk[1], chunk[2]]).collect();
	}

	if let Some(array) = object.find_array("PolygonVertexIndex") {
		let stored = array.to_i32_vec();
		let (indices, faces, bad_faces) = decode_polygons(&stored, mesh.vertices.len(), options)?;
		mesh.num_indices = indices.len();
		mesh.vertex_indices = IndexBuffer::own(indices);
		mesh.faces = faces;
		mesh.num_bad_faces = bad_faces;
	}

	if let Some(array) = object.find_array("Edges") {
		mesh.edges = array.to_i32_vec();
	}

	if let Some(layer) = object.child("LayerElementNormal")
		&& let Some(attrib) = build_vertex_attrib(layer, "Normals", "NormalsIndex", 3)
	{
		mesh.normals = Some(attrib);
	}

	for layer in object.children_named("LayerElementUV") {
		if let Some(mut attrib) = build_vertex_attrib(layer, "UV", "UVIndex", 2) {
			if let Some(name) = layer.find_str("Name") {
				attrib.name = Arc::from(name);
			}
			mesh.uv_sets.push(attrib);
		}
	}

	for layer in object.children_named("LayerElementColor") {
		if let Some(mut attrib) = build_vertex_attrib(layer, "Colors", "ColorIndex", 4) {
			if let Some(name) = layer.find_str("Name") {
				attrib.name = Arc::from(name);
			}
			mesh.color_sets.push(attrib);
		}
	}

	if let Some(layer) = object.child("LayerElementMaterial") {
		let mapping = MappingMode::from_name(layer.find_str("MappingInformationType").unwrap_or(""));
		let materials = layer.find_array("Materials").map(|array| array.to_i32_vec()).unwrap_or_default();
		match mapping {
			MappingMode::AllSame => {
				mesh.face_material_all_same = Some(materials.first().copied().unwrap_or(0));
			}
			_ => {
				mesh.face_material = IndexBuffer::own(materials);
			}
		}
	}

	Ok(mesh)
}

/// Decode polygon indices: returns `(decoded indices, faces, bad faces)`.
fn decode_polygons(stored: &[i32], num_vertices: usize, options: &LoadOptions) -> Result<(Vec<i32>, Vec<Face>, usize)> {
	let mut indices = Vec::with_capacity(stored.len());
	let mut faces = Vec::new();
	let mut bad_faces = 0_usize;
	let mut face_begin = 0_u32;

	for (position, raw) in stored.iter().enumerate() {
		let terminator = *raw < 0;
		let mut decoded = if terminator { !*raw } else { *raw };

		if decoded as usize >= num_vertices || decoded < 0 {
			if options.strict {
				return Err(FbxError::IndexOutOfBounds {
					index: i64::from(decoded),
					what: "vertex positions",
					len: num_vertices,
				});
			}
			if !options.allow_out_of_bounds_indices {
				log::debug!("clamping out-of-bounds vertex index {decoded} (num_vertices={num_vertices})");
				decoded = 0;
			}
		}
		indices.push(decoded);

		let last = position + 1 == stored.len();
		if terminator || last {
			if !terminator {
				// Missing final terminator: repair by closing the face at
				// the last stored index, or reject in strict mode.
				if options.strict {
					return Err(FbxError::BadPolygonTerminator);
				}
				log::debug!("polygon index list missing final terminator, repairing");
			}

			let num_in_face = indices.len() as u32 - face_begin;
			if num_in_face > 4 {
				bad_faces += 1;
			}
			faces.push(Face {
				index_begin: face_begin,
				num_indices: num_in_face,
			});
			face_begin = indices.len() as u32;
		}
	}

	Ok((indices, faces, bad_faces))
}

/// Build one attribute layer from its `LayerElement*` record.
fn build_vertex_attrib(layer: &GenericNode, value_name: &str, index_name: &str, components: usize) -> Option<VertexAttrib> {
	let values = layer.find_array(value_name)?.to_f64_vec();
	let mapping = MappingMode::from_name(layer.find_str("MappingInformationType").unwrap_or(""));
	let reference = layer.find_str("ReferenceInformationType").unwrap_or("Direct");

	let mut attrib = VertexAttrib {
		name: Arc::from(""),
		values,
		components,
		indices: IndexBuffer::empty(),
		mapping,
		direct: false,
	};

	match reference {
		"IndexToDirect" | "Index" => {
			if let Some(index_array) = layer.find_array(index_name) {
				attrib.indices = IndexBuffer::own(index_array.to_i32_vec());
			} else {
				// Index reference with no index array degrades to direct.
				attrib.direct = true;
			}
		}
		_ => attrib.direct = true,
	}

	Some(attrib)
}

#[cfg(test)]
mod tests {
	use super::decode_polygons;
	use crate::fbx::file::LoadOptions;

	fn lenient() -> LoadOptions {
		LoadOptions::default()
	}

	fn strict() -> LoadOptions {
		LoadOptions {
			strict: true,
			..LoadOptions::default()
		}
	}

	#[test]
	fn faces_split_on_complemented_terminators() {
		// Triangle 0,1,2 then quad 2,3,4,5.
		let stored = [0, 1, !2, 2, 3, 4, !5];
		let (indices, faces, bad) = decode_polygons(&stored, 6, &lenient()).expect("decode");
		assert_eq!(indices, vec![0, 1, 2, 2, 3, 4, 5]);
		assert_eq!(faces.len(), 2);
		assert_eq!((faces[0].index_begin, faces[0].num_indices), (0, 3));
		assert_eq!((faces[1].index_begin, faces[1].num_indices), (3, 4));
		assert_eq!(bad, 0);

		let total: u32 = faces.iter().map(|face| face.num_indices).sum();
		assert_eq!(total as usize, indices.len());
	}

	#[test]
	fn missing_final_terminator_repairs_when_lenient() {
		let stored = [0, 1, !2, 0, 2, 3];
		let (indices, faces, _) = decode_polygons(&stored, 4, &lenient()).expect("decode");
		assert_eq!(faces.len(), 2);
		assert_eq!(indices.last(), Some(&3));
		assert_eq!(faces[1].num_indices, 3);
	}

	#[test]
	fn missing_final_terminator_fails_when_strict() {
		let stored = [0, 1, 2];
		assert!(decode_polygons(&stored, 4, &strict()).is_err());
	}

	#[test]
	fn out_of_bounds_indices_clamp_by_default() {
		let stored = [0, 9, !2];
		let (indices, _, _) = decode_polygons(&stored, 3, &lenient()).expect("decode");
		assert_eq!(indices, vec![0, 0, 2]);

		let allowed = LoadOptions {
			allow_out_of_bounds_indices: true,
			..LoadOptions::default()
		};
		let (indices, _, _) = decode_polygons(&stored, 3, &allowed).expect("decode");
		assert_eq!(indices, vec![0, 9, 2]);
	}
}
