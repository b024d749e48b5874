use fbxdoc::fbx::testdata::BinaryFbxWriter;
use fbxdoc::fbx::{ElementKind, LoadOptions, load_memory};

/// Two-triangle plane: geometry, a model node, a material, and the
/// connections wiring them together.
fn plane_scene() -> Vec<u8> {
	let mut writer = BinaryFbxWriter::new(7400);

	writer.begin_node("FBXHeaderExtension");
	writer.leaf_i64("FBXVersion", 7400);
	writer.end_node();

	writer.begin_node("Objects");

	writer.begin_node("Geometry");
	writer.value_i64(1001);
	writer.value_str("Plane\u{0}\u{1}Geometry");
	writer.value_str("Mesh");
	writer.array_f64(
		"Vertices",
		&[
			-0.5, -0.5, 0.0, //
			0.5, -0.5, 0.0, //
			0.5, 0.5, 0.0, //
			-0.5, 0.5, 0.0,
		],
	);
	writer.array_i32("PolygonVertexIndex", &[0, 1, !2, 0, 2, !3]);
	writer.begin_node("LayerElementNormal");
	writer.value_i32(0);
	writer.leaf_str("MappingInformationType", "ByPolygonVertex");
	writer.leaf_str("ReferenceInformationType", "Direct");
	let normals: Vec<f64> = std::iter::repeat_n([0.0, 0.0, 1.0], 6).flatten().collect();
	writer.array_f64("Normals", &normals);
	writer.end_node();
	writer.begin_node("LayerElementMaterial");
	writer.value_i32(0);
	writer.leaf_str("MappingInformationType", "AllSame");
	writer.leaf_str("ReferenceInformationType", "IndexToDirect");
	writer.array_i32("Materials", &[0]);
	writer.end_node();
	writer.end_node();

	writer.begin_node("Model");
	writer.value_i64(2001);
	writer.value_str("Plane\u{0}\u{1}Model");
	writer.value_str("Mesh");
	writer.end_node();

	writer.begin_node("Material");
	writer.value_i64(3001);
	writer.value_str("Gray\u{0}\u{1}Material");
	writer.value_str("");
	writer.leaf_str("ShadingModel", "lambert");
	writer.end_node();

	writer.end_node();

	writer.begin_node("Connections");
	// Geometry and material attach to the model; forward order does not
	// matter because connections resolve after all objects exist.
	writer.begin_node("C");
	writer.value_str("OO");
	writer.value_i64(1001);
	writer.value_i64(2001);
	writer.end_node();
	writer.begin_node("C");
	writer.value_str("OO");
	writer.value_i64(3001);
	writer.value_i64(2001);
	writer.end_node();
	writer.end_node();

	writer.finish_top_level();
	writer.into_bytes()
}

#[test]
fn mesh_links_into_the_node_hierarchy() {
	let scene = load_memory(&plane_scene(), &LoadOptions::default()).expect("load");

	assert_eq!(scene.count_of(ElementKind::Mesh), 1);
	assert_eq!(scene.count_of(ElementKind::Material), 1);
	// Synthetic root plus the plane model.
	assert_eq!(scene.count_of(ElementKind::Node), 2);

	let model = scene.find_element(ElementKind::Node, "Plane").expect("model by name");
	let node = model.as_node().expect("node");
	assert_eq!(node.depth, 1);
	assert_eq!(node.parent, Some(scene.root));
	assert_eq!(node.materials.len(), 1);

	let mesh_id = node.mesh.expect("mesh attached");
	let mesh = scene.element(mesh_id).as_mesh().expect("mesh payload");
	assert_eq!(mesh.vertices.len(), 4);
	assert_eq!(mesh.faces.len(), 2);
}

#[test]
fn polygon_terminator_invariant_holds() {
	let scene = load_memory(&plane_scene(), &LoadOptions::default()).expect("load");

	for element in scene.elements_of(ElementKind::Mesh) {
		let mesh = element.as_mesh().expect("mesh");
		let indices = mesh.vertex_indices.as_slice();

		let total: u32 = mesh.faces.iter().map(|face| face.num_indices).sum();
		assert_eq!(total as usize, mesh.num_indices);
		assert_eq!(indices.len(), mesh.num_indices);

		// Stored stream ended each face with a complemented index; the
		// decoded buffer holds the positive values.
		assert_eq!(indices, &[0, 1, 2, 0, 2, 3]);
		for face in &mesh.faces {
			let last = indices[(face.index_begin + face.num_indices - 1) as usize];
			assert!(last >= 0);
		}
	}
}

#[test]
fn direct_normals_use_the_shared_consecutive_buffer() {
	let scene = load_memory(&plane_scene(), &LoadOptions::default()).expect("load");

	let mesh_element = scene.elements_of(ElementKind::Mesh).next().expect("mesh");
	let mesh = mesh_element.as_mesh().expect("payload");
	let normals = mesh.normals.as_ref().expect("normal layer");

	assert_eq!(normals.components, 3);
	assert_eq!(normals.indices.len(), mesh.num_indices);
	// Direct reference resolves to the scene-wide consecutive buffer.
	assert_eq!(normals.indices.as_slice(), &scene.consecutive_indices[..mesh.num_indices]);
}

#[test]
fn all_same_material_mapping_uses_the_shared_zero_buffer() {
	let scene = load_memory(&plane_scene(), &LoadOptions::default()).expect("load");

	let mesh_element = scene.elements_of(ElementKind::Mesh).next().expect("mesh");
	let mesh = mesh_element.as_mesh().expect("payload");

	assert_eq!(mesh.face_material.len(), mesh.faces.len());
	assert!(mesh.face_material.as_slice().iter().all(|material| *material == 0));

	assert_eq!(mesh.material_faces.len(), 1);
	assert_eq!(mesh.material_faces[0].material_index, 0);
	assert_eq!(mesh.material_faces[0].face_indices, vec![0, 1]);
}

#[test]
fn strict_mode_rejects_missing_polygon_terminator() {
	let mut writer = BinaryFbxWriter::new(7400);
	writer.begin_node("Objects");
	writer.begin_node("Geometry");
	writer.value_i64(1);
	writer.value_str("Bad\u{0}\u{1}Geometry");
	writer.value_str("Mesh");
	writer.array_f64("Vertices", &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
	writer.array_i32("PolygonVertexIndex", &[0, 1, 2]);
	writer.end_node();
	writer.end_node();
	writer.finish_top_level();
	let bytes = writer.into_bytes();

	let strict = LoadOptions {
		strict: true,
		..LoadOptions::default()
	};
	assert!(load_memory(&bytes, &strict).is_err());

	let scene = load_memory(&bytes, &LoadOptions::default()).expect("lenient load repairs");
	let mesh = scene.elements_of(ElementKind::Mesh).next().expect("mesh").as_mesh().expect("payload");
	assert_eq!(mesh.faces.len(), 1);
	assert_eq!(mesh.faces[0].num_indices, 3);
}
