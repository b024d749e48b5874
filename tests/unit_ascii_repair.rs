use fbxdoc::fbx::{ElementKind, FbxFormat, LoadOptions, load_memory};

/// Legacy 6.x-style ASCII document with the geometry embedded in the
/// Model record and a final polygon index missing its bit-complement.
const CUBE_FACE_ASCII: &str = "\
; FBX 6.1.0 project file\n\
FBXHeaderExtension: {\n\
\tFBXVersion: 6100\n\
\tCreator: \"fbxdoc ascii test\"\n\
}\n\
Objects: {\n\
\tModel: \"Model::Cube\", \"Mesh\" {\n\
\t\tVertices: 0.0,0.0,0.0, 1.0,0.0,0.0, 1.0,1.0,0.0, 0.0,1.0,0.0\n\
\t\tPolygonVertexIndex: 0,1,2,3\n\
\t}\n\
}\n\
Connections: {\n\
}\n";

#[test]
fn positive_final_index_is_repaired_under_default_options() {
	let scene = load_memory(CUBE_FACE_ASCII.as_bytes(), &LoadOptions::default()).expect("lenient load");
	assert_eq!(scene.metadata.format, Some(FbxFormat::Ascii));
	assert_eq!(scene.metadata.version, 6100);

	let mesh = scene
		.elements_of(ElementKind::Mesh)
		.next()
		.expect("embedded mesh split from the Model record")
		.as_mesh()
		.expect("payload");

	assert_eq!(mesh.vertices.len(), 4);
	assert_eq!(mesh.faces.len(), 1);
	assert_eq!(mesh.faces[0].num_indices, 4);

	// The stored final index 3 was never complemented; the repaired face
	// ends on the value the writer should have encoded as !3.
	let indices = mesh.vertex_indices.as_slice();
	assert_eq!(indices, &[0, 1, 2, 3]);
	assert_eq!(indices[indices.len() - 1], 3);
}

#[test]
fn positive_final_index_is_rejected_in_strict_mode() {
	let strict = LoadOptions {
		strict: true,
		..LoadOptions::default()
	};
	assert!(load_memory(CUBE_FACE_ASCII.as_bytes(), &strict).is_err());
}

#[test]
fn legacy_model_node_still_appears_in_the_hierarchy() {
	let scene = load_memory(CUBE_FACE_ASCII.as_bytes(), &LoadOptions::default()).expect("load");

	let model = scene.find_element(ElementKind::Node, "Cube").expect("model node");
	let node = model.as_node().expect("node payload");
	assert_eq!(node.parent, Some(scene.root));
	assert!(node.mesh.is_some(), "split mesh connected back to its model");
}
