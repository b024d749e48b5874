use fbxdoc::fbx::testdata::BinaryFbxWriter;
use fbxdoc::fbx::{ElementData, ElementKind, FbxError, LoadOptions, load_memory};

/// One-triangle mesh skinned by two bone clusters with overlapping
/// weights, so the per-vertex layout has something to sort.
fn skinned_scene() -> Vec<u8> {
	let mut writer = BinaryFbxWriter::new(7400);

	writer.begin_node("Objects");

	writer.begin_node("Geometry");
	writer.value_i64(100);
	writer.value_str("Tri\u{0}\u{1}Geometry");
	writer.value_str("Mesh");
	writer.array_f64("Vertices", &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
	writer.array_i32("PolygonVertexIndex", &[0, 1, !2]);
	writer.end_node();

	writer.begin_node("Model");
	writer.value_i64(200);
	writer.value_str("Tri\u{0}\u{1}Model");
	writer.value_str("Mesh");
	writer.end_node();

	for (id, name) in [(300_i64, "BoneA\u{0}\u{1}Model"), (301, "BoneB\u{0}\u{1}Model")] {
		writer.begin_node("Model");
		writer.value_i64(id);
		writer.value_str(name);
		writer.value_str("LimbNode");
		writer.end_node();
	}

	writer.begin_node("Deformer");
	writer.value_i64(400);
	writer.value_str("Skin\u{0}\u{1}Deformer");
	writer.value_str("Skin");
	writer.end_node();

	// Cluster A: strong on vertex 0, weak on vertex 1.
	writer.begin_node("Deformer");
	writer.value_i64(401);
	writer.value_str("ClusterA\u{0}\u{1}SubDeformer");
	writer.value_str("Cluster");
	writer.array_i32("Indexes", &[0, 1]);
	writer.array_f64("Weights", &[0.9, 0.2]);
	writer.end_node();

	// Cluster B: weak on vertex 0, strong on vertices 1 and 2.
	writer.begin_node("Deformer");
	writer.value_i64(402);
	writer.value_str("ClusterB\u{0}\u{1}SubDeformer");
	writer.value_str("Cluster");
	writer.array_i32("Indexes", &[0, 1, 2]);
	writer.array_f64("Weights", &[0.1, 0.8, 1.0]);
	writer.end_node();

	writer.end_node();

	writer.begin_node("Connections");
	let oo = |writer: &mut BinaryFbxWriter, src: i64, dst: i64| {
		writer.begin_node("C");
		writer.value_str("OO");
		writer.value_i64(src);
		writer.value_i64(dst);
		writer.end_node();
	};
	oo(&mut writer, 100, 200); // geometry -> model
	oo(&mut writer, 400, 100); // skin -> geometry
	oo(&mut writer, 401, 400); // clusters -> skin
	oo(&mut writer, 402, 400);
	oo(&mut writer, 300, 401); // bones -> clusters
	oo(&mut writer, 301, 402);
	writer.end_node();

	writer.finish_top_level();
	writer.into_bytes()
}

#[test]
fn skin_layout_sorts_weights_descending_per_vertex() {
	let scene = load_memory(&skinned_scene(), &LoadOptions::default()).expect("load");

	let skin_element = scene.elements_of(ElementKind::SkinDeformer).next().expect("skin");
	let ElementData::SkinDeformer(skin) = &skin_element.data else {
		panic!("skin payload");
	};

	assert_eq!(skin.clusters.len(), 2);
	assert_eq!(skin.vertices.len(), 3, "one slice per mesh vertex");
	assert_eq!(skin.max_weights_per_vertex, 2);

	// Vertex 0: cluster A (0.9) before cluster B (0.1).
	let v0 = skin.vertices[0];
	let weights0: Vec<f64> = (0..v0.num_weights)
		.map(|slot| skin.weights[(v0.weight_begin + slot) as usize].weight)
		.collect();
	assert_eq!(weights0, vec![0.9, 0.1]);

	// Vertex 1: cluster B (0.8) before cluster A (0.2).
	let v1 = skin.vertices[1];
	let first = skin.weights[v1.weight_begin as usize];
	assert_eq!(first.weight, 0.8);
	assert_eq!(first.cluster_index, 1);

	// Vertex 2: only cluster B.
	assert_eq!(skin.vertices[2].num_weights, 1);
}

#[test]
fn clusters_resolve_their_bone_nodes() {
	let scene = load_memory(&skinned_scene(), &LoadOptions::default()).expect("load");

	let bone_a = scene.find_element(ElementKind::Node, "BoneA").expect("bone A");
	for element in scene.elements_of(ElementKind::SkinCluster) {
		let ElementData::SkinCluster(cluster) = &element.data else {
			panic!("cluster payload");
		};
		let bone = cluster.bone_node.expect("bone resolved");
		if element.name.as_ref() == "ClusterA" {
			assert_eq!(bone, bone_a.element_id);
		}
	}
}

fn nurbs_scene(knots: &[f64]) -> Vec<u8> {
	let mut writer = BinaryFbxWriter::new(7400);
	writer.begin_node("Objects");
	writer.begin_node("Geometry");
	writer.value_i64(500);
	writer.value_str("Curve\u{0}\u{1}Geometry");
	writer.value_str("NurbsCurve");
	writer.leaf_i64("Order", 4);
	writer.leaf_str("Form", "Open");
	writer.array_f64("KnotVector", knots);
	writer.array_f64(
		"Points",
		&[
			0.0, 0.0, 0.0, 1.0, //
			1.0, 0.0, 0.0, 1.0, //
			2.0, 1.0, 0.0, 1.0, //
			3.0, 1.0, 0.0, 1.0,
		],
	);
	writer.end_node();
	writer.end_node();
	writer.finish_top_level();
	writer.into_bytes()
}

#[test]
fn valid_knot_vectors_produce_deduplicated_spans() {
	let bytes = nurbs_scene(&[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
	let scene = load_memory(&bytes, &LoadOptions::default()).expect("load");

	let curve = scene.elements_of(ElementKind::NurbsCurve).next().expect("curve");
	let ElementData::NurbsCurve(curve) = &curve.data else {
		panic!("curve payload");
	};

	assert!(curve.basis.valid);
	assert_eq!(curve.basis.order, 4);
	assert_eq!(curve.basis.spans, vec![0.0, 1.0]);
	assert_eq!(curve.control_points.len(), 4);
}

#[test]
fn decreasing_knots_are_invalid_leniently_and_fatal_strictly() {
	let bytes = nurbs_scene(&[0.0, 0.0, 1.0, 0.5, 2.0, 2.0]);

	let scene = load_memory(&bytes, &LoadOptions::default()).expect("lenient load");
	let curve = scene.elements_of(ElementKind::NurbsCurve).next().expect("curve");
	let ElementData::NurbsCurve(curve) = &curve.data else {
		panic!("curve payload");
	};
	assert!(!curve.basis.valid);

	let strict = LoadOptions {
		strict: true,
		..LoadOptions::default()
	};
	let err = load_memory(&bytes, &strict).unwrap_err();
	assert!(matches!(err.root(), FbxError::BadKnotVector { span: 3 }));
}
