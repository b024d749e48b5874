use fbxdoc::fbx::testdata::BinaryFbxWriter;
use fbxdoc::fbx::{ElementKind, LoadOptions, load_memory};

/// Three nodes in a chain plus one connection to a nonexistent object.
fn chain_scene() -> Vec<u8> {
	let mut writer = BinaryFbxWriter::new(7400);

	writer.begin_node("Objects");
	for (id, name) in [(1_i64, "A\u{0}\u{1}Model"), (2, "B\u{0}\u{1}Model"), (3, "C\u{0}\u{1}Model")] {
		writer.begin_node("Model");
		writer.value_i64(id);
		writer.value_str(name);
		writer.value_str("Null");
		writer.end_node();
	}
	writer.end_node();

	writer.begin_node("Connections");
	// C under B under A; plus a dangling reference that must be dropped.
	writer.begin_node("C");
	writer.value_str("OO");
	writer.value_i64(3);
	writer.value_i64(2);
	writer.end_node();
	writer.begin_node("C");
	writer.value_str("OO");
	writer.value_i64(2);
	writer.value_i64(1);
	writer.end_node();
	writer.begin_node("C");
	writer.value_str("OO");
	writer.value_i64(999);
	writer.value_i64(1);
	writer.end_node();
	writer.end_node();

	writer.finish_top_level();
	writer.into_bytes()
}

#[test]
fn hierarchy_depths_follow_object_links() {
	let scene = load_memory(&chain_scene(), &LoadOptions::default()).expect("load");

	let depth_of = |name: &str| {
		scene
			.find_element(ElementKind::Node, name)
			.and_then(|element| element.as_node())
			.map(|node| node.depth)
	};

	assert_eq!(depth_of("A"), Some(1), "orphan A attaches under the root");
	assert_eq!(depth_of("B"), Some(2));
	assert_eq!(depth_of("C"), Some(3));
}

#[test]
fn unresolved_connections_are_dropped_not_fatal() {
	let scene = load_memory(&chain_scene(), &LoadOptions::default()).expect("load succeeds despite dangling ref");
	// Two resolvable links survive; the reference to object 999 is gone.
	assert_eq!(scene.connections_src.len(), 2);
}

#[test]
fn connection_arrays_are_symmetric_permutations() {
	let scene = load_memory(&chain_scene(), &LoadOptions::default()).expect("load");

	assert_eq!(scene.connections_src.len(), scene.connections_dst.len());

	let canonical = |connections: &[fbxdoc::fbx::Connection]| {
		let mut keys: Vec<(u32, u32, String, String)> = connections
			.iter()
			.map(|conn| {
				(
					conn.src,
					conn.dst,
					conn.src_prop.as_ref().to_owned(),
					conn.dst_prop.as_ref().to_owned(),
				)
			})
			.collect();
		keys.sort();
		keys
	};
	assert_eq!(canonical(&scene.connections_src), canonical(&scene.connections_dst));
}

#[test]
fn adjacency_ranges_match_connection_queries() {
	let scene = load_memory(&chain_scene(), &LoadOptions::default()).expect("load");

	let node_a = scene.find_element(ElementKind::Node, "A").expect("A");
	let node_b = scene.find_element(ElementKind::Node, "B").expect("B");

	// B is a source once (B -> A) and a destination once (C -> B).
	let src: Vec<_> = scene.find_src_connections(node_b.element_id, None).collect();
	let dst: Vec<_> = scene.find_dst_connections(node_b.element_id, None).collect();
	assert_eq!(src.len(), 1);
	assert_eq!(dst.len(), 1);
	assert_eq!(src[0].dst, node_a.element_id);

	// A is never a source in the surviving set.
	assert_eq!(scene.find_src_connections(node_a.element_id, None).count(), 0);
}

#[test]
fn orphan_attachment_can_be_disabled_for_modern_files() {
	let options = LoadOptions {
		connect_orphans: false,
		..LoadOptions::default()
	};
	let scene = load_memory(&chain_scene(), &options).expect("load");

	let node_a = scene.find_element(ElementKind::Node, "A").expect("A");
	assert_eq!(node_a.as_node().expect("node").parent, None, "orphan stays detached");
}
