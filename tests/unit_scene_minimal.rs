use fbxdoc::fbx::testdata::BinaryFbxWriter;
use fbxdoc::fbx::{ElementKind, FbxError, FbxFormat, LoadOptions, load_memory};

fn minimal_v7400() -> BinaryFbxWriter {
	let mut writer = BinaryFbxWriter::new(7400);
	writer.begin_node("FBXHeaderExtension");
	writer.leaf_i64("FBXVersion", 7400);
	writer.leaf_str("Creator", "fbxdoc test suite");
	writer.end_node();
	writer.begin_node("Definitions");
	writer.end_node();
	writer.begin_node("Objects");
	writer.end_node();
	writer.begin_node("Connections");
	writer.end_node();
	writer
}

#[test]
fn minimal_binary_file_loads_with_synthetic_root_only() {
	let mut writer = minimal_v7400();
	writer.finish_top_level();
	let scene = load_memory(&writer.into_bytes(), &LoadOptions::default()).expect("load");

	assert_eq!(scene.count_of(ElementKind::Node), 1, "only the synthetic root");
	assert_eq!(scene.count_of(ElementKind::Mesh), 0);
	assert_eq!(scene.metadata.version, 7400);
	assert_eq!(scene.metadata.format, Some(FbxFormat::Binary));
	assert_eq!(scene.metadata.creator.as_ref(), "fbxdoc test suite");

	let root = scene.element(scene.root);
	let node = root.as_node().expect("root is a node");
	assert!(node.is_root);
	assert_eq!(node.depth, 0);
	assert!(node.children.is_empty());
}

#[test]
fn trailing_garbage_after_terminator_is_ignored() {
	let mut writer = minimal_v7400();
	writer.finish_top_level();
	let mut bytes = writer.into_bytes();
	bytes.extend_from_slice(&[0x13, 0x37]);

	let scene = load_memory(&bytes, &LoadOptions::default()).expect("load tolerates trailing bytes");
	assert_eq!(scene.count_of(ElementKind::Node), 1);
}

#[test]
fn corrupted_zlib_header_reports_compression_method() {
	let mut writer = BinaryFbxWriter::new(7400);
	writer.begin_node("Objects");
	writer.begin_node("Geometry");
	writer.value_i64(1001);
	writer.value_str("Geometry::Broken\u{0}\u{1}Geometry");
	writer.value_str("Mesh");
	let zlib_pos = writer.array_i32_deflate("Vertices", &[0; 96]);
	writer.end_node();
	writer.end_node();
	writer.finish_top_level();

	let mut bytes = writer.into_bytes();
	// Lower CMF nibble 7 instead of 8 (deflate), FCHECK patched to keep
	// the header checksum valid so the method itself is what fails.
	bytes[zlib_pos] = 0x77;
	bytes[zlib_pos + 1] = (31 - ((u32::from(bytes[zlib_pos]) * 256) % 31)) as u8;

	let err = load_memory(&bytes, &LoadOptions::default()).unwrap_err();
	assert!(
		matches!(err.root(), FbxError::Deflate(_)),
		"expected a deflate format violation, got {err:?}"
	);
	assert!(err.to_string().contains("compression method"), "got {err}");
}

#[test]
fn not_an_fbx_file_is_rejected_with_magic() {
	let err = load_memory(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A], &LoadOptions::default()).unwrap_err();
	assert!(matches!(err.root(), FbxError::NotAnFbxFile { magic: [0x89, 0x50, 0x4E, 0x47] }));
}
