use std::sync::Arc;

use crate::fbx::budget::MemoryBudget;
use crate::fbx::map::RhMap;
use crate::fbx::Result;

/// FNV-1a hash over a byte sequence.
pub fn fnv1a(bytes: &[u8]) -> u64 {
	let mut hash = 0xCBF2_9CE4_8422_2325_u64;
	for byte in bytes {
		hash ^= u64::from(*byte);
		hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
	}
	hash
}

/// Deduplicating string interner for one load.
///
/// Every name and string value seen while parsing is interned here, so
/// equal content yields the identical `Arc<str>` and hot-path name checks
/// against the pre-registered [`WellKnown`] handles reduce to pointer
/// comparisons. Non-UTF-8 input is converted lossily before interning.
pub struct StringPool {
	map: RhMap<Arc<str>>,
	/// Pre-registered FBX keyword handles.
	pub names: WellKnown,
	empty: Arc<str>,
}

impl StringPool {
	/// Create a pool with the well-known keyword table pre-registered.
	pub fn new(budget: &mut MemoryBudget) -> Result<Self> {
		let mut map = RhMap::new();
		let empty = intern_in(&mut map, budget, "")?;
		let names = WellKnown::register(&mut map, budget)?;
		Ok(Self { map, names, empty })
	}

	/// Intern a byte sequence, lossily converting invalid UTF-8.
	pub fn intern_bytes(&mut self, budget: &mut MemoryBudget, bytes: &[u8]) -> Result<Arc<str>> {
		if bytes.is_empty() {
			return Ok(self.empty.clone());
		}
		match std::str::from_utf8(bytes) {
			Ok(text) => intern_in(&mut self.map, budget, text),
			Err(_) => {
				let owned = String::from_utf8_lossy(bytes).into_owned();
				intern_in(&mut self.map, budget, &owned)
			}
		}
	}

	/// Intern a string slice.
	pub fn intern(&mut self, budget: &mut MemoryBudget, text: &str) -> Result<Arc<str>> {
		if text.is_empty() {
			return Ok(self.empty.clone());
		}
		intern_in(&mut self.map, budget, text)
	}

	/// The canonical empty string.
	pub fn empty(&self) -> Arc<str> {
		self.empty.clone()
	}

	/// Number of distinct interned strings, keywords included.
	pub fn len(&self) -> usize {
		self.map.len()
	}

	/// Return whether the pool holds no strings.
	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}
}

fn intern_in(map: &mut RhMap<Arc<str>>, budget: &mut MemoryBudget, text: &str) -> Result<Arc<str>> {
	let hash = fnv1a(text.as_bytes());
	if let Some(found) = map.find(hash, |item| item.as_ref() == text) {
		return Ok(map.get(found).clone());
	}

	budget.charge(text.len())?;
	let handle: Arc<str> = Arc::from(text);
	map.insert(budget, hash, handle.clone())?;
	Ok(handle)
}

/// Interned handles for keyword names compared by pointer on hot paths.
#[allow(missing_docs)]
pub struct WellKnown {
	pub fbx_header_extension: Arc<str>,
	pub fbx_version: Arc<str>,
	pub creator: Arc<str>,
	pub creation_time: Arc<str>,
	pub global_settings: Arc<str>,
	pub documents: Arc<str>,
	pub definitions: Arc<str>,
	pub objects: Arc<str>,
	pub connections: Arc<str>,
	pub takes: Arc<str>,
	pub object_type: Arc<str>,
	pub property_template: Arc<str>,
	pub model: Arc<str>,
	pub geometry: Arc<str>,
	pub node_attribute: Arc<str>,
	pub material: Arc<str>,
	pub texture: Arc<str>,
	pub video: Arc<str>,
	pub deformer: Arc<str>,
	pub pose: Arc<str>,
	pub animation_stack: Arc<str>,
	pub animation_layer: Arc<str>,
	pub animation_curve_node: Arc<str>,
	pub animation_curve: Arc<str>,
	pub properties70: Arc<str>,
	pub properties60: Arc<str>,
	pub prop_p: Arc<str>,
	pub prop_property: Arc<str>,
	pub conn_c: Arc<str>,
	pub conn_connect: Arc<str>,
	pub oo: Arc<str>,
	pub op: Arc<str>,
	pub po: Arc<str>,
	pub pp: Arc<str>,
	pub vertices: Arc<str>,
	pub polygon_vertex_index: Arc<str>,
	pub edges: Arc<str>,
	pub normals: Arc<str>,
	pub uv: Arc<str>,
	pub uv_index: Arc<str>,
	pub materials: Arc<str>,
	pub indexes: Arc<str>,
	pub weights: Arc<str>,
	pub transform: Arc<str>,
	pub transform_link: Arc<str>,
	pub key_time: Arc<str>,
	pub key_value_float: Arc<str>,
	pub key_attr_flags: Arc<str>,
	pub key_attr_data_float: Arc<str>,
	pub key_attr_ref_count: Arc<str>,
	pub content: Arc<str>,
	pub relative_filename: Arc<str>,
	pub filename: Arc<str>,
	pub knot_vector: Arc<str>,
	pub points: Arc<str>,
	pub shape: Arc<str>,
	pub full_weights: Arc<str>,
	pub lcl_translation: Arc<str>,
	pub lcl_rotation: Arc<str>,
	pub lcl_scaling: Arc<str>,
}

impl WellKnown {
	fn register(map: &mut RhMap<Arc<str>>, budget: &mut MemoryBudget) -> Result<Self> {
		let mut get = |text: &str| intern_in(map, budget, text);
		Ok(Self {
			fbx_header_extension: get("FBXHeaderExtension")?,
			fbx_version: get("FBXVersion")?,
			creator: get("Creator")?,
			creation_time: get("CreationTime")?,
			global_settings: get("GlobalSettings")?,
			documents: get("Documents")?,
			definitions: get("Definitions")?,
			objects: get("Objects")?,
			connections: get("Connections")?,
			takes: get("Takes")?,
			object_type: get("ObjectType")?,
			property_template: get("PropertyTemplate")?,
			model: get("Model")?,
			geometry: get("Geometry")?,
			node_attribute: get("NodeAttribute")?,
			material: get("Material")?,
			texture: get("Texture")?,
			video: get("Video")?,
			deformer: get("Deformer")?,
			pose: get("Pose")?,
			animation_stack: get("AnimationStack")?,
			animation_layer: get("AnimationLayer")?,
			animation_curve_node: get("AnimationCurveNode")?,
			animation_curve: get("AnimationCurve")?,
			properties70: get("Properties70")?,
			properties60: get("Properties60")?,
			prop_p: get("P")?,
			prop_property: get("Property")?,
			conn_c: get("C")?,
			conn_connect: get("Connect")?,
			oo: get("OO")?,
			op: get("OP")?,
			po: get("PO")?,
			pp: get("PP")?,
			vertices: get("Vertices")?,
			polygon_vertex_index: get("PolygonVertexIndex")?,
			edges: get("Edges")?,
			normals: get("Normals")?,
			uv: get("UV")?,
			uv_index: get("UVIndex")?,
			materials: get("Materials")?,
			indexes: get("Indexes")?,
			weights: get("Weights")?,
			transform: get("Transform")?,
			transform_link: get("TransformLink")?,
			key_time: get("KeyTime")?,
			key_value_float: get("KeyValueFloat")?,
			key_attr_flags: get("KeyAttrFlags")?,
			key_attr_data_float: get("KeyAttrDataFloat")?,
			key_attr_ref_count: get("KeyAttrRefCount")?,
			content: get("Content")?,
			relative_filename: get("RelativeFilename")?,
			filename: get("Filename")?,
			knot_vector: get("KnotVector")?,
			points: get("Points")?,
			shape: get("Shape")?,
			full_weights: get("FullWeights")?,
			lcl_translation: get("Lcl Translation")?,
			lcl_rotation: get("Lcl Rotation")?,
			lcl_scaling: get("Lcl Scaling")?,
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::StringPool;
	use crate::fbx::budget::MemoryBudget;
	use crate::fbx::BudgetLimits;

	fn pool() -> (StringPool, MemoryBudget) {
		let mut budget = MemoryBudget::new(BudgetLimits::default());
		let pool = StringPool::new(&mut budget).expect("pool");
		(pool, budget)
	}

	#[test]
	fn interning_same_bytes_returns_identical_pointer() {
		let (mut pool, mut budget) = pool();
		let first = pool.intern_bytes(&mut budget, b"Lcl Translation").expect("intern");
		let second = pool.intern_bytes(&mut budget, b"Lcl Translation").expect("intern");
		assert!(Arc::ptr_eq(&first, &second));
	}

	#[test]
	fn distinct_content_never_shares_a_pointer() {
		let (mut pool, mut budget) = pool();
		let left = pool.intern(&mut budget, "Vertices").expect("intern");
		let right = pool.intern(&mut budget, "Normals").expect("intern");
		assert!(!Arc::ptr_eq(&left, &right));
	}

	#[test]
	fn well_known_names_match_parsed_names_by_pointer() {
		let (mut pool, mut budget) = pool();
		let parsed = pool.intern_bytes(&mut budget, b"Objects").expect("intern");
		assert!(Arc::ptr_eq(&parsed, &pool.names.objects));
	}

	#[test]
	fn invalid_utf8_interns_lossily_and_dedups() {
		let (mut pool, mut budget) = pool();
		let first = pool.intern_bytes(&mut budget, b"Mesh\xFF").expect("intern");
		let second = pool.intern_bytes(&mut budget, b"Mesh\xFF").expect("intern");
		assert!(Arc::ptr_eq(&first, &second));
		assert!(first.as_ref().starts_with("Mesh"));
	}
}
