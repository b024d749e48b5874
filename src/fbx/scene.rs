use std::sync::Arc;

use crate::fbx::element::{Element, ElementId, ElementKind, NUM_ELEMENT_KINDS};
use crate::fbx::header::FbxFormat;

/// Seconds per FBX time tick unit, as a divisor.
pub const FBX_TICKS_PER_SECOND: f64 = 46_186_158_000.0;

/// Document-level metadata gathered from the header extension.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
	/// FBX version digits (for example `7400`).
	pub version: u32,
	/// Container flavor the scene was parsed from.
	pub format: Option<FbxFormat>,
	/// `Creator` string.
	pub creator: Arc<str>,
	/// `CreationTime` string as stored.
	pub creation_time: Arc<str>,
}

/// Coordinate axis selector with lenient out-of-range defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
	/// Positive X.
	PosX,
	/// Positive Y.
	#[default]
	PosY,
	/// Positive Z.
	PosZ,
	/// Negative X.
	NegX,
	/// Negative Y.
	NegY,
	/// Negative Z.
	NegZ,
}

impl Axis {
	/// Combine the `*Axis` index and `*AxisSign` properties.
	///
	/// Out-of-range indices fall back to positive Y, matching the lenient
	/// enum conversions used elsewhere.
	pub fn from_index_and_sign(index: i64, sign: i64) -> Self {
		let negative = sign < 0;
		match (index, negative) {
			(0, false) => Self::PosX,
			(0, true) => Self::NegX,
			(1, false) => Self::PosY,
			(1, true) => Self::NegY,
			(2, false) => Self::PosZ,
			(2, true) => Self::NegZ,
			_ => Self::PosY,
		}
	}
}

/// Global scene settings from `GlobalSettings`.
#[derive(Debug, Clone)]
pub struct SceneSettings {
	/// Up axis.
	pub up_axis: Axis,
	/// Front axis.
	pub front_axis: Axis,
	/// Right/coordinate axis.
	pub coord_axis: Axis,
	/// Scene units in meters (FBX centimeters = 0.01).
	pub unit_meters: f64,
	/// Frame rate derived from the `TimeMode` enum, lenient.
	pub frames_per_second: f64,
	/// Default take start in seconds.
	pub time_begin: f64,
	/// Default take end in seconds.
	pub time_end: f64,
}

impl Default for SceneSettings {
	fn default() -> Self {
		Self {
			up_axis: Axis::PosY,
			front_axis: Axis::PosZ,
			coord_axis: Axis::PosX,
			unit_meters: 0.01,
			frames_per_second: 24.0,
			time_begin: 0.0,
			time_end: 0.0,
		}
	}
}

/// Frame rate for a `TimeMode` enum value, defaulting to 24 fps.
pub fn time_mode_fps(mode: i64) -> f64 {
	match mode {
		0 => 24.0,
		1 => 120.0,
		2 => 100.0,
		3 => 60.0,
		4 => 50.0,
		5 => 48.0,
		6 => 30.0,
		7 => 30.0,
		8 => 29.97,
		9 => 29.97,
		10 => 25.0,
		11 => 24.0,
		12 => 1.0,
		13 => 23.976,
		14 => 0.0,
		15 => 96.0,
		16 => 72.0,
		17 => 59.94,
		_ => 24.0,
	}
}

/// One resolved directed connection between two elements.
#[derive(Debug, Clone)]
pub struct Connection {
	/// Source (child-side) element.
	pub src: ElementId,
	/// Destination (parent-side) element.
	pub dst: ElementId,
	/// Source property for property links, empty for object links.
	pub src_prop: Arc<str>,
	/// Destination property for property links, empty for object links.
	pub dst_prop: Arc<str>,
}

/// Fully linked, immutable scene graph.
///
/// Element cross-references are dense indices into `elements`; the scene is
/// safe for concurrent read-only use and re-evaluation never mutates it.
#[derive(Debug, Clone)]
pub struct Scene {
	/// Document metadata.
	pub metadata: Metadata,
	/// Global settings.
	pub settings: SceneSettings,
	/// All elements, indexed by `ElementId`.
	pub elements: Vec<Element>,
	/// Per-kind element buckets in creation order.
	pub typed: Vec<Vec<ElementId>>,
	/// `(name, kind)`-sorted index for name lookup.
	pub by_name: Vec<(Arc<str>, ElementKind, ElementId)>,
	/// Connections sorted by `(src, src_prop, dst_prop)`.
	pub connections_src: Vec<Connection>,
	/// The same connections sorted by `(dst, dst_prop, src_prop)`.
	pub connections_dst: Vec<Connection>,
	/// Synthetic root node element.
	pub root: ElementId,
	/// Shared all-zero index buffer sized for the whole scene.
	pub zero_indices: Arc<[i32]>,
	/// Shared 0,1,2,... index buffer sized for the whole scene.
	pub consecutive_indices: Arc<[i32]>,
	/// Animation stacks in file order.
	pub anim_stacks: Vec<ElementId>,
}

impl Scene {
	/// Element by dense ID.
	pub fn element(&self, id: ElementId) -> &Element {
		&self.elements[id as usize]
	}

	/// All elements of one kind, in creation order.
	pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = &Element> {
		self.typed[kind as usize].iter().map(|id| &self.elements[*id as usize])
	}

	/// Number of elements of one kind.
	pub fn count_of(&self, kind: ElementKind) -> usize {
		self.typed[kind as usize].len()
	}

	/// Find an element by exact name and kind via binary search.
	pub fn find_element(&self, kind: ElementKind, name: &str) -> Option<&Element> {
		let index = self
			.by_name
			.binary_search_by(|(entry_name, entry_kind, _)| {
				entry_name
					.as_ref()
					.cmp(name)
					.then_with(|| entry_kind.cmp(&kind))
			})
			.ok()?;
		Some(&self.elements[self.by_name[index].2 as usize])
	}

	/// Connections whose source is `element`, optionally filtered by
	/// source property.
	pub fn find_src_connections<'a>(&'a self, element: ElementId, prop: Option<&'a str>) -> impl Iterator<Item = &'a Connection> {
		let (begin, end) = self.elements[element as usize].src_connections;
		self.connections_src[begin as usize..end as usize]
			.iter()
			.filter(move |conn| prop.is_none_or(|prop| conn.src_prop.as_ref() == prop))
	}

	/// Connections whose destination is `element`, optionally filtered by
	/// destination property.
	pub fn find_dst_connections<'a>(&'a self, element: ElementId, prop: Option<&'a str>) -> impl Iterator<Item = &'a Connection> {
		let (begin, end) = self.elements[element as usize].dst_connections;
		self.connections_dst[begin as usize..end as usize]
			.iter()
			.filter(move |conn| prop.is_none_or(|prop| conn.dst_prop.as_ref() == prop))
	}

	/// Root-first depth-first traversal order of the node hierarchy.
	pub fn node_order(&self) -> Vec<ElementId> {
		let mut order = Vec::new();
		let mut stack = vec![self.root];
		while let Some(id) = stack.pop() {
			order.push(id);
			if let Some(node) = self.elements[id as usize].as_node() {
				for child in node.children.iter().rev() {
					stack.push(*child);
				}
			}
		}
		order
	}
}

/// Empty per-kind bucket table.
pub(crate) fn empty_typed_buckets() -> Vec<Vec<ElementId>> {
	vec![Vec::new(); NUM_ELEMENT_KINDS]
}

#[cfg(test)]
mod tests {
	use super::{Axis, time_mode_fps};

	#[test]
	fn axis_conversion_is_lenient() {
		assert_eq!(Axis::from_index_and_sign(2, 1), Axis::PosZ);
		assert_eq!(Axis::from_index_and_sign(1, -1), Axis::NegY);
		assert_eq!(Axis::from_index_and_sign(17, 1), Axis::PosY);
	}

	#[test]
	fn time_mode_defaults_to_film_rate() {
		assert_eq!(time_mode_fps(6), 30.0);
		assert_eq!(time_mode_fps(10), 25.0);
		assert_eq!(time_mode_fps(999), 24.0);
	}
}
