use std::sync::Arc;

use crate::fbx::props::PropList;
use crate::fbx::transform::{RotationOrder, Transform};

/// Dense scene-wide element index, stable for the scene's lifetime.
pub type ElementId = u32;

/// Uniform identifier space for connection resolution.
///
/// Post-7000 files carry explicit 64-bit object IDs; earlier formats and
/// in-memory-only elements get synthesized IDs from a counter placed above
/// the real-ID range, so one map resolves both eras.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FbxId {
	/// Explicit 64-bit object ID from the file.
	Real(u64),
	/// Scene-internal synthesized ID.
	Synthetic(u64),
}

impl FbxId {
	/// Collapse to a single hashable word; synthetic IDs occupy the top
	/// half of the space.
	pub fn raw(&self) -> u64 {
		match self {
			Self::Real(value) => *value,
			Self::Synthetic(value) => (1 << 63) | *value,
		}
	}
}

/// Discriminant of an element's typed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum ElementKind {
	Node,
	Mesh,
	Light,
	Camera,
	Bone,
	Empty,
	Material,
	Texture,
	Video,
	SkinDeformer,
	SkinCluster,
	BlendDeformer,
	BlendChannel,
	BlendShape,
	NurbsCurve,
	NurbsSurface,
	AnimStack,
	AnimLayer,
	AnimValue,
	AnimCurve,
	Pose,
	Unknown,
}

/// Number of distinct element kinds, for per-kind bucket arrays.
pub const NUM_ELEMENT_KINDS: usize = ElementKind::Unknown as usize + 1;

/// One typed scene element: common header plus kind-specific payload.
#[derive(Debug, Clone)]
pub struct Element {
	/// Dense scene-wide index.
	pub element_id: ElementId,
	/// Dense index within this element's kind bucket.
	pub typed_id: u32,
	/// File-native or synthesized object ID.
	pub fbx_id: FbxId,
	/// Display name, with the `Type::` class prefix stripped.
	pub name: Arc<str>,
	/// Properties, defaults-chained to the class template.
	pub props: PropList,
	/// Slice of the src-sorted connection array touching this element.
	pub src_connections: (u32, u32),
	/// Slice of the dst-sorted connection array touching this element.
	pub dst_connections: (u32, u32),
	/// Kind-specific payload.
	pub data: ElementData,
}

impl Element {
	/// Payload discriminant.
	pub fn kind(&self) -> ElementKind {
		self.data.kind()
	}

	/// Node payload view.
	pub fn as_node(&self) -> Option<&NodeData> {
		match &self.data {
			ElementData::Node(data) => Some(data),
			_ => None,
		}
	}

	/// Mesh payload view.
	pub fn as_mesh(&self) -> Option<&MeshData> {
		match &self.data {
			ElementData::Mesh(data) => Some(data),
			_ => None,
		}
	}

	/// Animation curve payload view.
	pub fn as_anim_curve(&self) -> Option<&AnimCurveData> {
		match &self.data {
			ElementData::AnimCurve(data) => Some(data),
			_ => None,
		}
	}
}

/// Kind-specific element payload.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum ElementData {
	Node(Box<NodeData>),
	Mesh(Box<MeshData>),
	Light(Box<LightData>),
	Camera(Box<CameraData>),
	Bone(BoneData),
	Empty,
	Material(Box<MaterialData>),
	Texture(Box<TextureData>),
	Video(Box<VideoData>),
	SkinDeformer(Box<SkinData>),
	SkinCluster(Box<ClusterData>),
	BlendDeformer(BlendData),
	BlendChannel(BlendChannelData),
	BlendShape(Box<ShapeData>),
	NurbsCurve(Box<NurbsCurveData>),
	NurbsSurface(Box<NurbsSurfaceData>),
	AnimStack(AnimStackData),
	AnimLayer(Box<AnimLayerData>),
	AnimValue(AnimValueData),
	AnimCurve(Box<AnimCurveData>),
	Pose(Box<PoseData>),
	Unknown,
}

impl ElementData {
	/// Payload discriminant.
	pub fn kind(&self) -> ElementKind {
		match self {
			Self::Node(_) => ElementKind::Node,
			Self::Mesh(_) => ElementKind::Mesh,
			Self::Light(_) => ElementKind::Light,
			Self::Camera(_) => ElementKind::Camera,
			Self::Bone(_) => ElementKind::Bone,
			Self::Empty => ElementKind::Empty,
			Self::Material(_) => ElementKind::Material,
			Self::Texture(_) => ElementKind::Texture,
			Self::Video(_) => ElementKind::Video,
			Self::SkinDeformer(_) => ElementKind::SkinDeformer,
			Self::SkinCluster(_) => ElementKind::SkinCluster,
			Self::BlendDeformer(_) => ElementKind::BlendDeformer,
			Self::BlendChannel(_) => ElementKind::BlendChannel,
			Self::BlendShape(_) => ElementKind::BlendShape,
			Self::NurbsCurve(_) => ElementKind::NurbsCurve,
			Self::NurbsSurface(_) => ElementKind::NurbsSurface,
			Self::AnimStack(_) => ElementKind::AnimStack,
			Self::AnimLayer(_) => ElementKind::AnimLayer,
			Self::AnimValue(_) => ElementKind::AnimValue,
			Self::AnimCurve(_) => ElementKind::AnimCurve,
			Self::Pose(_) => ElementKind::Pose,
			Self::Unknown => ElementKind::Unknown,
		}
	}
}

/// Scene-graph node: hierarchy plus decomposed local transform.
#[derive(Debug, Clone, Default)]
pub struct NodeData {
	/// Parent node element, none for the root.
	pub parent: Option<ElementId>,
	/// Child node elements in connection order.
	pub children: Vec<ElementId>,
	/// Hops from the scene root.
	pub depth: u32,
	/// Attached attribute element (mesh, light, camera, bone, ...).
	pub attrib: Option<ElementId>,
	/// Attached mesh, when the attribute is one.
	pub mesh: Option<ElementId>,
	/// Bound materials in connection order.
	pub materials: Vec<ElementId>,
	/// Local transform from the node's properties.
	pub local_transform: Transform,
	/// Euler order used to build `local_transform`.
	pub rotation_order: RotationOrder,
	/// Node visibility property.
	pub visible: bool,
	/// True for the synthetic scene root.
	pub is_root: bool,
}

/// One polygon of a mesh: a range into the vertex-index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
	/// First index of this face in the index buffer.
	pub index_begin: u32,
	/// Number of indices (vertices) in this face.
	pub num_indices: u32,
}

/// Index list, either owned or one of the shared procedural buffers.
#[derive(Debug, Clone)]
pub struct IndexBuffer {
	storage: IndexStorage,
	len: usize,
}

#[derive(Debug, Clone)]
enum IndexStorage {
	Own(Vec<i32>),
	Shared(Arc<[i32]>),
}

impl IndexBuffer {
	/// Owned index storage.
	pub fn own(indices: Vec<i32>) -> Self {
		let len = indices.len();
		Self {
			storage: IndexStorage::Own(indices),
			len,
		}
	}

	/// Prefix view of a shared procedural buffer.
	pub fn shared(buffer: Arc<[i32]>, len: usize) -> Self {
		debug_assert!(len <= buffer.len());
		Self {
			storage: IndexStorage::Shared(buffer),
			len,
		}
	}

	/// Empty buffer.
	pub fn empty() -> Self {
		Self::own(Vec::new())
	}

	/// Index view.
	pub fn as_slice(&self) -> &[i32] {
		match &self.storage {
			IndexStorage::Own(indices) => indices,
			IndexStorage::Shared(buffer) => &buffer[..self.len],
		}
	}

	/// Element count.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Return whether the buffer holds no indices.
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}
}

impl Default for IndexBuffer {
	fn default() -> Self {
		Self::empty()
	}
}

/// How attribute values map onto mesh topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingMode {
	/// One value per polygon-vertex corner.
	#[default]
	ByPolygonVertex,
	/// One value per control-point vertex.
	ByVertex,
	/// One value per polygon.
	ByPolygon,
	/// One value per edge.
	ByEdge,
	/// A single value for the whole mesh.
	AllSame,
}

impl MappingMode {
	/// Lenient conversion from the `MappingInformationType` string.
	pub fn from_name(name: &str) -> Self {
		match name {
			"ByPolygonVertex" | "ByPolygon Vertex" => Self::ByPolygonVertex,
			"ByVertex" | "ByVertice" | "ByControlPoint" => Self::ByVertex,
			"ByPolygon" => Self::ByPolygon,
			"ByEdge" => Self::ByEdge,
			"AllSame" => Self::AllSame,
			_ => Self::ByPolygonVertex,
		}
	}
}

/// One vertex attribute layer (normals, UVs, colors, ...).
#[derive(Debug, Clone, Default)]
pub struct VertexAttrib {
	/// Layer name, empty for unnamed layers.
	pub name: Arc<str>,
	/// Flat value storage, `components` floats per value.
	pub values: Vec<f64>,
	/// Components per value (3 for normals, 2 for UVs).
	pub components: usize,
	/// Per-index indirection into `values`.
	pub indices: IndexBuffer,
	/// Topology the values map over.
	pub mapping: MappingMode,
	/// True when `indices` is the shared consecutive buffer.
	pub direct: bool,
}

/// Per-material face bucket of a mesh.
#[derive(Debug, Clone, Default)]
pub struct MaterialFaces {
	/// Index into the owning node's material list.
	pub material_index: u32,
	/// Faces using this material, as indices into `faces`.
	pub face_indices: Vec<u32>,
}

/// Polygonal mesh geometry.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
	/// Control-point positions.
	pub vertices: Vec<[f64; 3]>,
	/// Polygon-vertex indices with terminators already decoded.
	pub vertex_indices: IndexBuffer,
	/// Faces slicing `vertex_indices`.
	pub faces: Vec<Face>,
	/// Edge index pairs into `vertex_indices`, as stored.
	pub edges: Vec<i32>,
	/// Normal layer.
	pub normals: Option<VertexAttrib>,
	/// UV layers in layer order.
	pub uv_sets: Vec<VertexAttrib>,
	/// Vertex color layers in layer order.
	pub color_sets: Vec<VertexAttrib>,
	/// Per-face material indices.
	pub face_material: IndexBuffer,
	/// Single material index when mapping was `AllSame`, resolved into
	/// `face_material` during linking.
	pub face_material_all_same: Option<i32>,
	/// Faces grouped per material slot, filled during linking.
	pub material_faces: Vec<MaterialFaces>,
	/// Skin deformers bound to this mesh.
	pub skin_deformers: Vec<ElementId>,
	/// Blend-shape deformers bound to this mesh.
	pub blend_deformers: Vec<ElementId>,
	/// Total polygon-vertex index count.
	pub num_indices: usize,
	/// Number of faces with more than four vertices.
	pub num_bad_faces: usize,
}

/// Light attribute payload.
#[derive(Debug, Clone)]
pub struct LightData {
	/// RGB color.
	pub color: [f64; 3],
	/// Intensity percentage.
	pub intensity: f64,
	/// Lenient light type from the `LightType` enum int.
	pub light_type: LightType,
}

/// Light source shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightType {
	/// Omnidirectional point light.
	#[default]
	Point,
	/// Directional sun light.
	Directional,
	/// Spot cone light.
	Spot,
	/// Area light.
	Area,
	/// Volumetric light.
	Volume,
}

impl LightType {
	/// Lenient conversion from the `LightType` enum int.
	pub fn from_int(value: i64) -> Self {
		match value {
			0 => Self::Point,
			1 => Self::Directional,
			2 => Self::Spot,
			3 => Self::Area,
			4 => Self::Volume,
			_ => Self::Point,
		}
	}
}

/// Camera attribute payload.
#[derive(Debug, Clone)]
pub struct CameraData {
	/// Field of view in degrees.
	pub field_of_view_deg: f64,
	/// Aspect ratio, width over height.
	pub aspect_ratio: f64,
	/// Near clip plane.
	pub near_plane: f64,
	/// Far clip plane.
	pub far_plane: f64,
	/// True for orthographic projection.
	pub orthographic: bool,
}

/// Bone (limb) attribute payload.
#[derive(Debug, Clone, Default)]
pub struct BoneData {
	/// Limb length relative to its parent.
	pub relative_length: f64,
	/// True for the root limb variant.
	pub is_root: bool,
}

/// One shaded material slot: constant value, factor, optional texture.
#[derive(Debug, Clone)]
pub struct MaterialMap {
	/// Constant color or scalar (in `value[0]`).
	pub value: [f64; 3],
	/// Blend factor applied to the value.
	pub factor: f64,
	/// Bound texture after linking.
	pub texture: Option<ElementId>,
	/// True when the property existed in the file.
	pub has_value: bool,
}

impl Default for MaterialMap {
	fn default() -> Self {
		Self {
			value: [0.0; 3],
			factor: 1.0,
			texture: None,
			has_value: false,
		}
	}
}

/// Surface material with the common FBX shading slots resolved.
#[derive(Debug, Clone, Default)]
pub struct MaterialData {
	/// `ShadingModel` string (lambert, phong, ...).
	pub shading_model: Arc<str>,
	/// Diffuse color slot.
	pub diffuse: MaterialMap,
	/// Specular color slot.
	pub specular: MaterialMap,
	/// Ambient color slot.
	pub ambient: MaterialMap,
	/// Emissive color slot.
	pub emissive: MaterialMap,
	/// Normal map slot.
	pub normal_map: MaterialMap,
	/// Bump map slot.
	pub bump: MaterialMap,
	/// Opacity slot, scalar in `value[0]`.
	pub opacity: MaterialMap,
	/// Shininess exponent slot, scalar in `value[0]`.
	pub shininess: MaterialMap,
	/// Reflection factor slot.
	pub reflection: MaterialMap,
}

/// File texture payload.
#[derive(Debug, Clone, Default)]
pub struct TextureData {
	/// Absolute filename as stored.
	pub filename: Arc<str>,
	/// Relative filename as stored.
	pub relative_filename: Arc<str>,
	/// UV set this texture samples.
	pub uv_set: Arc<str>,
	/// Backing video/embedded-content element after linking.
	pub video: Option<ElementId>,
}

/// Video clip / embedded texture content payload.
#[derive(Debug, Clone, Default)]
pub struct VideoData {
	/// Absolute filename as stored.
	pub filename: Arc<str>,
	/// Relative filename as stored.
	pub relative_filename: Arc<str>,
	/// Embedded file bytes, shared between duplicate videos.
	pub content: Option<Arc<[u8]>>,
}

/// One weight entry of a skinned vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinWeight {
	/// Index into the deformer's cluster list.
	pub cluster_index: u32,
	/// Normalized bone weight.
	pub weight: f64,
}

/// Per-vertex slice into the deformer's weight array.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkinVertex {
	/// First weight belonging to this vertex.
	pub weight_begin: u32,
	/// Number of weights, sorted by descending weight.
	pub num_weights: u32,
}

/// Skin deformer aggregating clusters into a per-vertex layout.
#[derive(Debug, Clone, Default)]
pub struct SkinData {
	/// Member clusters in connection order.
	pub clusters: Vec<ElementId>,
	/// Per-mesh-vertex weight slices.
	pub vertices: Vec<SkinVertex>,
	/// Flattened weights, grouped per vertex, descending.
	pub weights: Vec<SkinWeight>,
	/// Largest `num_weights` over all vertices.
	pub max_weights_per_vertex: u32,
}

/// Skin cluster: one bone's influence on mesh vertices.
#[derive(Debug, Clone, Default)]
pub struct ClusterData {
	/// Bound bone node after linking.
	pub bone_node: Option<ElementId>,
	/// Influenced vertex indices.
	pub vertices: Vec<i32>,
	/// Weight per influenced vertex.
	pub weights: Vec<f64>,
	/// Mesh-to-bone transform at bind time, column-major.
	pub transform: [f64; 16],
	/// Bone world transform at bind time, column-major.
	pub transform_link: [f64; 16],
}

/// Blend-shape deformer holding its channels.
#[derive(Debug, Clone, Default)]
pub struct BlendData {
	/// Member channels in connection order.
	pub channels: Vec<ElementId>,
}

/// One in-between keyframe of a blend channel.
#[derive(Debug, Clone, Copy)]
pub struct BlendKeyframe {
	/// Target shape element.
	pub shape: ElementId,
	/// Full-weight percentage this shape is reached at.
	pub target_weight: f64,
}

/// Blend-shape channel: progressive shape keyframes plus current weight.
#[derive(Debug, Clone, Default)]
pub struct BlendChannelData {
	/// Shape keyframes sorted by ascending target weight.
	pub keyframes: Vec<BlendKeyframe>,
	/// Current deform weight percentage.
	pub weight: f64,
}

/// Blend shape offsets for a sparse set of vertices.
#[derive(Debug, Clone, Default)]
pub struct ShapeData {
	/// Affected control-point indices.
	pub indices: Vec<i32>,
	/// Position offset per affected vertex.
	pub offsets: Vec<[f64; 3]>,
}

/// NURBS basis parameters in one direction.
#[derive(Debug, Clone, Default)]
pub struct NurbsBasis {
	/// Curve order (degree + 1).
	pub order: u32,
	/// End-condition topology.
	pub topology: NurbsTopology,
	/// Knot vector, non-decreasing when `valid`.
	pub knots: Vec<f64>,
	/// Deduplicated knot spans.
	pub spans: Vec<f64>,
	/// Knot vector passed validation during linking.
	pub valid: bool,
}

/// NURBS end condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NurbsTopology {
	/// Open curve, clamped knots.
	#[default]
	Open,
	/// Periodic (cyclic) curve.
	Periodic,
	/// Closed curve, first point repeated.
	Closed,
}

impl NurbsTopology {
	/// Lenient conversion from the `Form` string.
	pub fn from_name(name: &str) -> Self {
		match name {
			"Periodic" => Self::Periodic,
			"Closed" => Self::Closed,
			_ => Self::Open,
		}
	}
}

/// NURBS curve payload.
#[derive(Debug, Clone, Default)]
pub struct NurbsCurveData {
	/// Basis in the curve direction.
	pub basis: NurbsBasis,
	/// Homogeneous control points (x, y, z, w).
	pub control_points: Vec<[f64; 4]>,
}

/// NURBS surface payload.
#[derive(Debug, Clone, Default)]
pub struct NurbsSurfaceData {
	/// Basis in U.
	pub basis_u: NurbsBasis,
	/// Basis in V.
	pub basis_v: NurbsBasis,
	/// Control-point count in U.
	pub num_u: usize,
	/// Control-point count in V.
	pub num_v: usize,
	/// Homogeneous control points, U-major.
	pub control_points: Vec<[f64; 4]>,
}

/// Keyframe interpolation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
	/// Hold the previous value until the next key.
	ConstantPrev,
	/// Hold the next value from this key on.
	ConstantNext,
	/// Straight line between keys.
	Linear,
	/// Cubic Bezier with per-key tangents.
	#[default]
	Cubic,
}

/// One animation keyframe with cubic tangent data.
#[derive(Debug, Clone, Copy)]
pub struct Keyframe {
	/// Key time in seconds.
	pub time: f64,
	/// Key value.
	pub value: f64,
	/// Interpolation toward the next key.
	pub interpolation: Interpolation,
	/// Outgoing tangent: time fraction of the span (0..1).
	pub right_dx: f64,
	/// Outgoing tangent: value delta per span.
	pub right_dy: f64,
	/// Incoming tangent of the next key: time fraction.
	pub next_left_dx: f64,
	/// Incoming tangent of the next key: value delta.
	pub next_left_dy: f64,
}

/// Animation curve: keyframes sorted by time.
#[derive(Debug, Clone, Default)]
pub struct AnimCurveData {
	/// Keys sorted by ascending time.
	pub keyframes: Vec<Keyframe>,
}

/// Animated property value: up to three curves plus a default.
#[derive(Debug, Clone, Default)]
pub struct AnimValueData {
	/// Per-component default from the curve node's `d|...` props.
	pub default: [f64; 3],
	/// X/Y/Z component curves after linking.
	pub curves: [Option<ElementId>; 3],
}

/// One bound animated property inside a layer.
#[derive(Debug, Clone)]
pub struct AnimProp {
	/// Target element.
	pub element: ElementId,
	/// Sort key of `prop_name`.
	pub internal_key: u32,
	/// Target property name.
	pub prop_name: Arc<str>,
	/// Bound animated value element.
	pub anim_value: ElementId,
}

/// Animation layer: bound properties plus blend state.
#[derive(Debug, Clone, Default)]
pub struct AnimLayerData {
	/// Bindings sorted by `(element, internal_key, prop_name)`.
	pub anim_props: Vec<AnimProp>,
	/// Layer weight, 0..1.
	pub weight: f64,
	/// Additive composition instead of override blending.
	pub additive: bool,
	/// Weight differs from 1 or composition is non-trivial.
	pub blended: bool,
	/// Smallest bound element ID, for fast rejection.
	pub min_element_id: ElementId,
	/// Largest bound element ID, for fast rejection.
	pub max_element_id: ElementId,
}

impl AnimLayerData {
	/// Cheap containment pre-check before binary-searching bindings.
	pub fn may_contain(&self, element: ElementId) -> bool {
		!self.anim_props.is_empty() && element >= self.min_element_id && element <= self.max_element_id
	}
}

/// Animation stack (take): ordered layers and time range.
#[derive(Debug, Clone, Default)]
pub struct AnimStackData {
	/// Member layers in connection order.
	pub layers: Vec<ElementId>,
	/// Take start time in seconds.
	pub time_begin: f64,
	/// Take end time in seconds.
	pub time_end: f64,
}

/// One node's bind matrix inside a pose.
#[derive(Debug, Clone, Copy)]
pub struct BonePose {
	/// Posed node element.
	pub node: ElementId,
	/// World matrix, column-major.
	pub matrix: [f64; 16],
}

/// Pose element payload.
#[derive(Debug, Clone, Default)]
pub struct PoseData {
	/// Per-node matrices; `node` fields are valid after linking.
	pub bone_poses: Vec<BonePose>,
	/// Raw FBX node IDs parallel to `bone_poses`, consumed by linking.
	pub raw_node_ids: Vec<u64>,
	/// True for bind poses.
	pub is_bind_pose: bool,
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::{ElementData, ElementKind, FbxId, IndexBuffer, MappingMode};

	#[test]
	fn fbx_id_spaces_do_not_collide() {
		assert_ne!(FbxId::Real(5).raw(), FbxId::Synthetic(5).raw());
		assert_eq!(FbxId::Real(5).raw(), 5);
	}

	#[test]
	fn kind_matches_payload() {
		assert_eq!(ElementData::Unknown.kind(), ElementKind::Unknown);
		assert_eq!(ElementData::Empty.kind(), ElementKind::Empty);
	}

	#[test]
	fn shared_index_buffer_views_a_prefix() {
		let shared: Arc<[i32]> = (0..10).collect();
		let buffer = IndexBuffer::shared(shared, 4);
		assert_eq!(buffer.as_slice(), &[0, 1, 2, 3]);
		assert_eq!(buffer.len(), 4);
	}

	#[test]
	fn mapping_mode_defaults_leniently() {
		assert_eq!(MappingMode::from_name("ByControlPoint"), MappingMode::ByVertex);
		assert_eq!(MappingMode::from_name("SomethingElse"), MappingMode::ByPolygonVertex);
	}
}
