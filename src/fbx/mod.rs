mod anim;
mod arena;
mod ascii;
mod binary;
mod budget;
mod builder;
mod cursor;
mod element;
mod error;
mod file;
mod header;
mod inflate;
mod link;
mod map;
mod mesh;
mod node;
mod props;
mod scene;
mod schema;
mod strings;
/// Synthetic FBX stream writers for tests and tooling.
pub mod testdata;
mod transform;

/// Animation descriptor and evaluation entry points.
pub use anim::{Anim, PropOverride, evaluate_anim_value, evaluate_curve, evaluate_props, evaluate_scene};
/// Chunked scratch storage used by the parsing pipeline.
pub use arena::ChunkStack;
/// Allocation accounting against caller-supplied limits.
pub use budget::{BudgetLimits, MemoryBudget};
/// Typed element model: headers, payloads, identifiers.
pub use element::{
	AnimCurveData, AnimLayerData, AnimProp, AnimStackData, AnimValueData, BlendChannelData, BlendData, BlendKeyframe,
	BoneData, BonePose, CameraData, ClusterData, Element, ElementData, ElementId, ElementKind, Face, FbxId, IndexBuffer,
	Interpolation, Keyframe, LightData, LightType, MappingMode, MaterialData, MaterialFaces, MaterialMap, MeshData,
	NodeData, NurbsBasis, NurbsCurveData, NurbsSurfaceData, NurbsTopology, PoseData, ShapeData, SkinData, SkinVertex,
	SkinWeight, TextureData, VertexAttrib, VideoData,
};
/// Error and result types.
pub use error::{ErrorFrame, FbxError, Frames, InflateError, Result};
/// Load options and entry points.
pub use file::{LoadOptions, ProgressFn, load_file, load_memory, load_memory_with_progress, load_reader, parse_node_tree};
/// Format detection types.
pub use header::{FbxFormat, FbxHeader};
/// Embedded zlib/DEFLATE decoder.
pub use inflate::{adler32, inflate, inflate_cancellable};
/// Robin-Hood hash map with AA-tree overflow.
pub use map::{MAX_SCAN, RhMap};
/// Generic parse-tree node types.
pub use node::{ArrayData, ArrayKind, GenericNode, NodeValues, Value};
/// Property model and lookup.
pub use props::{
	PROP_FLAG_ANIMATABLE, PROP_FLAG_ANIMATED, PROP_FLAG_CONNECTED, PROP_FLAG_NO_VALUE, PROP_FLAG_OVERRIDDEN,
	PROP_FLAG_SYNTHETIC, Prop, PropList, PropType, prop_key,
};
/// Progress reporting types.
pub use cursor::{Endianness, Progress};
/// Scene aggregate, settings, and query surface.
pub use scene::{Axis, Connection, FBX_TICKS_PER_SECOND, Metadata, Scene, SceneSettings};
/// String interning pool.
pub use strings::{StringPool, fnv1a};
/// Transform math types.
pub use transform::{Quat, RotationOrder, Transform, Vec3};
