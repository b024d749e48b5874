use crate::fbx::node::ArrayKind;

/// Parse-context state threaded through the node-tree readers.
///
/// The context of the parent record decides whether a child's value list is
/// one typed numeric array (and its canonical element type) or a short
/// scalar list, without inspecting the values themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseContext {
	/// Top-level document scope.
	Root,
	/// `FBXHeaderExtension` scope.
	Header,
	/// `Definitions` scope and its templates.
	Definitions,
	/// `Objects` scope.
	Objects,
	/// `Geometry`/`Model`/`Shape` mesh-data scope.
	Geometry,
	/// `LayerElementNormal` scope.
	LayerElementNormal,
	/// `LayerElementBinormal` scope.
	LayerElementBinormal,
	/// `LayerElementTangent` scope.
	LayerElementTangent,
	/// `LayerElementUV` scope.
	LayerElementUv,
	/// `LayerElementColor` scope.
	LayerElementColor,
	/// `LayerElementMaterial` scope.
	LayerElementMaterial,
	/// Any other `LayerElement*` scope.
	LayerElementOther,
	/// `Deformer` (skin/cluster/blend) scope.
	Deformer,
	/// `AnimationCurve` scope.
	AnimCurve,
	/// `Pose` node scope.
	Pose,
	/// `Takes` legacy animation scope.
	Takes,
	/// Nested channel scope under `Takes`.
	TakesChannel,
	/// Any context with no array-bearing children.
	Generic,
}

/// Destination description for a typed child array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySpec {
	/// Canonical element type the values coerce into.
	pub kind: ArrayKind,
	/// Pad short binary payloads with zeros instead of failing.
	pub pad_zero: bool,
}

const fn typed(kind: ArrayKind) -> ArraySpec {
	ArraySpec { kind, pad_zero: false }
}

const fn typed_padded(kind: ArrayKind) -> ArraySpec {
	ArraySpec { kind, pad_zero: true }
}

/// Context a child record parses under, given its parent context and name.
pub fn child_context(parent: ParseContext, name: &str) -> ParseContext {
	match parent {
		ParseContext::Root => match name {
			"FBXHeaderExtension" => ParseContext::Header,
			"Definitions" => ParseContext::Definitions,
			"Objects" => ParseContext::Objects,
			"Takes" => ParseContext::Takes,
			_ => ParseContext::Generic,
		},
		ParseContext::Objects => match name {
			"Geometry" | "Model" | "Shape" => ParseContext::Geometry,
			"Deformer" => ParseContext::Deformer,
			"AnimationCurve" => ParseContext::AnimCurve,
			"Pose" => ParseContext::Pose,
			_ => ParseContext::Generic,
		},
		ParseContext::Geometry => match name {
			"LayerElementNormal" => ParseContext::LayerElementNormal,
			"LayerElementBinormal" => ParseContext::LayerElementBinormal,
			"LayerElementTangent" => ParseContext::LayerElementTangent,
			"LayerElementUV" => ParseContext::LayerElementUv,
			"LayerElementColor" => ParseContext::LayerElementColor,
			"LayerElementMaterial" => ParseContext::LayerElementMaterial,
			_ if name.starts_with("LayerElement") => ParseContext::LayerElementOther,
			"Shape" => ParseContext::Geometry,
			_ => ParseContext::Generic,
		},
		ParseContext::Takes => match name {
			"Take" => ParseContext::Takes,
			"Model" => ParseContext::Takes,
			"Channel" => ParseContext::TakesChannel,
			_ => ParseContext::Generic,
		},
		ParseContext::TakesChannel => match name {
			"Channel" => ParseContext::TakesChannel,
			_ => ParseContext::Generic,
		},
		ParseContext::Pose => match name {
			"PoseNode" => ParseContext::Pose,
			_ => ParseContext::Generic,
		},
		_ => ParseContext::Generic,
	}
}

/// Typed-array destination for a child record, if it holds one.
///
/// Returning `None` parses the child's values as a scalar list.
pub fn array_spec(parent: ParseContext, name: &str) -> Option<ArraySpec> {
	match parent {
		ParseContext::Geometry => match name {
			"Vertices" | "Points" => Some(typed(ArrayKind::F64)),
			"PolygonVertexIndex" | "PolygonIndex" => Some(typed(ArrayKind::I32)),
			"Edges" => Some(typed(ArrayKind::I32)),
			"KnotVector" | "KnotVectorU" | "KnotVectorV" => Some(typed(ArrayKind::F64)),
			"Indexes" => Some(typed(ArrayKind::I32)),
			_ => None,
		},
		ParseContext::LayerElementNormal => match name {
			"Normals" => Some(typed(ArrayKind::F64)),
			"NormalsIndex" => Some(typed(ArrayKind::I32)),
			"NormalsW" => Some(typed(ArrayKind::F64)),
			_ => None,
		},
		ParseContext::LayerElementBinormal => match name {
			"Binormals" => Some(typed(ArrayKind::F64)),
			"BinormalsIndex" => Some(typed(ArrayKind::I32)),
			_ => None,
		},
		ParseContext::LayerElementTangent => match name {
			"Tangents" => Some(typed(ArrayKind::F64)),
			"TangentsIndex" => Some(typed(ArrayKind::I32)),
			_ => None,
		},
		ParseContext::LayerElementUv => match name {
			"UV" => Some(typed(ArrayKind::F64)),
			"UVIndex" => Some(typed(ArrayKind::I32)),
			_ => None,
		},
		ParseContext::LayerElementColor => match name {
			"Colors" => Some(typed(ArrayKind::F64)),
			"ColorIndex" => Some(typed(ArrayKind::I32)),
			_ => None,
		},
		ParseContext::LayerElementMaterial => match name {
			"Materials" => Some(typed(ArrayKind::I32)),
			_ => None,
		},
		ParseContext::Deformer => match name {
			"Indexes" => Some(typed(ArrayKind::I32)),
			"Weights" => Some(typed(ArrayKind::F64)),
			"FullWeights" => Some(typed(ArrayKind::F64)),
			"Transform" | "TransformLink" | "TransformAssociateModel" => Some(typed_padded(ArrayKind::F64)),
			_ => None,
		},
		ParseContext::AnimCurve => match name {
			"KeyTime" => Some(typed(ArrayKind::I64)),
			"KeyValueFloat" => Some(typed(ArrayKind::F32)),
			"KeyAttrFlags" => Some(typed(ArrayKind::I32)),
			"KeyAttrDataFloat" => Some(typed(ArrayKind::F32)),
			"KeyAttrRefCount" => Some(typed(ArrayKind::I32)),
			_ => None,
		},
		ParseContext::Pose => match name {
			"Matrix" => Some(typed_padded(ArrayKind::F64)),
			_ => None,
		},
		ParseContext::TakesChannel => match name {
			"Key" => Some(typed(ArrayKind::F64)),
			_ => None,
		},
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::{ParseContext, array_spec, child_context};
	use crate::fbx::node::ArrayKind;

	#[test]
	fn geometry_arrays_are_typed_by_context() {
		let objects = child_context(ParseContext::Root, "Objects");
		let geometry = child_context(objects, "Geometry");
		assert_eq!(geometry, ParseContext::Geometry);

		let vertices = array_spec(geometry, "Vertices").expect("typed");
		assert_eq!(vertices.kind, ArrayKind::F64);
		assert!(!vertices.pad_zero);

		let indices = array_spec(geometry, "PolygonVertexIndex").expect("typed");
		assert_eq!(indices.kind, ArrayKind::I32);
	}

	#[test]
	fn same_name_is_scalar_outside_its_context() {
		// "Vertices" under Definitions is a plain value list.
		assert!(array_spec(ParseContext::Definitions, "Vertices").is_none());
		// "Materials" only means an index array inside LayerElementMaterial.
		assert!(array_spec(ParseContext::Geometry, "Materials").is_none());
	}

	#[test]
	fn curve_key_arrays_keep_native_widths() {
		let curve = child_context(ParseContext::Objects, "AnimationCurve");
		assert_eq!(array_spec(curve, "KeyTime").unwrap().kind, ArrayKind::I64);
		assert_eq!(array_spec(curve, "KeyValueFloat").unwrap().kind, ArrayKind::F32);
	}

	#[test]
	fn cluster_transforms_pad_with_zeros() {
		let deformer = child_context(ParseContext::Objects, "Deformer");
		assert!(array_spec(deformer, "TransformLink").unwrap().pad_zero);
	}
}
