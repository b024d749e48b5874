use std::sync::Arc;

/// One scalar value slot inside a parsed node record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Boolean from a `C` record or ASCII `T`/`F`/`Y`/`N` word.
	Bool(bool),
	/// Any integer width, widened.
	I64(i64),
	/// Any float width, widened.
	F64(f64),
	/// Interned string value.
	String(Arc<str>),
	/// Raw binary blob from an `R` record.
	Bytes(Vec<u8>),
}

impl Value {
	/// Integer view, converting from bool; floats are not coerced.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::I64(value) => Some(*value),
			Self::Bool(value) => Some(i64::from(*value)),
			_ => None,
		}
	}

	/// Float view, converting from integers.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::F64(value) => Some(*value),
			Self::I64(value) => Some(*value as f64),
			_ => None,
		}
	}

	/// String view.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(value) => Some(value.as_ref()),
			_ => None,
		}
	}

	/// Interned string handle view.
	pub fn as_interned(&self) -> Option<&Arc<str>> {
		match self {
			Self::String(value) => Some(value),
			_ => None,
		}
	}
}

/// Typed homogeneous array payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
	/// `b` records.
	Bool(Vec<bool>),
	/// `i` records, and ASCII integer lists.
	I32(Vec<i32>),
	/// `l` records.
	I64(Vec<i64>),
	/// `f` records.
	F32(Vec<f32>),
	/// `d` records, and ASCII real lists.
	F64(Vec<f64>),
}

/// Canonical element type for a typed array destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
	/// One byte per element.
	Bool,
	/// 32-bit signed integers.
	I32,
	/// 64-bit signed integers.
	I64,
	/// 32-bit floats.
	F32,
	/// 64-bit floats.
	F64,
}

impl ArrayData {
	/// Element count.
	pub fn len(&self) -> usize {
		match self {
			Self::Bool(values) => values.len(),
			Self::I32(values) => values.len(),
			Self::I64(values) => values.len(),
			Self::F32(values) => values.len(),
			Self::F64(values) => values.len(),
		}
	}

	/// Return whether the array holds no elements.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Stored element kind.
	pub fn kind(&self) -> ArrayKind {
		match self {
			Self::Bool(_) => ArrayKind::Bool,
			Self::I32(_) => ArrayKind::I32,
			Self::I64(_) => ArrayKind::I64,
			Self::F32(_) => ArrayKind::F32,
			Self::F64(_) => ArrayKind::F64,
		}
	}

	/// Copy out as `f64`, coercing integer and `f32` storage.
	pub fn to_f64_vec(&self) -> Vec<f64> {
		match self {
			Self::Bool(values) => values.iter().map(|value| f64::from(u8::from(*value))).collect(),
			Self::I32(values) => values.iter().map(|value| f64::from(*value)).collect(),
			Self::I64(values) => values.iter().map(|value| *value as f64).collect(),
			Self::F32(values) => values.iter().map(|value| f64::from(*value)).collect(),
			Self::F64(values) => values.clone(),
		}
	}

	/// Copy out as `i64`, truncating float storage toward zero.
	pub fn to_i64_vec(&self) -> Vec<i64> {
		match self {
			Self::Bool(values) => values.iter().map(|value| i64::from(*value)).collect(),
			Self::I32(values) => values.iter().map(|value| i64::from(*value)).collect(),
			Self::I64(values) => values.clone(),
			Self::F32(values) => values.iter().map(|value| *value as i64).collect(),
			Self::F64(values) => values.iter().map(|value| *value as i64).collect(),
		}
	}

	/// Copy out as `i32`, truncating wider storage.
	pub fn to_i32_vec(&self) -> Vec<i32> {
		match self {
			Self::Bool(values) => values.iter().map(|value| i32::from(*value)).collect(),
			Self::I32(values) => values.clone(),
			Self::I64(values) => values.iter().map(|value| *value as i32).collect(),
			Self::F32(values) => values.iter().map(|value| *value as i32).collect(),
			Self::F64(values) => values.iter().map(|value| *value as i32).collect(),
		}
	}

	/// Borrow `i32` storage without copying when the kinds match.
	pub fn as_i32_slice(&self) -> Option<&[i32]> {
		match self {
			Self::I32(values) => Some(values),
			_ => None,
		}
	}

	/// Borrow `f64` storage without copying when the kinds match.
	pub fn as_f64_slice(&self) -> Option<&[f64]> {
		match self {
			Self::F64(values) => Some(values),
			_ => None,
		}
	}
}

/// Payload of one generic node: a short scalar list or one typed array.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValues {
	/// Inline scalar slots, in record order.
	Scalars(Vec<Value>),
	/// One homogeneous typed array.
	Array(ArrayData),
}

impl NodeValues {
	/// Empty scalar list.
	pub fn empty() -> Self {
		Self::Scalars(Vec::new())
	}
}

/// One named record in the parsed FBX node tree.
///
/// Distinct from the scene-graph node element: this is the raw file
/// structure the scene builder consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericNode {
	/// Interned record name.
	pub name: Arc<str>,
	/// Scalar values or one typed array.
	pub values: NodeValues,
	/// Child records in file order.
	pub children: Vec<GenericNode>,
}

impl GenericNode {
	/// Node with a name and no values or children.
	pub fn named(name: Arc<str>) -> Self {
		Self {
			name,
			values: NodeValues::empty(),
			children: Vec::new(),
		}
	}

	/// First child with the given name.
	pub fn child(&self, name: &str) -> Option<&GenericNode> {
		self.children.iter().find(|child| child.name.as_ref() == name)
	}

	/// All children with the given name, in order.
	pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a GenericNode> {
		self.children.iter().filter(move |child| child.name.as_ref() == name)
	}

	/// Scalar values view; a typed array yields an empty slice.
	pub fn scalars(&self) -> &[Value] {
		match &self.values {
			NodeValues::Scalars(values) => values,
			NodeValues::Array(_) => &[],
		}
	}

	/// Typed array view.
	pub fn array(&self) -> Option<&ArrayData> {
		match &self.values {
			NodeValues::Array(array) => Some(array),
			NodeValues::Scalars(_) => None,
		}
	}

	/// Scalar value at `index`.
	pub fn value(&self, index: usize) -> Option<&Value> {
		self.scalars().get(index)
	}

	/// Integer scalar at `index`.
	pub fn value_i64(&self, index: usize) -> Option<i64> {
		self.value(index)?.as_i64()
	}

	/// Float scalar at `index`.
	pub fn value_f64(&self, index: usize) -> Option<f64> {
		self.value(index)?.as_f64()
	}

	/// String scalar at `index`.
	pub fn value_str(&self, index: usize) -> Option<&str> {
		self.value(index)?.as_str()
	}

	/// First scalar of the first child with `name`, as an integer.
	pub fn find_i64(&self, name: &str) -> Option<i64> {
		self.child(name)?.value_i64(0)
	}

	/// First scalar of the first child with `name`, as a float.
	pub fn find_f64(&self, name: &str) -> Option<f64> {
		self.child(name)?.value_f64(0)
	}

	/// First scalar of the first child with `name`, as a string.
	pub fn find_str(&self, name: &str) -> Option<&str> {
		self.child(name)?.value_str(0)
	}

	/// Typed array of the first child with `name`.
	pub fn find_array(&self, name: &str) -> Option<&ArrayData> {
		self.child(name)?.array()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::{ArrayData, GenericNode, NodeValues, Value};

	#[test]
	fn child_lookup_and_scalar_accessors() {
		let mut root = GenericNode::named(Arc::from("Geometry"));
		let mut count = GenericNode::named(Arc::from("Count"));
		count.values = NodeValues::Scalars(vec![Value::I64(12)]);
		root.children.push(count);

		assert_eq!(root.find_i64("Count"), Some(12));
		assert_eq!(root.find_i64("Missing"), None);
		assert_eq!(root.value(0), None);
	}

	#[test]
	fn array_coercions_preserve_values() {
		let array = ArrayData::I32(vec![1, -2, 3]);
		assert_eq!(array.to_f64_vec(), vec![1.0, -2.0, 3.0]);
		assert_eq!(array.to_i64_vec(), vec![1, -2, 3]);
		assert_eq!(array.as_i32_slice(), Some([1, -2, 3].as_slice()));
		assert!(array.as_f64_slice().is_none());
	}
}
