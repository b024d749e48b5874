use std::sync::Arc;

use crate::fbx::binary::ParseEnv;
use crate::fbx::node::{GenericNode, Value};
use crate::fbx::Result;

/// Property is animatable per its flag string.
pub const PROP_FLAG_ANIMATABLE: u32 = 1 << 0;
/// Property has an animation curve bound after linking.
pub const PROP_FLAG_ANIMATED: u32 = 1 << 1;
/// Property participates in a property-to-property connection.
pub const PROP_FLAG_CONNECTED: u32 = 1 << 2;
/// Property value came from an explicit evaluation override.
pub const PROP_FLAG_OVERRIDDEN: u32 = 1 << 3;
/// Property was synthesized rather than read from the file.
pub const PROP_FLAG_SYNTHETIC: u32 = 1 << 4;
/// Property carries no parsed value slots.
pub const PROP_FLAG_NO_VALUE: u32 = 1 << 5;

/// Declared value type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropType {
	/// Unrecognized type name.
	#[default]
	Unknown,
	/// Boolean stored in `value_int`.
	Boolean,
	/// Integer or enum stored in `value_int`.
	Integer,
	/// Scalar number stored in `value_real[0]`.
	Number,
	/// Three-component vector.
	Vector,
	/// RGB color.
	Color,
	/// String value.
	String,
	/// Timestamp string.
	DateTime,
	/// `Lcl Translation` transform component.
	Translation,
	/// `Lcl Rotation` transform component.
	Rotation,
	/// `Lcl Scaling` transform component.
	Scaling,
	/// Nested compound value.
	Compound,
}

/// One element property with widened value slots.
#[derive(Debug, Clone)]
pub struct Prop {
	/// Interned property name.
	pub name: Arc<str>,
	/// Big-endian packed 4-byte name prefix, the primary sort key.
	pub internal_key: u32,
	/// Declared value type.
	pub prop_type: PropType,
	/// `PROP_FLAG_*` bits.
	pub flags: u32,
	/// Integer slot (also mirrors truncated `value_real[0]`).
	pub value_int: i64,
	/// Up to three real components.
	pub value_real: [f64; 3],
	/// String slot.
	pub value_str: Arc<str>,
}

impl Prop {
	/// Return whether a flag bit is set.
	pub fn has_flag(&self, flag: u32) -> bool {
		self.flags & flag != 0
	}
}

/// Big-endian packed first-four-bytes sort key.
///
/// Sorting by `(internal_key, name)` equals full lexicographic name order,
/// so the key acts as a cheap comparison prefix for binary search.
pub fn prop_key(name: &str) -> u32 {
	let bytes = name.as_bytes();
	let mut key = 0_u32;
	for slot in 0..4 {
		key <<= 8;
		key |= u32::from(bytes.get(slot).copied().unwrap_or(0));
	}
	key
}

/// Name-sorted property list with a class-template defaults chain.
#[derive(Debug, Clone, Default)]
pub struct PropList {
	/// Properties sorted by `(internal_key, name)`, names unique.
	pub props: Vec<Prop>,
	/// Class template this list falls back to.
	pub defaults: Option<Arc<PropList>>,
}

impl PropList {
	/// Parse the `Properties70`/`Properties60` child of `node`, if any.
	pub(crate) fn parse(node: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<Self> {
		let mut props = Vec::new();

		if let Some(list) = node.child("Properties70") {
			for record in list.children_named("P") {
				if let Some(prop) = parse_p70(record, env)? {
					props.push(prop);
				}
			}
		} else if let Some(list) = node.child("Properties60") {
			for record in list.children_named("Property") {
				if let Some(prop) = parse_p60(record, env)? {
					props.push(prop);
				}
			}
		}

		Ok(Self::from_unsorted(props))
	}

	/// Sort and dedup (keeping the last occurrence of each name).
	pub fn from_unsorted(mut props: Vec<Prop>) -> Self {
		// Stable sort keeps file order within equal names, so the last
		// element of each run is the last occurrence in the file.
		props.sort_by(|left, right| {
			left.internal_key
				.cmp(&right.internal_key)
				.then_with(|| left.name.as_ref().cmp(right.name.as_ref()))
		});

		let mut deduped: Vec<Prop> = Vec::with_capacity(props.len());
		for prop in props {
			match deduped.last_mut() {
				Some(last) if last.name.as_ref() == prop.name.as_ref() => *last = prop,
				_ => deduped.push(prop),
			}
		}

		Self {
			props: deduped,
			defaults: None,
		}
	}

	/// Binary search this list only, ignoring defaults.
	pub fn find(&self, name: &str) -> Option<&Prop> {
		let key = prop_key(name);
		let index = self
			.props
			.binary_search_by(|prop| {
				prop.internal_key
					.cmp(&key)
					.then_with(|| prop.name.as_ref().cmp(name))
			})
			.ok()?;
		Some(&self.props[index])
	}

	/// Search this list, then the defaults chain.
	pub fn find_with_defaults(&self, name: &str) -> Option<&Prop> {
		if let Some(prop) = self.find(name) {
			return Some(prop);
		}
		self.defaults.as_ref()?.find_with_defaults(name)
	}

	/// Vector value with a fallback.
	pub fn vec3(&self, name: &str, fallback: [f64; 3]) -> [f64; 3] {
		self.find_with_defaults(name).map(|prop| prop.value_real).unwrap_or(fallback)
	}

	/// Scalar value with a fallback.
	pub fn real(&self, name: &str, fallback: f64) -> f64 {
		self.find_with_defaults(name).map(|prop| prop.value_real[0]).unwrap_or(fallback)
	}

	/// Integer value with a fallback.
	pub fn int(&self, name: &str, fallback: i64) -> i64 {
		self.find_with_defaults(name).map(|prop| prop.value_int).unwrap_or(fallback)
	}

	/// String value, empty when missing.
	pub fn string(&self, name: &str) -> Option<&Arc<str>> {
		self.find_with_defaults(name).map(|prop| &prop.value_str)
	}
}

fn parse_p70(record: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<Option<Prop>> {
	let values = record.scalars();
	let Some(name) = values.first().and_then(Value::as_interned) else {
		return Ok(None);
	};

	let type_name = values.get(1).and_then(Value::as_str).unwrap_or("");
	let flag_text = values.get(3).and_then(Value::as_str).unwrap_or("");
	let mut flags = 0_u32;
	if flag_text.contains('A') {
		flags |= PROP_FLAG_ANIMATABLE;
	}

	Ok(Some(build_prop(name.clone(), type_name, flags, &values[4.min(values.len())..], env)?))
}

fn parse_p60(record: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<Option<Prop>> {
	let values = record.scalars();
	let Some(name) = values.first().and_then(Value::as_interned) else {
		return Ok(None);
	};

	let type_name = values.get(1).and_then(Value::as_str).unwrap_or("");
	let flag_text = values.get(2).and_then(Value::as_str).unwrap_or("");
	let mut flags = 0_u32;
	if flag_text.contains('A') {
		flags |= PROP_FLAG_ANIMATABLE;
	}

	Ok(Some(build_prop(name.clone(), type_name, flags, &values[3.min(values.len())..], env)?))
}

fn build_prop(name: Arc<str>, type_name: &str, mut flags: u32, values: &[Value], env: &mut ParseEnv<'_, '_>) -> Result<Prop> {
	let prop_type = prop_type_from_name(type_name);

	let mut value_int = 0_i64;
	let mut value_real = [0.0_f64; 3];
	let mut value_str = env.pool.empty();
	let mut real_slots = 0_usize;

	for value in values {
		match value {
			Value::Bool(flag) => {
				value_int = i64::from(*flag);
				if real_slots < 3 {
					value_real[real_slots] = f64::from(u8::from(*flag));
					real_slots += 1;
				}
			}
			Value::I64(number) => {
				if real_slots == 0 {
					value_int = *number;
				}
				if real_slots < 3 {
					value_real[real_slots] = *number as f64;
					real_slots += 1;
				}
			}
			Value::F64(number) => {
				if real_slots == 0 {
					value_int = *number as i64;
				}
				if real_slots < 3 {
					value_real[real_slots] = *number;
					real_slots += 1;
				}
			}
			Value::String(text) => value_str = text.clone(),
			Value::Bytes(_) => {}
		}
	}

	if values.is_empty() {
		flags |= PROP_FLAG_NO_VALUE;
	}

	Ok(Prop {
		internal_key: prop_key(name.as_ref()),
		name,
		prop_type,
		flags,
		value_int,
		value_real,
		value_str,
	})
}

fn prop_type_from_name(type_name: &str) -> PropType {
	match type_name {
		"bool" | "Bool" => PropType::Boolean,
		"int" | "Integer" | "enum" | "Enum" | "ULongLong" => PropType::Integer,
		"double" | "Number" | "float" | "Float" | "FieldOfView" | "Intensity" => PropType::Number,
		"Vector" | "Vector3D" | "Vector3" => PropType::Vector,
		"Color" | "ColorRGB" | "ColorAndAlpha" => PropType::Color,
		"KString" | "charptr" | "Url" | "XRefUrl" => PropType::String,
		"DateTime" => PropType::DateTime,
		"Lcl Translation" => PropType::Translation,
		"Lcl Rotation" => PropType::Rotation,
		"Lcl Scaling" => PropType::Scaling,
		"Compound" | "object" => PropType::Compound,
		_ => PropType::Unknown,
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::{PROP_FLAG_SYNTHETIC, Prop, PropList, PropType, prop_key};

	fn prop(name: &str, value: f64) -> Prop {
		Prop {
			name: Arc::from(name),
			internal_key: prop_key(name),
			prop_type: PropType::Number,
			flags: 0,
			value_int: value as i64,
			value_real: [value, 0.0, 0.0],
			value_str: Arc::from(""),
		}
	}

	#[test]
	fn list_sorts_by_key_then_name_and_binary_search_finds() {
		let list = PropList::from_unsorted(vec![prop("ShininessExponent", 2.0), prop("AmbientColor", 1.0), prop("DiffuseColor", 3.0)]);
		let names: Vec<&str> = list.props.iter().map(|item| item.name.as_ref()).collect();
		assert_eq!(names, vec!["AmbientColor", "DiffuseColor", "ShininessExponent"]);

		assert_eq!(list.find("DiffuseColor").map(|item| item.value_real[0]), Some(3.0));
		assert!(list.find("SpecularColor").is_none());
	}

	#[test]
	fn duplicate_names_keep_the_last_occurrence() {
		let list = PropList::from_unsorted(vec![prop("DiffuseColor", 1.0), prop("DiffuseColor", 9.0)]);
		assert_eq!(list.props.len(), 1);
		assert_eq!(list.find("DiffuseColor").map(|item| item.value_real[0]), Some(9.0));
	}

	#[test]
	fn defaults_chain_is_searched_after_own_props() {
		let mut template = PropList::from_unsorted(vec![prop("EmissiveFactor", 1.0), prop("DiffuseColor", 0.8)]);
		template.defaults = None;

		let mut own = PropList::from_unsorted(vec![prop("DiffuseColor", 0.5)]);
		own.defaults = Some(Arc::new(template));

		assert_eq!(own.find_with_defaults("DiffuseColor").map(|item| item.value_real[0]), Some(0.5));
		assert_eq!(own.find_with_defaults("EmissiveFactor").map(|item| item.value_real[0]), Some(1.0));
		assert!(own.find_with_defaults("Missing").is_none());
	}

	#[test]
	fn prop_key_orders_like_name_prefix() {
		assert!(prop_key("Ambient") < prop_key("Diffuse"));
		assert!(prop_key("D") < prop_key("Diffuse"));
		let mut synthetic = prop("Visibility", 1.0);
		synthetic.flags |= PROP_FLAG_SYNTHETIC;
		assert!(synthetic.has_flag(PROP_FLAG_SYNTHETIC));
	}
}
