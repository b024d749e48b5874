use std::sync::Arc;

use cgmath::InnerSpace;

use crate::fbx::element::{AnimCurveData, AnimLayerData, AnimValueData, ElementData, ElementId, Interpolation};
use crate::fbx::props::{PROP_FLAG_OVERRIDDEN, Prop, PropType, prop_key};
use crate::fbx::scene::Scene;
use crate::fbx::transform::{Quat, RotationOrder, TransformInputs, build_node_transform, euler_to_quat};

/// Newton-Raphson iterations for the Bezier parameter solve.
const BEZIER_ITERATIONS: u32 = 8;

/// Animation descriptor: the layers to blend, in order, plus overrides.
#[derive(Debug, Clone, Default)]
pub struct Anim {
	/// Layers blended first to last.
	pub layers: Vec<ElementId>,
	/// Explicit value overrides, sorted by `(element, internal_key)`.
	pub overrides: Vec<PropOverride>,
}

/// Caller-supplied property override applied before animation.
#[derive(Debug, Clone)]
pub struct PropOverride {
	/// Target element.
	pub element: ElementId,
	/// Sort key of `prop_name`.
	pub internal_key: u32,
	/// Target property name.
	pub prop_name: Arc<str>,
	/// Override value.
	pub value: [f64; 3],
}

impl Anim {
	/// Animation over one stack's layers.
	pub fn from_stack(scene: &Scene, stack: ElementId) -> Self {
		let layers = match &scene.element(stack).data {
			ElementData::AnimStack(data) => data.layers.clone(),
			_ => Vec::new(),
		};
		Self {
			layers,
			overrides: Vec::new(),
		}
	}

	/// Animation over the scene's first stack, or empty.
	pub fn default_for(scene: &Scene) -> Self {
		scene
			.anim_stacks
			.first()
			.map(|stack| Self::from_stack(scene, *stack))
			.unwrap_or_default()
	}

	/// Sort overrides into lookup order; call after filling `overrides`.
	pub fn finalize_overrides(&mut self) {
		self.overrides.sort_by(|left, right| {
			left.element
				.cmp(&right.element)
				.then_with(|| left.internal_key.cmp(&right.internal_key))
				.then_with(|| left.prop_name.as_ref().cmp(right.prop_name.as_ref()))
		});
	}

	fn find_override(&self, element: ElementId, key: u32, name: &str) -> Option<&PropOverride> {
		let index = self
			.overrides
			.binary_search_by(|entry| {
				entry
					.element
					.cmp(&element)
					.then_with(|| entry.internal_key.cmp(&key))
					.then_with(|| entry.prop_name.as_ref().cmp(name))
			})
			.ok()?;
		Some(&self.overrides[index])
	}
}

/// Evaluate one curve at `time`.
///
/// Outside the key range the boundary key value holds; between keys the
/// key's interpolation mode applies. Cubic segments solve the Bezier
/// parameter for the requested time with Newton-Raphson before evaluating
/// the value polynomial.
pub fn evaluate_curve(curve: &AnimCurveData, time: f64, default: f64) -> f64 {
	let keys = &curve.keyframes;
	let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
		return default;
	};
	if time <= first.time {
		return first.value;
	}
	if time >= last.time {
		return last.value;
	}

	// Index of the key at or after `time`.
	let next = keys.partition_point(|key| key.time <= time);
	let k0 = keys[next - 1];
	let k1 = keys[next];
	let dt = k1.time - k0.time;
	if dt <= 0.0 {
		return k1.value;
	}
	let fraction = (time - k0.time) / dt;

	match k0.interpolation {
		Interpolation::ConstantPrev => k0.value,
		Interpolation::ConstantNext => k1.value,
		Interpolation::Linear => k0.value + (k1.value - k0.value) * fraction,
		Interpolation::Cubic => {
			let parameter = solve_bezier_parameter(fraction, k0.right_dx, 1.0 - k0.next_left_dx);
			let y0 = k0.value;
			let y1 = k0.value + k0.right_dy;
			let y2 = k1.value - k0.next_left_dy;
			let y3 = k1.value;
			cubic_bezier(parameter, y0, y1, y2, y3)
		}
	}
}

/// Solve `bezier_x(u) = target` for `u` where the x control points are
/// `(0, x1, x2, 1)`.
fn solve_bezier_parameter(target: f64, x1: f64, x2: f64) -> f64 {
	let mut u = target;
	for _ in 0..BEZIER_ITERATIONS {
		let x = cubic_bezier(u, 0.0, x1, x2, 1.0);
		let dx = cubic_bezier_derivative(u, 0.0, x1, x2, 1.0);
		if dx.abs() < 1e-12 {
			break;
		}
		u -= (x - target) / dx;
		u = u.clamp(0.0, 1.0);
	}
	u
}

fn cubic_bezier(u: f64, p0: f64, p1: f64, p2: f64, p3: f64) -> f64 {
	let v = 1.0 - u;
	v * v * v * p0 + 3.0 * v * v * u * p1 + 3.0 * v * u * u * p2 + u * u * u * p3
}

fn cubic_bezier_derivative(u: f64, p0: f64, p1: f64, p2: f64, p3: f64) -> f64 {
	let v = 1.0 - u;
	3.0 * v * v * (p1 - p0) + 6.0 * v * u * (p2 - p1) + 3.0 * u * u * (p3 - p2)
}

/// Evaluate an animated value's three components at `time`.
pub fn evaluate_anim_value(scene: &Scene, value: &AnimValueData, time: f64) -> [f64; 3] {
	let mut out = value.default;
	for (axis, curve) in value.curves.iter().enumerate() {
		if let Some(curve_id) = curve
			&& let Some(curve) = scene.element(*curve_id).as_anim_curve()
		{
			out[axis] = evaluate_curve(curve, time, value.default[axis]);
		}
	}
	out
}

/// Blend semantics per property, keyed off the transform prop names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlendSemantics {
	Linear,
	Rotation,
	Scale,
}

fn semantics_for(name: &str) -> BlendSemantics {
	match name {
		"Lcl Rotation" | "PreRotation" | "PostRotation" => BlendSemantics::Rotation,
		"Lcl Scaling" => BlendSemantics::Scale,
		_ => BlendSemantics::Linear,
	}
}

/// Evaluate the named properties of one element at `time`.
///
/// Explicit overrides win outright; otherwise the static value seeds the
/// result and each layer in order either assigns (first hit) or blends
/// per its mode and the property's semantics.
pub fn evaluate_props(scene: &Scene, anim: &Anim, element: ElementId, time: f64, names: &[&str]) -> Vec<Prop> {
	let mut out = Vec::with_capacity(names.len());
	let element_ref = scene.element(element);

	for name in names {
		let key = prop_key(name);
		let static_prop = element_ref.props.find_with_defaults(name);
		let mut value = static_prop.map(|prop| prop.value_real).unwrap_or([0.0; 3]);
		let mut flags = static_prop.map(|prop| prop.flags).unwrap_or(0);

		if let Some(override_value) = anim.find_override(element, key, name) {
			value = override_value.value;
			flags |= PROP_FLAG_OVERRIDDEN;
		} else {
			value = evaluate_layered(scene, anim, element, key, name, time, value);
		}

		out.push(Prop {
			name: Arc::from(*name),
			internal_key: key,
			prop_type: static_prop.map(|prop| prop.prop_type).unwrap_or(PropType::Unknown),
			flags,
			value_int: value[0] as i64,
			value_real: value,
			value_str: static_prop.map(|prop| prop.value_str.clone()).unwrap_or_else(|| Arc::from("")),
		});
	}
	out
}

fn evaluate_layered(scene: &Scene, anim: &Anim, element: ElementId, key: u32, name: &str, time: f64, static_value: [f64; 3]) -> [f64; 3] {
	let semantics = semantics_for(name);
	let mut value = static_value;
	let mut assigned = false;

	for layer_id in &anim.layers {
		let ElementData::AnimLayer(layer) = &scene.element(*layer_id).data else {
			continue;
		};
		if !layer.may_contain(element) {
			continue;
		}
		let Some(anim_value) = find_layer_binding(layer, element, key, name) else {
			continue;
		};
		let ElementData::AnimValue(anim_value) = &scene.element(anim_value).data else {
			continue;
		};

		let layer_value = evaluate_anim_value(scene, anim_value, time);
		if !assigned {
			// The first contributing layer assigns; its weight still
			// applies when the layer is marked blended.
			value = if layer.blended {
				blend_override(value, layer_value, layer.weight, semantics)
			} else {
				layer_value
			};
			assigned = true;
			continue;
		}

		value = if layer.additive {
			blend_additive(value, layer_value, layer.weight, semantics)
		} else {
			blend_override(value, layer_value, layer.weight, semantics)
		};
	}

	value
}

fn find_layer_binding(layer: &AnimLayerData, element: ElementId, key: u32, name: &str) -> Option<ElementId> {
	let index = layer
		.anim_props
		.binary_search_by(|prop| {
			prop.element
				.cmp(&element)
				.then_with(|| prop.internal_key.cmp(&key))
				.then_with(|| prop.prop_name.as_ref().cmp(name))
		})
		.ok()?;
	Some(layer.anim_props[index].anim_value)
}

fn blend_additive(base: [f64; 3], layer: [f64; 3], weight: f64, semantics: BlendSemantics) -> [f64; 3] {
	match semantics {
		BlendSemantics::Linear => [
			base[0] + layer[0] * weight,
			base[1] + layer[1] * weight,
			base[2] + layer[2] * weight,
		],
		BlendSemantics::Scale => [
			base[0] * layer[0].abs().max(1e-12).powf(weight),
			base[1] * layer[1].abs().max(1e-12).powf(weight),
			base[2] * layer[2].abs().max(1e-12).powf(weight),
		],
		BlendSemantics::Rotation => {
			let base_quat = euler_to_quat(base, RotationOrder::Xyz);
			let layer_quat = euler_to_quat(layer, RotationOrder::Xyz);
			let weighted = slerp_identity(layer_quat, weight);
			quat_to_euler_xyz(weighted * base_quat)
		}
	}
}

fn blend_override(base: [f64; 3], layer: [f64; 3], weight: f64, semantics: BlendSemantics) -> [f64; 3] {
	match semantics {
		BlendSemantics::Rotation => {
			let base_quat = euler_to_quat(base, RotationOrder::Xyz);
			let layer_quat = euler_to_quat(layer, RotationOrder::Xyz);
			quat_to_euler_xyz(slerp(base_quat, layer_quat, weight))
		}
		_ => [
			base[0] + (layer[0] - base[0]) * weight,
			base[1] + (layer[1] - base[1]) * weight,
			base[2] + (layer[2] - base[2]) * weight,
		],
	}
}

fn slerp(from: Quat, to: Quat, amount: f64) -> Quat {
	// Take the short arc.
	let to = if from.dot(to) < 0.0 { -to } else { to };
	from.slerp(to, amount).normalize()
}

fn slerp_identity(to: Quat, amount: f64) -> Quat {
	slerp(Quat::new(1.0, 0.0, 0.0, 0.0), to, amount)
}

/// Extract XYZ-order Euler degrees from a quaternion.
fn quat_to_euler_xyz(quat: Quat) -> [f64; 3] {
	let quat = quat.normalize();
	let (w, x, y, z) = (quat.s, quat.v.x, quat.v.y, quat.v.z);

	let sin_pitch = 2.0 * (w * y - z * x);
	let pitch = if sin_pitch.abs() >= 1.0 {
		std::f64::consts::FRAC_PI_2.copysign(sin_pitch)
	} else {
		sin_pitch.asin()
	};
	let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
	let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

	[roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()]
}

/// Re-evaluate the whole scene at `time`.
///
/// The source scene is never mutated: the result is a deep copy with node
/// transforms (and their transform props) rewritten from the blended
/// animation state.
pub fn evaluate_scene(scene: &Scene, anim: &Anim, time: f64) -> Scene {
	let mut evaluated = scene.clone();

	let node_ids: Vec<ElementId> = scene
		.elements
		.iter()
		.filter(|element| element.as_node().is_some())
		.map(|element| element.element_id)
		.collect();

	for node_id in node_ids {
		let names = ["Lcl Translation", "Lcl Rotation", "Lcl Scaling"];
		let props = evaluate_props(scene, anim, node_id, time, &names);
		let translation = props[0].value_real;
		let rotation = props[1].value_real;
		let scaling = props[2].value_real;

		let element = &mut evaluated.elements[node_id as usize];
		let static_props = &element.props;
		let order = element
			.as_node()
			.map(|node| node.rotation_order)
			.unwrap_or_default();

		let inputs = TransformInputs {
			translation,
			rotation_euler: rotation,
			scaling,
			pre_rotation: static_props.vec3("PreRotation", [0.0; 3]),
			post_rotation: static_props.vec3("PostRotation", [0.0; 3]),
			rotation_offset: static_props.vec3("RotationOffset", [0.0; 3]),
			rotation_pivot: static_props.vec3("RotationPivot", [0.0; 3]),
			scaling_offset: static_props.vec3("ScalingOffset", [0.0; 3]),
			scaling_pivot: static_props.vec3("ScalingPivot", [0.0; 3]),
			order,
		};
		let transform = build_node_transform(&inputs);

		for prop in props {
			if let Some(existing) = element.props.props.iter_mut().find(|existing| existing.name.as_ref() == prop.name.as_ref()) {
				existing.value_real = prop.value_real;
				existing.value_int = prop.value_int;
				existing.flags |= prop.flags;
			}
		}
		if let ElementData::Node(node) = &mut element.data {
			node.local_transform = transform;
		}
	}

	evaluated
}

#[cfg(test)]
mod tests {
	use crate::fbx::element::{AnimCurveData, Interpolation, Keyframe};

	use super::{cubic_bezier, evaluate_curve, solve_bezier_parameter};

	fn cubic_key(time: f64, value: f64, right_dy: f64, next_left_dy: f64) -> Keyframe {
		Keyframe {
			time,
			value,
			interpolation: Interpolation::Cubic,
			right_dx: 1.0 / 3.0,
			right_dy,
			next_left_dx: 1.0 / 3.0,
			next_left_dy,
		}
	}

	#[test]
	fn boundary_times_hold_edge_values() {
		let curve = AnimCurveData {
			keyframes: vec![cubic_key(0.0, 1.0, 0.0, 0.0), cubic_key(1.0, 5.0, 0.0, 0.0)],
		};
		assert_eq!(evaluate_curve(&curve, -1.0, 0.0), 1.0);
		assert_eq!(evaluate_curve(&curve, 2.0, 0.0), 5.0);
		assert_eq!(evaluate_curve(&AnimCurveData::default(), 0.5, 7.5), 7.5);
	}

	#[test]
	fn linear_keys_interpolate_exactly() {
		let mut k0 = cubic_key(0.0, 0.0, 0.0, 0.0);
		k0.interpolation = Interpolation::Linear;
		let curve = AnimCurveData {
			keyframes: vec![k0, cubic_key(2.0, 10.0, 0.0, 0.0)],
		};
		assert!((evaluate_curve(&curve, 0.5, 0.0) - 2.5).abs() < 1e-12);
	}

	#[test]
	fn constant_keys_hold_prev_or_next() {
		let mut prev = cubic_key(0.0, 1.0, 0.0, 0.0);
		prev.interpolation = Interpolation::ConstantPrev;
		let mut next = cubic_key(0.0, 1.0, 0.0, 0.0);
		next.interpolation = Interpolation::ConstantNext;

		let hold_prev = AnimCurveData {
			keyframes: vec![prev, cubic_key(1.0, 9.0, 0.0, 0.0)],
		};
		let hold_next = AnimCurveData {
			keyframes: vec![next, cubic_key(1.0, 9.0, 0.0, 0.0)],
		};
		assert_eq!(evaluate_curve(&hold_prev, 0.5, 0.0), 1.0);
		assert_eq!(evaluate_curve(&hold_next, 0.5, 0.0), 9.0);
	}

	#[test]
	fn cubic_matches_hand_computed_bezier_with_symmetric_thirds() {
		// Keys at t=0 (v=0) and t=1 (v=1) with slopes rising into the
		// segment: y controls (0, 0.2, 0.8, 1).
		let curve = AnimCurveData {
			keyframes: vec![cubic_key(0.0, 0.0, 0.2, 0.2), cubic_key(1.0, 1.0, 0.0, 0.0)],
		};

		let time = 0.35;
		// With symmetric 1/3 x-weights the x curve is the identity, so the
		// solved parameter equals the time fraction.
		let u = solve_bezier_parameter(time, 1.0 / 3.0, 1.0 - 1.0 / 3.0);
		assert!((u - time).abs() < 1e-6);

		let reference = cubic_bezier(u, 0.0, 0.2, 0.8, 1.0);
		let evaluated = evaluate_curve(&curve, time, 0.0);
		assert!((evaluated - reference).abs() < 1e-4, "evaluated {evaluated}, reference {reference}");
	}

	#[test]
	fn newton_solve_converges_on_skewed_tangents() {
		// Heavily skewed x-weights bend the time curve; the solved
		// parameter must still reproduce the requested time.
		let x1 = 0.05;
		let x2 = 0.95;
		for target in [0.1, 0.25, 0.5, 0.75, 0.9] {
			let u = solve_bezier_parameter(target, x1, x2);
			let x = cubic_bezier(u, 0.0, x1, x2, 1.0);
			assert!((x - target).abs() < 1e-6, "target {target}, got {x}");
		}
	}
}
