use cgmath::{InnerSpace, Quaternion, Rad, Rotation3, Vector3};

/// Shorthand for the crate's vector type.
pub type Vec3 = Vector3<f64>;
/// Shorthand for the crate's quaternion type.
pub type Quat = Quaternion<f64>;

/// Euler application order for `Lcl Rotation` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationOrder {
	/// X then Y then Z, the FBX default.
	#[default]
	Xyz,
	/// X then Z then Y.
	Xzy,
	/// Y then Z then X.
	Yzx,
	/// Y then X then Z.
	Yxz,
	/// Z then X then Y.
	Zxy,
	/// Z then Y then X.
	Zyx,
	/// Spheric interpolation order, treated as XYZ.
	Spheric,
}

impl RotationOrder {
	/// Lenient conversion from the `RotationOrder` enum property.
	///
	/// Out-of-range values fall back to the XYZ default rather than
	/// failing, matching how unknown enum ints degrade elsewhere.
	pub fn from_int(value: i64) -> Self {
		match value {
			0 => Self::Xyz,
			1 => Self::Xzy,
			2 => Self::Yzx,
			3 => Self::Yxz,
			4 => Self::Zxy,
			5 => Self::Zyx,
			6 => Self::Spheric,
			_ => Self::Xyz,
		}
	}
}

/// Decomposed local transform of a scene node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
	/// Translation component.
	pub translation: Vec3,
	/// Rotation component.
	pub rotation: Quat,
	/// Non-uniform scale component.
	pub scale: Vec3,
}

impl Default for Transform {
	fn default() -> Self {
		Self {
			translation: Vec3::new(0.0, 0.0, 0.0),
			rotation: Quat::new(1.0, 0.0, 0.0, 0.0),
			scale: Vec3::new(1.0, 1.0, 1.0),
		}
	}
}

impl Transform {
	/// Column-major 4x4 matrix for this transform, scale first.
	pub fn to_matrix(&self) -> [f64; 16] {
		let rotation = cgmath::Matrix3::from(self.rotation);
		let mut out = [0.0_f64; 16];
		for column in 0..3 {
			let axis = match column {
				0 => rotation.x * self.scale.x,
				1 => rotation.y * self.scale.y,
				_ => rotation.z * self.scale.z,
			};
			out[column * 4] = axis.x;
			out[column * 4 + 1] = axis.y;
			out[column * 4 + 2] = axis.z;
		}
		out[12] = self.translation.x;
		out[13] = self.translation.y;
		out[14] = self.translation.z;
		out[15] = 1.0;
		out
	}

	/// Compose `self` after `parent` (parent-to-world times local).
	pub fn compose(&self, parent: &Transform) -> Transform {
		let scaled = Vec3::new(
			self.translation.x * parent.scale.x,
			self.translation.y * parent.scale.y,
			self.translation.z * parent.scale.z,
		);
		Transform {
			translation: parent.translation + parent.rotation * scaled,
			rotation: (parent.rotation * self.rotation).normalize(),
			scale: Vec3::new(
				parent.scale.x * self.scale.x,
				parent.scale.y * self.scale.y,
				parent.scale.z * self.scale.z,
			),
		}
	}
}

/// Euler degrees to quaternion under the given application order.
pub fn euler_to_quat(degrees: [f64; 3], order: RotationOrder) -> Quat {
	let x = Quat::from_angle_x(Rad(degrees[0].to_radians()));
	let y = Quat::from_angle_y(Rad(degrees[1].to_radians()));
	let z = Quat::from_angle_z(Rad(degrees[2].to_radians()));

	// FBX applies rotation axes left to right onto column vectors, so the
	// first named axis is the innermost factor.
	let composed = match order {
		RotationOrder::Xyz | RotationOrder::Spheric => z * y * x,
		RotationOrder::Xzy => y * z * x,
		RotationOrder::Yzx => x * z * y,
		RotationOrder::Yxz => z * x * y,
		RotationOrder::Zxy => y * x * z,
		RotationOrder::Zyx => x * y * z,
	};
	composed.normalize()
}

/// Node-local transform from property values.
///
/// Pre- and post-rotation and the pivot/offset pairs fold into the
/// decomposed transform the way the FBX transform chain prescribes:
/// `T * Roff * Rp * Rpre * R * Rpost^-1 * Rp^-1 * Soff * Sp * S * Sp^-1`.
pub struct TransformInputs {
	/// `Lcl Translation`.
	pub translation: [f64; 3],
	/// `Lcl Rotation` Euler degrees.
	pub rotation_euler: [f64; 3],
	/// `Lcl Scaling`.
	pub scaling: [f64; 3],
	/// `PreRotation` Euler degrees.
	pub pre_rotation: [f64; 3],
	/// `PostRotation` Euler degrees.
	pub post_rotation: [f64; 3],
	/// `RotationOffset`.
	pub rotation_offset: [f64; 3],
	/// `RotationPivot`.
	pub rotation_pivot: [f64; 3],
	/// `ScalingOffset`.
	pub scaling_offset: [f64; 3],
	/// `ScalingPivot`.
	pub scaling_pivot: [f64; 3],
	/// Euler application order.
	pub order: RotationOrder,
}

/// Assemble a decomposed node transform from FBX transform properties.
pub fn build_node_transform(inputs: &TransformInputs) -> Transform {
	let pre = euler_to_quat(inputs.pre_rotation, RotationOrder::Xyz);
	let post = euler_to_quat(inputs.post_rotation, RotationOrder::Xyz);
	let rotation = euler_to_quat(inputs.rotation_euler, inputs.order);

	let full_rotation = (pre * rotation * quat_inverse(post)).normalize();
	let scale = Vec3::new(inputs.scaling[0], inputs.scaling[1], inputs.scaling[2]);

	// Fold pivots into the effective translation.
	let rotation_pivot = to_vec3(inputs.rotation_pivot);
	let scaling_pivot = to_vec3(inputs.scaling_pivot);
	let scale_term = Vec3::new(
		scale.x * (-scaling_pivot.x),
		scale.y * (-scaling_pivot.y),
		scale.z * (-scaling_pivot.z),
	);
	let scaled_point = to_vec3(inputs.scaling_offset) + scaling_pivot + scale_term;
	let rotated = full_rotation * (scaled_point - rotation_pivot);

	let translation = to_vec3(inputs.translation) + to_vec3(inputs.rotation_offset) + rotation_pivot + rotated;

	Transform {
		translation,
		rotation: full_rotation,
		scale,
	}
}

fn to_vec3(values: [f64; 3]) -> Vec3 {
	Vec3::new(values[0], values[1], values[2])
}

fn quat_inverse(quat: Quat) -> Quat {
	Quat::new(quat.s, -quat.v.x, -quat.v.y, -quat.v.z)
}

#[cfg(test)]
mod tests {
	use cgmath::{InnerSpace, Rotation};

	use super::{RotationOrder, Transform, TransformInputs, Vec3, build_node_transform, euler_to_quat};

	fn close(left: f64, right: f64) -> bool {
		(left - right).abs() < 1e-9
	}

	#[test]
	fn rotation_order_defaults_leniently() {
		assert_eq!(RotationOrder::from_int(3), RotationOrder::Yxz);
		assert_eq!(RotationOrder::from_int(99), RotationOrder::Xyz);
		assert_eq!(RotationOrder::from_int(-1), RotationOrder::Xyz);
	}

	#[test]
	fn euler_xyz_rotates_axes_in_sequence() {
		// 90 degrees about Z maps +X to +Y.
		let quat = euler_to_quat([0.0, 0.0, 90.0], RotationOrder::Xyz);
		let rotated = quat.rotate_vector(Vec3::new(1.0, 0.0, 0.0));
		assert!(close(rotated.x, 0.0) && close(rotated.y, 1.0) && close(rotated.z, 0.0));
	}

	#[test]
	fn plain_trs_passes_through() {
		let inputs = TransformInputs {
			translation: [1.0, 2.0, 3.0],
			rotation_euler: [0.0, 0.0, 0.0],
			scaling: [2.0, 2.0, 2.0],
			pre_rotation: [0.0; 3],
			post_rotation: [0.0; 3],
			rotation_offset: [0.0; 3],
			rotation_pivot: [0.0; 3],
			scaling_offset: [0.0; 3],
			scaling_pivot: [0.0; 3],
			order: RotationOrder::Xyz,
		};
		let transform = build_node_transform(&inputs);
		assert!(close(transform.translation.x, 1.0));
		assert!(close(transform.scale.y, 2.0));
		assert!(close(transform.rotation.magnitude(), 1.0));
	}

	#[test]
	fn compose_chains_parent_scale_into_child_translation() {
		let parent = Transform {
			translation: Vec3::new(0.0, 10.0, 0.0),
			scale: Vec3::new(2.0, 2.0, 2.0),
			..Transform::default()
		};
		let child = Transform {
			translation: Vec3::new(1.0, 0.0, 0.0),
			..Transform::default()
		};
		let world = child.compose(&parent);
		assert!(close(world.translation.x, 2.0));
		assert!(close(world.translation.y, 10.0));
	}
}
