use std::sync::Arc;

use crate::fbx::binary::ParseEnv;
use crate::fbx::element::{
	AnimCurveData, AnimLayerData, AnimProp, AnimStackData, AnimValueData, BlendChannelData, BlendData, BlendKeyframe,
	BoneData, BonePose, CameraData, ClusterData, Element, ElementData, ElementId, FbxId, Interpolation, Keyframe,
	LightData, LightType, MaterialData, MaterialMap, NurbsBasis, NurbsCurveData, NurbsSurfaceData, NurbsTopology,
	PoseData, ShapeData, SkinData, TextureData, VideoData,
};
use crate::fbx::file::LoadOptions;
use crate::fbx::map::RhMap;
use crate::fbx::mesh;
use crate::fbx::node::{GenericNode, Value};
use crate::fbx::props::{PropList, prop_key};
use crate::fbx::scene::{Axis, FBX_TICKS_PER_SECOND, Metadata, SceneSettings, time_mode_fps};
use crate::fbx::strings::{StringPool, fnv1a};
use crate::fbx::{Frames, Result};

/// Unresolved endpoint of a buffered connection record.
#[derive(Debug, Clone)]
pub enum ConnRef {
	/// Explicit 64-bit object ID (post-7000).
	Id(u64),
	/// Legacy combined `Type::Name` reference (pre-7000).
	Name(Arc<str>),
}

/// One buffered `Connections` record, resolved during linking.
#[derive(Debug, Clone)]
pub struct RawConnection {
	/// Source (child-side) endpoint.
	pub src: ConnRef,
	/// Destination (parent-side) endpoint.
	pub dst: ConnRef,
	/// Source property, empty for object links.
	pub src_prop: Arc<str>,
	/// Destination property, empty for object links.
	pub dst_prop: Arc<str>,
}

/// ID-map payload: raw FBX ID to dense element index.
#[derive(Debug, Clone, Copy)]
pub struct IdMapEntry {
	/// Collapsed [`FbxId::raw`] value.
	pub raw: u64,
	/// Dense element index.
	pub element: ElementId,
}

/// Name-map payload for legacy name-keyed lookups.
#[derive(Debug, Clone)]
pub struct NameMapEntry {
	/// Combined `Type::Name` key.
	pub key: Arc<str>,
	/// Dense element index.
	pub element: ElementId,
}

/// Builder output handed to the linker.
pub struct BuiltScene {
	/// All elements in creation order; index is the `ElementId`.
	pub elements: Vec<Element>,
	/// Buffered connection records in file order.
	pub connections: Vec<RawConnection>,
	/// Synthetic root node element.
	pub root_id: ElementId,
	/// Document metadata.
	pub metadata: Metadata,
	/// Global settings.
	pub settings: SceneSettings,
	/// Raw-ID lookup for connection resolution.
	pub id_map: RhMap<IdMapEntry>,
	/// Legacy combined-name lookup for connection resolution.
	pub name_map: RhMap<NameMapEntry>,
}

/// Walk the parsed node tree and create typed elements plus raw
/// connections; cross-references stay unresolved until linking.
///
/// Record names are dispatched by comparing interned handles against the
/// pool's pre-registered keywords, so the hot paths never re-hash or
/// re-compare name bytes.
pub fn build_scene(root: &GenericNode, version: u32, options: &LoadOptions, env: &mut ParseEnv<'_, '_>) -> Result<BuiltScene> {
	let names = KnownNames::from_pool(env.pool);
	let mut builder = SceneBuilder {
		options,
		version,
		elements: Vec::new(),
		connections: Vec::new(),
		id_map: RhMap::new(),
		name_map: RhMap::new(),
		templates: Vec::new(),
		metadata: Metadata {
			version,
			..Metadata::default()
		},
		settings: SceneSettings::default(),
		synthetic_counter: 0,
		names,
	};

	let root_id = builder.make_root(env)?;

	for top in &root.children {
		let name = &top.name;
		if Arc::ptr_eq(name, &builder.names.header_extension) {
			builder.read_header_extension(top, env)?;
		} else if Arc::ptr_eq(name, &builder.names.global_settings) {
			builder.read_global_settings(top, env)?;
		} else if Arc::ptr_eq(name, &builder.names.definitions) {
			builder.read_definitions(top, env).frame("build_scene", line!(), "Definitions")?;
		} else if Arc::ptr_eq(name, &builder.names.objects) {
			builder.read_objects(top, env).frame("build_scene", line!(), "Objects")?;
		} else if Arc::ptr_eq(name, &builder.names.connections) {
			builder.read_connections(top, env)?;
		} else if Arc::ptr_eq(name, &builder.names.takes) {
			builder.read_takes(top, env).frame("build_scene", line!(), "Takes")?;
		}
	}

	// Pre-7000 files nest settings inside the root document instead.
	if builder.version < 7000
		&& let Some(settings) = root.child("Version5")
	{
		builder.read_global_settings(settings, env)?;
	}

	Ok(BuiltScene {
		elements: builder.elements,
		connections: builder.connections,
		root_id,
		metadata: builder.metadata,
		settings: builder.settings,
		id_map: builder.id_map,
		name_map: builder.name_map,
	})
}

struct SceneBuilder<'o> {
	options: &'o LoadOptions,
	version: u32,
	elements: Vec<Element>,
	connections: Vec<RawConnection>,
	id_map: RhMap<IdMapEntry>,
	name_map: RhMap<NameMapEntry>,
	/// `(object type name, template props)` pairs from `Definitions`.
	templates: Vec<(Arc<str>, Arc<PropList>)>,
	metadata: Metadata,
	settings: SceneSettings,
	synthetic_counter: u64,
	names: KnownNames,
}

/// Cloned well-known handles for pointer-equality dispatch.
struct KnownNames {
	header_extension: Arc<str>,
	global_settings: Arc<str>,
	definitions: Arc<str>,
	objects: Arc<str>,
	connections: Arc<str>,
	takes: Arc<str>,
	model: Arc<str>,
	geometry: Arc<str>,
	node_attribute: Arc<str>,
	material: Arc<str>,
	texture: Arc<str>,
	video: Arc<str>,
	deformer: Arc<str>,
	pose: Arc<str>,
	animation_stack: Arc<str>,
	animation_layer: Arc<str>,
	animation_curve_node: Arc<str>,
	animation_curve: Arc<str>,
	conn_c: Arc<str>,
	conn_connect: Arc<str>,
	oo: Arc<str>,
	op: Arc<str>,
	po: Arc<str>,
	pp: Arc<str>,
}

impl KnownNames {
	fn from_pool(pool: &StringPool) -> Self {
		let names = &pool.names;
		Self {
			header_extension: names.fbx_header_extension.clone(),
			global_settings: names.global_settings.clone(),
			definitions: names.definitions.clone(),
			objects: names.objects.clone(),
			connections: names.connections.clone(),
			takes: names.takes.clone(),
			model: names.model.clone(),
			geometry: names.geometry.clone(),
			node_attribute: names.node_attribute.clone(),
			material: names.material.clone(),
			texture: names.texture.clone(),
			video: names.video.clone(),
			deformer: names.deformer.clone(),
			pose: names.pose.clone(),
			animation_stack: names.animation_stack.clone(),
			animation_layer: names.animation_layer.clone(),
			animation_curve_node: names.animation_curve_node.clone(),
			animation_curve: names.animation_curve.clone(),
			conn_c: names.conn_c.clone(),
			conn_connect: names.conn_connect.clone(),
			oo: names.oo.clone(),
			op: names.op.clone(),
			po: names.po.clone(),
			pp: names.pp.clone(),
		}
	}
}

impl SceneBuilder<'_> {
	fn make_root(&mut self, env: &mut ParseEnv<'_, '_>) -> Result<ElementId> {
		let name = env.pool.intern(env.budget, "Root")?;
		let id = self.next_synthetic();
		let node = crate::fbx::element::NodeData {
			is_root: true,
			visible: true,
			..Default::default()
		};
		self.push_element(name, id, PropList::default(), ElementData::Node(Box::new(node)), env)
	}

	fn next_synthetic(&mut self) -> FbxId {
		self.synthetic_counter += 1;
		FbxId::Synthetic(self.synthetic_counter)
	}

	fn push_element(
		&mut self,
		name: Arc<str>,
		fbx_id: FbxId,
		props: PropList,
		data: ElementData,
		env: &mut ParseEnv<'_, '_>,
	) -> Result<ElementId> {
		let element_id = self.elements.len() as ElementId;
		self.elements.push(Element {
			element_id,
			typed_id: 0,
			fbx_id,
			name,
			props,
			src_connections: (0, 0),
			dst_connections: (0, 0),
			data,
		});

		let raw = fbx_id.raw();
		env.budget.charge(size_of::<IdMapEntry>())?;
		self.id_map.insert(env.budget, id_hash(raw), IdMapEntry { raw, element: element_id })?;
		Ok(element_id)
	}

	fn register_name(&mut self, combined: Arc<str>, element: ElementId, env: &mut ParseEnv<'_, '_>) -> Result<()> {
		let hash = fnv1a(combined.as_bytes());
		if self.name_map.find(hash, |entry| entry.key.as_ref() == combined.as_ref()).is_some() {
			return Ok(());
		}
		self.name_map.insert(env.budget, hash, NameMapEntry { key: combined, element })?;
		Ok(())
	}

	fn read_header_extension(&mut self, node: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<()> {
		if let Some(version) = node.find_i64("FBXVersion")
			&& version > 0
		{
			self.version = version as u32;
			self.metadata.version = version as u32;
		}
		if let Some(creator) = node.find_str("Creator") {
			self.metadata.creator = env.pool.intern(env.budget, creator)?;
		}
		if let Some(time) = node.find_str("CreationTime") {
			self.metadata.creation_time = env.pool.intern(env.budget, time)?;
		}
		Ok(())
	}

	fn read_global_settings(&mut self, node: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<()> {
		let props = PropList::parse(node, env)?;

		self.settings.up_axis = Axis::from_index_and_sign(props.int("UpAxis", 1), props.int("UpAxisSign", 1));
		self.settings.front_axis = Axis::from_index_and_sign(props.int("FrontAxis", 2), props.int("FrontAxisSign", 1));
		self.settings.coord_axis = Axis::from_index_and_sign(props.int("CoordAxis", 0), props.int("CoordAxisSign", 1));
		self.settings.unit_meters = props.real("UnitScaleFactor", 1.0) * 0.01;
		self.settings.frames_per_second = time_mode_fps(props.int("TimeMode", 11));

		let span_start = props.int("TimeSpanStart", 0);
		let span_stop = props.int("TimeSpanStop", 0);
		self.settings.time_begin = span_start as f64 / FBX_TICKS_PER_SECOND;
		self.settings.time_end = span_stop as f64 / FBX_TICKS_PER_SECOND;
		Ok(())
	}

	fn read_definitions(&mut self, node: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<()> {
		for object_type in node.children_named("ObjectType") {
			let Some(type_name) = object_type.value(0).and_then(Value::as_interned) else {
				continue;
			};
			let Some(template) = object_type.child("PropertyTemplate") else {
				continue;
			};
			let props = PropList::parse(template, env)?;
			self.templates.push((type_name.clone(), Arc::new(props)));
		}
		Ok(())
	}

	fn template_for(&self, type_name: &str) -> Option<Arc<PropList>> {
		self.templates
			.iter()
			.find(|(name, _)| name.as_ref() == type_name)
			.map(|(_, props)| props.clone())
	}

	fn read_objects(&mut self, node: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<()> {
		for object in &node.children {
			self.read_object(object, env)
				.frame("read_objects", line!(), "object record")?;
		}
		Ok(())
	}

	/// Split the id/name/subtype head shared by every object record.
	fn object_head(&mut self, object: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<ObjectHead> {
		let values = object.scalars();
		let (fbx_id, combined, subtype) = if let Some(id) = values.first().and_then(Value::as_i64) {
			let combined = values.get(1).and_then(Value::as_str).unwrap_or("");
			let subtype = values.get(2).and_then(Value::as_str).unwrap_or("");
			(FbxId::Real(id as u64), combined.to_owned(), subtype.to_owned())
		} else {
			// Pre-7000: no numeric ID, the combined name is the identity.
			let combined = values.first().and_then(Value::as_str).unwrap_or("");
			let subtype = values.get(1).and_then(Value::as_str).unwrap_or("");
			(self.next_synthetic(), combined.to_owned(), subtype.to_owned())
		};

		let (_, name) = split_type_name(&combined);
		Ok(ObjectHead {
			fbx_id,
			name: env.pool.intern(env.budget, name)?,
			combined: env.pool.intern(env.budget, &canonical_combined(&combined))?,
			subtype: env.pool.intern(env.budget, &subtype)?,
		})
	}

	fn read_object(&mut self, object: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<()> {
		let head = self.object_head(object, env)?;
		let mut props = PropList::parse(object, env)?;
		props.defaults = self.template_for(object.name.as_ref());

		let record = &object.name;
		let data = if Arc::ptr_eq(record, &self.names.model) {
			build_model(&props)
		} else if Arc::ptr_eq(record, &self.names.geometry) {
			self.build_geometry(object, &head)?
		} else if Arc::ptr_eq(record, &self.names.node_attribute) {
			build_attribute(&head, &props)
		} else if Arc::ptr_eq(record, &self.names.material) {
			build_material(object, &props, env)?
		} else if Arc::ptr_eq(record, &self.names.texture) {
			build_texture(object, &props, env)?
		} else if Arc::ptr_eq(record, &self.names.video) {
			build_video(object, env)?
		} else if Arc::ptr_eq(record, &self.names.deformer) {
			build_deformer(object, &head, &props)?
		} else if Arc::ptr_eq(record, &self.names.animation_stack) {
			build_anim_stack(&props)
		} else if Arc::ptr_eq(record, &self.names.animation_layer) {
			build_anim_layer(&props)
		} else if Arc::ptr_eq(record, &self.names.animation_curve_node) {
			build_anim_value(&props)
		} else if Arc::ptr_eq(record, &self.names.animation_curve) {
			build_anim_curve(object)
		} else if Arc::ptr_eq(record, &self.names.pose) {
			build_pose(object)
		} else {
			ElementData::Unknown
		};

		let element = self.push_element(head.name.clone(), head.fbx_id, props, data, env)?;
		if !head.combined.is_empty() {
			self.register_name(head.combined.clone(), element, env)?;
		}

		// Pre-7000 meshes embed geometry in the Model record itself; split
		// it into its own element and connect the pair like modern files.
		if self.version < 7000 && Arc::ptr_eq(&object.name, &self.names.model) && object.child("Vertices").is_some() {
			let mesh_data = mesh::build_mesh(object, self.options)?;
			let mesh_id = self.next_synthetic();
			self.push_element(head.name.clone(), mesh_id, PropList::default(), ElementData::Mesh(Box::new(mesh_data)), env)?;
			self.connections.push(RawConnection {
				src: ConnRef::Id(mesh_id.raw()),
				dst: ConnRef::Id(head.fbx_id.raw()),
				src_prop: env.pool.empty(),
				dst_prop: env.pool.empty(),
			});
		}

		Ok(())
	}

	fn build_geometry(&mut self, object: &GenericNode, head: &ObjectHead) -> Result<ElementData> {
		Ok(match head.subtype.as_ref() {
			"Mesh" | "" => ElementData::Mesh(Box::new(mesh::build_mesh(object, self.options)?)),
			"Shape" => ElementData::BlendShape(Box::new(build_shape(object))),
			"NurbsCurve" => ElementData::NurbsCurve(Box::new(build_nurbs_curve(object))),
			"NurbsSurface" | "Nurb" | "NurbsSurfaceOrder" => {
				ElementData::NurbsSurface(Box::new(build_nurbs_surface(object)))
			}
			_ => ElementData::Unknown,
		})
	}

	fn read_connections(&mut self, node: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<()> {
		for record in &node.children {
			if !Arc::ptr_eq(&record.name, &self.names.conn_c) && !Arc::ptr_eq(&record.name, &self.names.conn_connect) {
				continue;
			}

			let values = record.scalars();
			let Some(kind) = values.first().and_then(Value::as_interned) else {
				continue;
			};

			// "OO"/"OP"/"PO"/"PP": O endpoints are objects, P endpoints
			// carry a property name after the two endpoint values.
			let (src_is_prop, dst_is_prop) = if Arc::ptr_eq(kind, &self.names.oo) {
				(false, false)
			} else if Arc::ptr_eq(kind, &self.names.op) {
				(false, true)
			} else if Arc::ptr_eq(kind, &self.names.po) {
				(true, false)
			} else if Arc::ptr_eq(kind, &self.names.pp) {
				(true, true)
			} else {
				continue;
			};

			let src = match values.get(1) {
				Some(Value::I64(id)) => ConnRef::Id(*id as u64),
				Some(Value::String(name)) => ConnRef::Name(env.pool.intern(env.budget, &canonical_combined(name))?),
				_ => continue,
			};
			let dst = match values.get(2) {
				Some(Value::I64(id)) => ConnRef::Id(*id as u64),
				Some(Value::String(name)) => ConnRef::Name(env.pool.intern(env.budget, &canonical_combined(name))?),
				_ => continue,
			};

			let mut prop_slot = 3_usize;
			let mut src_prop = env.pool.empty();
			let mut dst_prop = env.pool.empty();
			if src_is_prop {
				if let Some(prop) = values.get(prop_slot).and_then(Value::as_interned) {
					src_prop = prop.clone();
				}
				prop_slot += 1;
			}
			if dst_is_prop
				&& let Some(prop) = values.get(prop_slot).and_then(Value::as_interned)
			{
				dst_prop = prop.clone();
			}

			self.connections.push(RawConnection {
				src,
				dst,
				src_prop,
				dst_prop,
			});
		}
		Ok(())
	}

	fn read_takes(&mut self, node: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<()> {
		for take in node.children_named("Take") {
			self.read_take(take, env)?;
		}
		Ok(())
	}

	/// Legacy 6.x animation: one stack and one layer per take, with nested
	/// `Channel` trees holding per-axis keys.
	fn read_take(&mut self, take: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<()> {
		let take_name = take.value_str(0).unwrap_or("Take");
		let take_name = env.pool.intern(env.budget, take_name)?;

		let mut stack = AnimStackData::default();
		if let Some(span) = take.child("LocalTime") {
			stack.time_begin = span.value_i64(0).unwrap_or(0) as f64 / FBX_TICKS_PER_SECOND;
			stack.time_end = span.value_i64(1).unwrap_or(0) as f64 / FBX_TICKS_PER_SECOND;
		}

		let mut layer = AnimLayerData {
			weight: 1.0,
			..AnimLayerData::default()
		};

		for model in take.children_named("Model") {
			let Some(target_name) = model.value_str(0) else {
				continue;
			};
			let key = canonical_combined(target_name);
			let hash = fnv1a(key.as_bytes());
			let Some(found) = self.name_map.find(hash, |entry| entry.key.as_ref() == key) else {
				log::debug!("take references unknown model {target_name:?}");
				continue;
			};
			let target = self.name_map.get(found).element;

			let Some(transform) = model.children_named("Channel").find(|channel| channel.value_str(0) == Some("Transform")) else {
				continue;
			};
			for channel in transform.children_named("Channel") {
				let prop_name = match channel.value_str(0) {
					Some("T") => "Lcl Translation",
					Some("R") => "Lcl Rotation",
					Some("S") => "Lcl Scaling",
					_ => continue,
				};
				let prop_name = env.pool.intern(env.budget, prop_name)?;
				let mut value = AnimValueData::default();

				for (axis, axis_name) in ["X", "Y", "Z"].into_iter().enumerate() {
					let Some(axis_channel) = channel
						.children_named("Channel")
						.find(|child| child.value_str(0) == Some(axis_name))
					else {
						continue;
					};
					value.default[axis] = axis_channel.find_f64("Default").unwrap_or(0.0);

					let keyframes = legacy_keyframes(axis_channel);
					if keyframes.is_empty() {
						continue;
					}
					let curve_id = self.next_synthetic();
					let curve = self.push_element(
						take_name.clone(),
						curve_id,
						PropList::default(),
						ElementData::AnimCurve(Box::new(AnimCurveData { keyframes })),
						env,
					)?;
					value.curves[axis] = Some(curve);
				}

				let value_id = self.next_synthetic();
				let value_element = self.push_element(
					take_name.clone(),
					value_id,
					PropList::default(),
					ElementData::AnimValue(value),
					env,
				)?;
				layer.anim_props.push(AnimProp {
					element: target,
					internal_key: prop_key(prop_name.as_ref()),
					prop_name,
					anim_value: value_element,
				});
			}
		}

		let layer_id = self.next_synthetic();
		let layer_element = self.push_element(take_name.clone(), layer_id, PropList::default(), ElementData::AnimLayer(Box::new(layer)), env)?;
		stack.layers.push(layer_element);
		let stack_id = self.next_synthetic();
		self.push_element(take_name, stack_id, PropList::default(), ElementData::AnimStack(stack), env)?;
		Ok(())
	}
}

struct ObjectHead {
	fbx_id: FbxId,
	name: Arc<str>,
	combined: Arc<str>,
	subtype: Arc<str>,
}

fn id_hash(raw: u64) -> u64 {
	raw.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Split a combined object name into `(class, display name)`.
///
/// Binary files store `Name\x00\x01Class`; ASCII files store
/// `Class::Name`.
fn split_type_name(combined: &str) -> (&str, &str) {
	if let Some(split) = combined.find("\u{0}\u{1}") {
		let (name, class) = combined.split_at(split);
		return (&class[2..], name);
	}
	if let Some(split) = combined.find("::") {
		let (class, name) = combined.split_at(split);
		return (class, &name[2..]);
	}
	("", combined)
}

/// Normalize both combined-name spellings to `Class::Name` so legacy
/// connection records match either era.
fn canonical_combined(combined: &str) -> String {
	let (class, name) = split_type_name(combined);
	if class.is_empty() {
		name.to_owned()
	} else {
		format!("{class}::{name}")
	}
}

fn node_transform_from_props(props: &PropList, order: crate::fbx::transform::RotationOrder) -> crate::fbx::transform::Transform {
	let inputs = crate::fbx::transform::TransformInputs {
		translation: props.vec3("Lcl Translation", [0.0; 3]),
		rotation_euler: props.vec3("Lcl Rotation", [0.0; 3]),
		scaling: props.vec3("Lcl Scaling", [1.0, 1.0, 1.0]),
		pre_rotation: props.vec3("PreRotation", [0.0; 3]),
		post_rotation: props.vec3("PostRotation", [0.0; 3]),
		rotation_offset: props.vec3("RotationOffset", [0.0; 3]),
		rotation_pivot: props.vec3("RotationPivot", [0.0; 3]),
		scaling_offset: props.vec3("ScalingOffset", [0.0; 3]),
		scaling_pivot: props.vec3("ScalingPivot", [0.0; 3]),
		order,
	};
	crate::fbx::transform::build_node_transform(&inputs)
}

/// Scene node from a `Model` record.
///
/// The local transform is assembled now; linking only wires the
/// hierarchy. Attribute subtype models (lights, limbs) keep their payload
/// on the connected `NodeAttribute` element.
fn build_model(props: &PropList) -> ElementData {
	let rotation_order = crate::fbx::transform::RotationOrder::from_int(props.int("RotationOrder", 0));
	let node = crate::fbx::element::NodeData {
		visible: props.int("Visibility", 1) != 0,
		rotation_order,
		local_transform: node_transform_from_props(props, rotation_order),
		..Default::default()
	};
	ElementData::Node(Box::new(node))
}

fn build_attribute(head: &ObjectHead, props: &PropList) -> ElementData {
	match head.subtype.as_ref() {
		"Light" => ElementData::Light(Box::new(LightData {
			color: props.vec3("Color", [1.0, 1.0, 1.0]),
			intensity: props.real("Intensity", 100.0),
			light_type: LightType::from_int(props.int("LightType", 0)),
		})),
		"Camera" => ElementData::Camera(Box::new(CameraData {
			field_of_view_deg: props.real("FieldOfView", 40.0),
			aspect_ratio: props.real("AspectWidth", 1.0) / props.real("AspectHeight", 1.0).max(1e-9),
			near_plane: props.real("NearPlane", 10.0),
			far_plane: props.real("FarPlane", 4000.0),
			orthographic: props.int("CameraProjectionType", 0) == 1,
		})),
		"LimbNode" | "Limb" => ElementData::Bone(BoneData {
			relative_length: props.real("Size", 100.0),
			is_root: false,
		}),
		"Root" => ElementData::Bone(BoneData {
			relative_length: props.real("Size", 100.0),
			is_root: true,
		}),
		"Null" | "Marker" => ElementData::Empty,
		_ => ElementData::Empty,
	}
}

fn build_material(object: &GenericNode, props: &PropList, env: &mut ParseEnv<'_, '_>) -> Result<ElementData> {
	let shading = object
		.find_str("ShadingModel")
		.or_else(|| props.string("ShadingModel").map(|text| text.as_ref()))
		.unwrap_or("lambert");
	let shading_model = env.pool.intern(env.budget, shading)?;

	let slot = |color: &str, factor: &str| {
		let prop = props.find_with_defaults(color);
		MaterialMap {
			value: prop.map(|prop| prop.value_real).unwrap_or([0.0; 3]),
			factor: props.real(factor, 1.0),
			texture: None,
			has_value: prop.is_some(),
		}
	};

	Ok(ElementData::Material(Box::new(MaterialData {
		shading_model,
		diffuse: slot("DiffuseColor", "DiffuseFactor"),
		specular: slot("SpecularColor", "SpecularFactor"),
		ambient: slot("AmbientColor", "AmbientFactor"),
		emissive: slot("EmissiveColor", "EmissiveFactor"),
		normal_map: slot("NormalMap", "BumpFactor"),
		bump: slot("Bump", "BumpFactor"),
		opacity: slot("Opacity", "TransparencyFactor"),
		shininess: slot("Shininess", "ShininessExponent"),
		reflection: slot("ReflectionColor", "ReflectionFactor"),
	})))
}

fn build_texture(object: &GenericNode, props: &PropList, env: &mut ParseEnv<'_, '_>) -> Result<ElementData> {
	let filename = object.find_str("FileName").or_else(|| object.find_str("Filename")).unwrap_or("");
	let relative = object.find_str("RelativeFilename").unwrap_or("");
	let uv_set = props.string("UVSet").cloned().unwrap_or_else(|| env.pool.empty());

	Ok(ElementData::Texture(Box::new(TextureData {
		filename: env.pool.intern(env.budget, filename)?,
		relative_filename: env.pool.intern(env.budget, relative)?,
		uv_set,
		video: None,
	})))
}

fn build_video(object: &GenericNode, env: &mut ParseEnv<'_, '_>) -> Result<ElementData> {
	let filename = object.find_str("Filename").or_else(|| object.find_str("FileName")).unwrap_or("");
	let relative = object.find_str("RelativeFilename").unwrap_or("");

	let content = object.child("Content").and_then(|content| match content.value(0) {
		Some(Value::Bytes(bytes)) if !bytes.is_empty() => Some(Arc::<[u8]>::from(bytes.as_slice())),
		_ => None,
	});

	Ok(ElementData::Video(Box::new(VideoData {
		filename: env.pool.intern(env.budget, filename)?,
		relative_filename: env.pool.intern(env.budget, relative)?,
		content,
	})))
}

fn build_deformer(object: &GenericNode, head: &ObjectHead, props: &PropList) -> Result<ElementData> {
	Ok(match head.subtype.as_ref() {
		"Skin" => ElementData::SkinDeformer(Box::new(SkinData::default())),
		"Cluster" => {
			let mut cluster = ClusterData::default();
			if let Some(array) = object.find_array("Indexes") {
				cluster.vertices = array.to_i32_vec();
			}
			if let Some(array) = object.find_array("Weights") {
				cluster.weights = array.to_f64_vec();
			}
			cluster.transform = matrix16(object.find_array("Transform").map(|array| array.to_f64_vec()));
			cluster.transform_link = matrix16(object.find_array("TransformLink").map(|array| array.to_f64_vec()));
			// Mismatched index/weight lengths degrade to the shorter run.
			let pairs = cluster.vertices.len().min(cluster.weights.len());
			cluster.vertices.truncate(pairs);
			cluster.weights.truncate(pairs);
			ElementData::SkinCluster(Box::new(cluster))
		}
		"BlendShape" => ElementData::BlendDeformer(BlendData::default()),
		"BlendShapeChannel" => {
			let mut channel = BlendChannelData {
				weight: props.real("DeformPercent", 0.0) / 100.0,
				..BlendChannelData::default()
			};
			if let Some(array) = object.find_array("FullWeights") {
				// Target weights only; shapes attach during linking.
				channel.keyframes = array
					.to_f64_vec()
					.into_iter()
					.map(|target_weight| BlendKeyframe {
						shape: u32::MAX,
						target_weight,
					})
					.collect();
			}
			ElementData::BlendChannel(channel)
		}
		_ => ElementData::Unknown,
	})
}

fn build_shape(object: &GenericNode) -> ShapeData {
	let mut shape = ShapeData::default();
	if let Some(array) = object.find_array("Indexes") {
		shape.indices = array.to_i32_vec();
	}
	if let Some(array) = object.find_array("Vertices") {
		shape.offsets = chunk3(&array.to_f64_vec());
	}
	let pairs = shape.indices.len().min(shape.offsets.len());
	shape.indices.truncate(pairs);
	shape.offsets.truncate(pairs);
	shape
}

fn build_nurbs_basis(object: &GenericNode, knot_name: &str, order: i64) -> NurbsBasis {
	let knots = object.find_array(knot_name).map(|array| array.to_f64_vec()).unwrap_or_default();
	NurbsBasis {
		order: order.max(0) as u32,
		topology: NurbsTopology::from_name(object.find_str("Form").unwrap_or("Open")),
		knots,
		spans: Vec::new(),
		valid: false,
	}
}

fn build_nurbs_curve(object: &GenericNode) -> NurbsCurveData {
	let order = object.find_i64("Order").unwrap_or(4);
	let points = object.find_array("Points").map(|array| array.to_f64_vec()).unwrap_or_default();

	NurbsCurveData {
		basis: build_nurbs_basis(object, "KnotVector", order),
		control_points: chunk4(&points),
	}
}

fn build_nurbs_surface(object: &GenericNode) -> NurbsSurfaceData {
	let (order_u, order_v) = match object.child("NurbsSurfaceOrder") {
		Some(node) => (node.value_i64(0).unwrap_or(4), node.value_i64(1).unwrap_or(4)),
		None => (4, 4),
	};
	let (num_u, num_v) = match object.child("Dimensions") {
		Some(node) => (
			node.value_i64(0).unwrap_or(0).max(0) as usize,
			node.value_i64(1).unwrap_or(0).max(0) as usize,
		),
		None => (0, 0),
	};

	let points = object.find_array("Points").map(|array| array.to_f64_vec()).unwrap_or_default();
	NurbsSurfaceData {
		basis_u: build_nurbs_basis(object, "KnotVectorU", order_u),
		basis_v: build_nurbs_basis(object, "KnotVectorV", order_v),
		num_u,
		num_v,
		control_points: chunk4(&points),
	}
}

fn build_anim_stack(props: &PropList) -> ElementData {
	ElementData::AnimStack(AnimStackData {
		layers: Vec::new(),
		time_begin: props.int("LocalStart", 0) as f64 / FBX_TICKS_PER_SECOND,
		time_end: props.int("LocalStop", 0) as f64 / FBX_TICKS_PER_SECOND,
	})
}

fn build_anim_layer(props: &PropList) -> ElementData {
	let weight = props.real("Weight", 100.0) / 100.0;
	// FBX blend modes: 0 additive, 1 override.
	let additive = props.int("BlendMode", 0) == 0;
	ElementData::AnimLayer(Box::new(AnimLayerData {
		anim_props: Vec::new(),
		weight,
		additive,
		blended: (weight - 1.0).abs() > f64::EPSILON,
		min_element_id: 0,
		max_element_id: 0,
	}))
}

fn build_anim_value(props: &PropList) -> ElementData {
	ElementData::AnimValue(AnimValueData {
		default: [props.real("d|X", 0.0), props.real("d|Y", 0.0), props.real("d|Z", 0.0)],
		curves: [None, None, None],
	})
}

/// Flag bits of `KeyAttrFlags` selecting the interpolation mode.
const KEY_INTERP_CONSTANT: i32 = 0x2;
const KEY_INTERP_LINEAR: i32 = 0x4;
const KEY_INTERP_CUBIC: i32 = 0x8;
const KEY_CONSTANT_NEXT: i32 = 0x100;
const KEY_WEIGHTED_RIGHT: i32 = 0x1000000;
const KEY_WEIGHTED_NEXT_LEFT: i32 = 0x2000000;

fn build_anim_curve(object: &GenericNode) -> ElementData {
	let times = object.find_array("KeyTime").map(|array| array.to_i64_vec()).unwrap_or_default();
	let values = object.find_array("KeyValueFloat").map(|array| array.to_f64_vec()).unwrap_or_default();
	let flags = object.find_array("KeyAttrFlags").map(|array| array.to_i32_vec()).unwrap_or_default();
	let attr_data = object.find_array("KeyAttrDataFloat").map(|array| array.to_f64_vec()).unwrap_or_default();
	let refcounts = object.find_array("KeyAttrRefCount").map(|array| array.to_i32_vec()).unwrap_or_default();

	let num_keys = times.len().min(values.len());
	let mut keyframes = Vec::with_capacity(num_keys);

	// Attribute groups are run-length shared between consecutive keys.
	let mut attr_index = 0_usize;
	let mut attr_left = refcounts.first().copied().unwrap_or(i32::MAX);

	for key in 0..num_keys {
		if attr_left <= 0 && attr_index + 1 < refcounts.len() {
			attr_index += 1;
			attr_left = refcounts[attr_index];
		}
		attr_left -= 1;

		let flag = flags.get(attr_index).copied().unwrap_or(KEY_INTERP_CUBIC);
		let interpolation = if flag & KEY_INTERP_CONSTANT != 0 {
			if flag & KEY_CONSTANT_NEXT != 0 {
				Interpolation::ConstantNext
			} else {
				Interpolation::ConstantPrev
			}
		} else if flag & KEY_INTERP_LINEAR != 0 {
			Interpolation::Linear
		} else if flag & KEY_INTERP_CUBIC != 0 {
			Interpolation::Cubic
		} else {
			Interpolation::Cubic
		};

		let base = attr_index * 4;
		let right_slope = attr_data.get(base).copied().unwrap_or(0.0);
		let next_left_slope = attr_data.get(base + 1).copied().unwrap_or(0.0);

		// Tangent weights default to the symmetric cubic third.
		let right_dx = if flag & KEY_WEIGHTED_RIGHT != 0 {
			unpack_weight(attr_data.get(base + 2).copied().unwrap_or(0.0), 0)
		} else {
			1.0 / 3.0
		};
		let next_left_dx = if flag & KEY_WEIGHTED_NEXT_LEFT != 0 {
			unpack_weight(attr_data.get(base + 2).copied().unwrap_or(0.0), 1)
		} else {
			1.0 / 3.0
		};

		let time = times[key] as f64 / FBX_TICKS_PER_SECOND;
		let next_dt = if key + 1 < num_keys {
			(times[key + 1] - times[key]) as f64 / FBX_TICKS_PER_SECOND
		} else {
			0.0
		};

		keyframes.push(Keyframe {
			time,
			value: values[key],
			interpolation,
			right_dx,
			right_dy: right_slope * next_dt * right_dx,
			next_left_dx,
			next_left_dy: next_left_slope * next_dt * next_left_dx,
		});
	}

	keyframes.sort_by(|left, right| left.time.total_cmp(&right.time));
	ElementData::AnimCurve(Box::new(AnimCurveData { keyframes }))
}

/// Extract one of the two packed 16-bit tangent weights.
fn unpack_weight(packed: f64, slot: usize) -> f64 {
	let bits = (packed as f32).to_bits();
	let raw = if slot == 0 { bits & 0xFFFF } else { bits >> 16 };
	if raw == 0 {
		return 1.0 / 3.0;
	}
	f64::from(raw) / 9999.0
}

fn build_pose(object: &GenericNode) -> ElementData {
	let is_bind_pose = object.find_str("Type").unwrap_or("BindPose") == "BindPose";
	let mut pose = PoseData {
		is_bind_pose,
		..PoseData::default()
	};

	for pose_node in object.children_named("PoseNode") {
		let Some(node_id) = pose_node.find_i64("Node") else {
			continue;
		};
		let matrix = matrix16(pose_node.find_array("Matrix").map(|array| array.to_f64_vec()));
		// Node IDs resolve during linking; stash the raw ID until then.
		pose.raw_node_ids.push(node_id as u64);
		pose.bone_poses.push(BonePose { node: 0, matrix });
	}
	ElementData::Pose(Box::new(pose))
}

/// Legacy `Takes` channel keys: `(time, value [, mode])` groups either as
/// scalars with letter modes or as a flat numeric array.
fn legacy_keyframes(channel: &GenericNode) -> Vec<Keyframe> {
	let mut keyframes: Vec<Keyframe> = Vec::new();

	let key_node = channel.child("Key");
	if let Some(node) = key_node {
		if let Some(array) = node.array() {
			let flat = array.to_f64_vec();
			for pair in flat.chunks_exact(2) {
				push_legacy_key(&mut keyframes, pair[0], pair[1]);
			}
		} else {
			let mut scalars = node.scalars().iter().peekable();
			while let Some(value) = scalars.next() {
				let Some(time) = value.as_i64().map(|ticks| ticks as f64).or_else(|| value.as_f64()) else {
					continue;
				};
				let Some(key_value) = scalars.next().and_then(Value::as_f64) else {
					break;
				};
				// Skip the interpolation mode letter and its parameters.
				while let Some(next) = scalars.peek() {
					if matches!(next, Value::String(_)) {
						scalars.next();
					} else {
						break;
					}
				}
				push_legacy_key(&mut keyframes, time, key_value);
			}
		}
	}

	keyframes.sort_by(|left, right| left.time.total_cmp(&right.time));
	keyframes
}

fn push_legacy_key(keyframes: &mut Vec<Keyframe>, ticks: f64, value: f64) {
	keyframes.push(Keyframe {
		time: ticks / FBX_TICKS_PER_SECOND,
		value,
		interpolation: Interpolation::Linear,
		right_dx: 1.0 / 3.0,
		right_dy: 0.0,
		next_left_dx: 1.0 / 3.0,
		next_left_dy: 0.0,
	});
}

fn matrix16(values: Option<Vec<f64>>) -> [f64; 16] {
	let mut out = [0.0_f64; 16];
	out[0] = 1.0;
	out[5] = 1.0;
	out[10] = 1.0;
	out[15] = 1.0;
	if let Some(values) = values {
		for (slot, value) in out.iter_mut().zip(values) {
			*slot = value;
		}
	}
	out
}

fn chunk3(values: &[f64]) -> Vec<[f64; 3]> {
	values.chunks_exact(3).map(|chunk| [chunk[0], chunk[1], chunk[2]]).collect()
}

fn chunk4(values: &[f64]) -> Vec<[f64; 4]> {
	if values.len() % 4 == 0 && !values.is_empty() {
		values.chunks_exact(4).map(|chunk| [chunk[0], chunk[1], chunk[2], chunk[3]]).collect()
	} else {
		// Legacy three-component points carry implicit unit weight.
		values.chunks_exact(3).map(|chunk| [chunk[0], chunk[1], chunk[2], 1.0]).collect()
	}
}
