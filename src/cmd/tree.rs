use std::path::PathBuf;

use fbxdoc::fbx::{GenericNode, LoadOptions, NodeValues, Result, Value, parse_node_tree};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Maximum printed depth.
	#[arg(long, default_value_t = 4)]
	pub depth: u32,
}

/// Dump the parsed generic node tree.
pub fn run(args: Args) -> Result<()> {
	let Args { path, depth } = args;

	let bytes = std::fs::read(&path)?;
	let root = parse_node_tree(&bytes, &LoadOptions::default())?;

	for child in &root.children {
		print_node(child, 0, depth);
	}
	Ok(())
}

fn print_node(node: &GenericNode, level: u32, max_depth: u32) {
	let indent = "  ".repeat(level as usize);
	print!("{indent}{}:", node.name);

	match &node.values {
		NodeValues::Array(array) => print!(" *{} ({:?})", array.len(), array.kind()),
		NodeValues::Scalars(values) => {
			for value in values.iter().take(6) {
				match value {
					Value::Bool(flag) => print!(" {flag}"),
					Value::I64(number) => print!(" {number}"),
					Value::F64(number) => print!(" {number}"),
					Value::String(text) => print!(" {text:?}"),
					Value::Bytes(bytes) => print!(" <{} bytes>", bytes.len()),
				}
			}
			if values.len() > 6 {
				print!(" ...");
			}
		}
	}
	println!();

	if level + 1 >= max_depth {
		if !node.children.is_empty() {
			println!("{indent}  ... {} children", node.children.len());
		}
		return;
	}
	for child in &node.children {
		print_node(child, level + 1, max_depth);
	}
}
