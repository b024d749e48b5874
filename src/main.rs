#![allow(missing_docs)]

use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser)]
#[command(name = "fbxdoc", about = "FBX scene inspection tools")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	Info(cmd::info::Args),
	Tree(cmd::tree::Args),
	Scene(cmd::scene::Args),
}

fn main() {
	env_logger::init();

	if let Err(err) = run() {
		eprintln!("error: {err}");
		for frame in err.frames() {
			eprintln!("  at {}:{} ({})", frame.location, frame.line, frame.condition);
		}
		std::process::exit(1);
	}
}

fn run() -> fbxdoc::fbx::Result<()> {
	let cli = Cli::parse();

	match cli.command {
		Commands::Info(args) => cmd::info::run(args),
		Commands::Tree(args) => cmd::tree::run(args),
		Commands::Scene(args) => cmd::scene::run(args),
	}
}
