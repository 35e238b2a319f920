use std::env;
use std::io;
use std::io::{Read, Write};
use std::process;

use metsfix::{extract_handles, fix_empty_groups_with, FixOptions, VERSION};

fn usage() -> ! {
	eprintln!("usage: pipe [--version] [--relations] [--donor NAME] < mets.xml");
	process::exit(2);
}

fn main() {
	env_logger::init();

	let mut relations = false;
	let mut opts = FixOptions::default();
	let mut args = env::args().skip(1);
	while let Some(arg) = args.next() {
		match arg.as_str() {
			"--version" => {
				println!("metsfix {}", VERSION);
				return;
			}
			"--relations" => relations = true,
			"--donor" => match args.next() {
				Some(name) => opts = opts.donor_group(name),
				None => usage(),
			},
			_ => usage(),
		}
	}

	let mut data = Vec::new();
	if let Err(e) = io::stdin().read_to_end(&mut data) {
		eprintln!("I/O error: {}", e);
		process::exit(1);
	}

	let mut stdout = io::stdout();
	let result = if relations {
		extract_handles(&data).map(|handles| {
			let mut out = Vec::new();
			for handle in handles {
				out.extend_from_slice(handle.as_bytes());
				out.push(b'\n');
			}
			out
		})
	} else {
		fix_empty_groups_with(&data, &opts)
	};

	match result {
		Ok(out) => {
			if let Err(e) = stdout.write_all(&out) {
				eprintln!("I/O error: {}", e);
				process::exit(1);
			}
		}
		Err(e) => {
			eprintln!("cannot process manifest: {}", e);
			process::exit(1);
		}
	}
}
