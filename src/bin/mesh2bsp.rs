// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Compiles an indexed mesh file into a BSP tree file.

extern crate bspc;
extern crate docopt;
extern crate env_logger;
#[macro_use]
extern crate serde_derive;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::process::exit;

use bspc::common::{bsp, mesh};

use docopt::Docopt;

const USAGE: &'static str = "
Usage: mesh2bsp <source> <dest>

Options:
    -h, --help  Show this message.
";

#[derive(Deserialize)]
struct Args {
    arg_source: String,
    arg_dest: String,
}

fn main() {
    env_logger::init();

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    let source = match File::open(&args.arg_source) {
        Ok(f) => f,
        Err(why) => {
            eprintln!("Couldn't open {}: {}", &args.arg_source, why);
            exit(1);
        }
    };

    let mesh = match mesh::load(&mut BufReader::new(source)) {
        Ok(m) => m,
        Err(why) => {
            eprintln!("Couldn't load {}: {}", &args.arg_source, why);
            exit(1);
        }
    };

    let bsp = match bsp::compile(&mesh.triangles(), mesh.map_names()) {
        Ok(b) => b,
        Err(why) => {
            eprintln!("Compilation failed: {}", why);
            exit(1);
        }
    };

    println!(
        "Compiled {} triangles over {} nodes ({} levels)",
        bsp.num_tri(),
        bsp.num_nodes(),
        bsp.max_depth()
    );

    let dest = match File::create(&args.arg_dest) {
        Ok(f) => f,
        Err(why) => {
            eprintln!("Couldn't create {}: {}", &args.arg_dest, why);
            exit(1);
        }
    };

    if let Err(why) = bsp.save(&mut BufWriter::new(dest)) {
        eprintln!("Couldn't save {}: {}", &args.arg_dest, why);
        exit(1);
    }
}
