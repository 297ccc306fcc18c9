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

//! Prints the node structure of a compiled BSP tree as a Graphviz dot graph.

extern crate bspc;
extern crate env_logger;

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::process::exit;

use bspc::common::bsp;

fn main() {
    env_logger::init();

    let path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("Usage: bsp-dot <source>");
            exit(1);
        }
    };

    let source = match File::open(&path) {
        Ok(f) => f,
        Err(why) => {
            eprintln!("Couldn't open {}: {}", path, why);
            exit(1);
        }
    };

    let data = match bsp::load(&mut BufReader::new(source)) {
        Ok(d) => d,
        Err(why) => {
            eprintln!("Couldn't load {}: {}", path, why);
            exit(1);
        }
    };

    println!("{}", data.gen_dot_graph());
}
