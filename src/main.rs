use std::env;
use std::fs;
use std::process;

use wasmite::decoder::decode;
use wasmite::module::Module;
use wasmite::validator::validate;

fn main() {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: wasmite <module.wasm>");
        process::exit(2);
    };

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("{path}: {err}");
            process::exit(1);
        }
    };

    let module = match decode(&bytes) {
        Ok(module) => module,
        Err(err) => {
            eprintln!("{path}: {err}");
            process::exit(1);
        }
    };

    print_summary(&module);

    if let Err(err) = validate(&module) {
        eprintln!("{path}: validation failed: {err}");
        process::exit(1);
    }
    println!("module is valid");
}

fn print_summary(module: &Module) {
    println!("types:     {}", module.types.len());
    println!("imports:   {}", module.imports.len());
    println!("functions: {}", module.num_funcs());
    println!("tables:    {}", module.num_tables());
    println!("memories:  {}", module.num_memories());
    println!("globals:   {}", module.num_globals());
    println!("elements:  {}", module.elements.len());
    println!("datas:     {}", module.datas.len());
    match module.start {
        Some(start) => println!("start:     func {start}"),
        None => println!("start:     none"),
    }
    println!("exports:   {}", module.exports.len());
    for export in &module.exports {
        let (kind, idx) = match export.kind {
            wasmite::module::ExportKind::Func(i) => ("func", i),
            wasmite::module::ExportKind::Table(i) => ("table", i),
            wasmite::module::ExportKind::Memory(i) => ("memory", i),
            wasmite::module::ExportKind::Global(i) => ("global", i),
        };
        println!("  \"{}\" -> {kind}[{idx}]", export.name);
    }
}
