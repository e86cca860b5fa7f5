//! Implementation of the `volta dump` command.
//!
//! Pretty-prints a library file as a class listing, or a design file as its
//! block hierarchy followed by the solved values.

use std::fmt::Write as _;
use std::path::Path;

use volta_ir::{
    BlockLike, HierarchyBlock, Library, LibraryElement, LinkLike, OrderedMap, ParamType, PortLike,
};
use volta_wire::{DesignFile, VoltaFile};

/// Runs the `volta dump` command.
pub fn run(file: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    let text = match volta_wire::read_file(file)? {
        VoltaFile::Library(library) => dump_library(&library),
        VoltaFile::Design(design) => dump_design(&design),
    };
    print!("{text}");
    Ok(0)
}

fn dump_library(library: &Library) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "library: {} classes", library.len());
    for (name, element) in library.elements.iter() {
        let (kind, params) = match element {
            LibraryElement::Port(port) => ("port", &port.params),
            LibraryElement::Bundle(bundle) => ("bundle", &bundle.params),
            LibraryElement::Block(block) => ("block", &block.params),
            LibraryElement::Link(link) => ("link", &link.params),
        };
        let _ = write!(out, "  {kind} {name}");
        if let LibraryElement::Block(block) = element {
            if block.generator.is_some() {
                out.push_str(" (generator)");
            }
            if let Some(parent) = block.superclasses.first() {
                let _ = write!(out, " : {parent}");
            }
        }
        out.push('\n');
        write_params(&mut out, params, 4);
    }
    out
}

fn dump_design(file: &DesignFile) -> String {
    let mut out = String::new();
    write_block(&mut out, "(root)", &file.design.contents, 0);
    if !file.refinements.is_empty() {
        let _ = writeln!(
            out,
            "refinements: {} class, {} instance, {} value",
            file.refinements.classes.len(),
            file.refinements.instances.len(),
            file.refinements.values.len()
        );
    }
    let _ = writeln!(out, "values:");
    for (path, value) in &file.values {
        let _ = writeln!(out, "  {path} = {value}");
    }
    out
}

fn write_block(out: &mut String, name: &str, block: &HierarchyBlock, depth: usize) {
    let pad = "  ".repeat(depth);
    let _ = write!(out, "{pad}{name}: {}", block.self_class);
    if let Some(original) = &block.meta.refinement_original {
        let _ = write!(out, " (refined from {original})");
    }
    if block.generator_pending() {
        out.push_str(" (generator pending)");
    }
    out.push('\n');
    for (stage, message) in block.meta.errors.iter() {
        let _ = writeln!(out, "{pad}  ! {stage}: {message}");
    }
    write_params(out, &block.params, depth * 2 + 2);
    for (port_name, port) in block.ports.iter() {
        let shape = match port {
            PortLike::Array(_) => "[]",
            _ => "",
        };
        let _ = writeln!(out, "{pad}  port {port_name}{shape}: {}", port.self_class());
    }
    for (link_name, link) in block.links.iter() {
        let _ = writeln!(out, "{pad}  link {link_name}: {}", link_class(link));
    }
    for (child_name, child) in block.blocks.iter() {
        match child {
            BlockLike::Block(child) => write_block(out, child_name, child, depth + 1),
            BlockLike::LibElem(class) => {
                let _ = writeln!(out, "{pad}  {child_name}: {class} (not instantiated)");
            }
        }
    }
}

fn link_class(link: &LinkLike) -> String {
    match link {
        LinkLike::Array(array) => format!("{}[{}]", array.self_class, array.links.len()),
        other => other.self_class().to_string(),
    }
}

fn write_params(out: &mut String, params: &OrderedMap<ParamType>, indent: usize) {
    for (name, ty) in params.iter() {
        let _ = writeln!(out, "{:indent$}param {name}: {ty}", "");
    }
}
