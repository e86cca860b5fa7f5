//! Implementation of the `volta values` command.
//!
//! Reads a compiled design file and prints its solved values, one
//! `path = value` line each, through the [`SolvedValues`] backend.

use volta_elaborate::{Backend, SolvedValues};
use volta_wire::DesignFile;

use crate::ValuesArgs;

/// Runs the `volta values` command.
pub fn run(args: &ValuesArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let file = volta_wire::read_design(&args.file)?;
    for line in value_lines(&file, args.filter.as_deref())? {
        println!("{line}");
    }
    Ok(0)
}

/// Formats the values of `file`, keeping only those under `filter`.
fn value_lines(
    file: &DesignFile,
    filter: Option<&str>,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let backend = match filter {
        Some(prefix) => SolvedValues::with_filter(prefix),
        None => SolvedValues::new(),
    };
    let out = backend.run(&file.design, &file.values)?;
    Ok(out
        .into_iter()
        .map(|(path, value)| format!("{path} = {value}"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use volta_ir::{Design, DesignPath, HierarchyBlock, LibraryPath, Refinements, ValueLit};

    fn file() -> DesignFile {
        DesignFile {
            design: Design::new(HierarchyBlock::new(LibraryPath::new("t.Top"))),
            values: vec![
                (DesignPath::of_blocks(&["reg"]).append_param("n"), ValueLit::Int(3)),
                (DesignPath::of_blocks(&["led"]).append_param("on"), ValueLit::Bool(true)),
            ],
            refinements: Refinements::default(),
        }
    }

    #[test]
    fn lists_every_value() {
        let lines = value_lines(&file(), None).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("reg"), "{lines:?}");
        assert!(lines[0].ends_with("= 3"), "{lines:?}");
    }

    #[test]
    fn filter_keeps_one_subtree() {
        let lines = value_lines(&file(), Some("led")).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("led"), "{lines:?}");
    }
}
