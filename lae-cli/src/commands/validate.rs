use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use algebra_service::{FileTreeSource, TreeSource};

/// Parse and shape-check an expression document
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the expression document (.json, .yaml or .yml)
    pub input: PathBuf,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let input = &args.input;

    if !input.exists() {
        color_eyre::eyre::bail!("Input file not found: {}", input.display());
    }

    output::status("Validating", &format!("{}", input.display()));

    // Step 1: Decode the document
    let tree = match FileTreeSource::new(input).load() {
        Ok(tree) => tree,
        Err(e) => {
            output::error(&format!("Parse error: {}", e));
            std::process::exit(1);
        }
    };
    output::check("Document syntax valid");
    output::check(&format!("{} operation(s)", tree.operation_count()));

    // Step 2: Arity and dimension contracts
    match tree.shape() {
        Ok((rows, columns)) => {
            output::check(&format!("Result shape: {}x{}", rows, columns));
        }
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    }

    println!();
    output::success(&format!("{} is valid", input.display()));
    Ok(())
}
