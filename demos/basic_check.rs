//! Example: Basic signature verification
//!
//! Resolves a module name through the loader search order, then asks the
//! trust provider about the file that was found.

use modsig::{exit_status, LocateError, ModuleLocator, VerificationResult};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <module_name>", args[0]);
        std::process::exit(1);
    }

    let name = &args[1];
    println!("Looking up: {}\n", name);

    let locator = match ModuleLocator::system() {
        Ok(locator) => locator,
        Err(e) => {
            eprintln!("Cannot build search order: {e}");
            std::process::exit(1);
        }
    };

    let path = match locator.locate(name) {
        Ok(path) => path,
        Err(LocateError::NotFound { name, tried }) => {
            println!("{name} not found in:");
            for dir in tried {
                println!("  {}", dir.display());
            }
            std::process::exit(exit_status(Some(VerificationResult::ObjectNotFound)));
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    println!("Resolved to: {}", path.display());

    match modsig::verify(&path) {
        Ok(VerificationResult::Success) => println!("\n✓ Signed and trusted"),
        Ok(result) => println!("\n✗ {result}"),
        Err(e) => eprintln!("\nCheck failed: {e}"),
    }
}
