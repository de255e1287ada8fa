use clap::{Parser, ValueEnum};
use log::debug;
use modsig::{
    exit_status, LocateError, ModuleLocator, RevocationCheck, SignatureVerifier,
    VerificationResult, VerifyOptions, WeakDigestPolicy, FAULT_EXIT_CODE, FAULT_EXIT_STATUS,
};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "modsig",
    version,
    about = "Check whether a module carries a trusted Authenticode signature",
    after_help = "Exit status is 0 when the signature is valid and trusted, otherwise the low 16 bits of the trust result code. Where exit statuses are 8 bits wide every untrusted outcome exits with 255."
)]
struct Cli {
    /// File to verify, or module name with --locate
    #[arg(required_unless_present_any = ["explain", "list_codes"])]
    target: Option<String>,

    /// Resolve TARGET as a module name using the loader search order
    #[arg(short, long)]
    locate: bool,

    /// Check revocation for the whole certificate chain
    #[arg(long)]
    revoke_whole_chain: bool,

    /// When to reject MD2/MD4 digests in the chain
    #[arg(long, value_enum, default_value_t = WeakDigests::Auto)]
    weak_digests: WeakDigests,

    /// Only set the exit status
    #[arg(short, long)]
    quiet: bool,

    /// Print the result name for an exit status and exit
    #[arg(long, value_name = "EXIT_CODE")]
    explain: Option<u16>,

    /// Print every result with its exit status and exit
    #[arg(long)]
    list_codes: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum WeakDigests {
    Auto,
    Always,
    Never,
}

impl From<WeakDigests> for WeakDigestPolicy {
    fn from(value: WeakDigests) -> Self {
        match value {
            WeakDigests::Auto => WeakDigestPolicy::Auto,
            WeakDigests::Always => WeakDigestPolicy::Always,
            WeakDigests::Never => WeakDigestPolicy::Never,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_codes {
        for result in VerificationResult::KNOWN {
            println!("{:>6}  {:#06x}  {}", result.exit_code(), result.exit_code(), result.name());
        }
        return;
    }

    if let Some(code) = cli.explain {
        match VerificationResult::from_exit_code(code) {
            Some(result) => println!("{result}"),
            None if i32::from(code) == FAULT_EXIT_CODE || i32::from(code) == FAULT_EXIT_STATUS => {
                println!("The check could not be performed.")
            }
            None => {
                eprintln!("{code} is not a known exit status.");
                process::exit(1);
            }
        }
        return;
    }

    let Some(target) = cli.target.as_deref() else {
        return;
    };

    let path = if cli.locate {
        match ModuleLocator::system().and_then(|locator| locator.locate(target)) {
            Ok(path) => path,
            Err(LocateError::NotFound { name, tried }) => {
                if !cli.quiet {
                    eprintln!("{name} was not found. Searched:");
                    for dir in &tried {
                        eprintln!("  {}", dir.display());
                    }
                }
                process::exit(exit_status(Some(VerificationResult::ObjectNotFound)));
            }
            Err(e) => {
                eprintln!("{e}");
                process::exit(exit_status(None));
            }
        }
    } else {
        PathBuf::from(target)
    };
    debug!("verifying {}", path.display());

    let options = VerifyOptions {
        revocation: if cli.revoke_whole_chain {
            RevocationCheck::WholeChain
        } else {
            RevocationCheck::ExcludeRoot
        },
        weak_digests: cli.weak_digests.into(),
    };

    let result = match SignatureVerifier::system(options).verify(&path) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            process::exit(exit_status(None));
        }
    };

    if !cli.quiet {
        println!("{}: {result}", path.display());
    }
    process::exit(exit_status(Some(result)));
}
