//! CLI entry point for the repo-local architecture lint.

use std::io::{self, Write};
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};

fn main() -> ExitCode {
    let outcome = workspace_root()
        .ok_or_else(|| "no Cargo.toml with a [workspace] table above the current directory".to_owned())
        .and_then(|root| {
            architecture_lint::lint_storefront_sources(&root.join("storefront"))
                .map_err(|err| err.to_string())
        });
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            let _ = writeln!(io::stderr().lock(), "{message}");
            ExitCode::FAILURE
        }
    }
}

/// First workspace manifest found walking up from `CARGO_WORKSPACE_DIR`,
/// the current directory, or this crate's manifest directory.
fn workspace_root() -> Option<Utf8PathBuf> {
    let candidates = [
        std::env::var("CARGO_WORKSPACE_DIR").ok().map(Utf8PathBuf::from),
        std::env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok()),
        Some(Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
    ];
    candidates
        .iter()
        .flatten()
        .find_map(|start| start.ancestors().find(|dir| declares_workspace(dir)))
        .map(Utf8Path::to_path_buf)
}

fn declares_workspace(dir: &Utf8Path) -> bool {
    std::fs::read_to_string(dir.join("Cargo.toml"))
        .is_ok_and(|manifest| manifest.contains("[workspace]"))
}
