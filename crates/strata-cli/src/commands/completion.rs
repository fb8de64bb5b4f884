use std::io::Write;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli_args::Cli;

const SHELLS: &[(&str, Shell)] = &[
    ("bash", Shell::Bash),
    ("elvish", Shell::Elvish),
    ("fish", Shell::Fish),
    ("powershell", Shell::PowerShell),
    ("ps", Shell::PowerShell),
    ("zsh", Shell::Zsh),
];

fn shell_named(name: &str) -> Option<Shell> {
    let name = name.to_ascii_lowercase();
    SHELLS.iter().find(|(n, _)| *n == name).map(|(_, shell)| *shell)
}

/// Print the `strata` completion script for `shell`; 2 for shells clap_complete can't target.
pub fn run(shell: &str) -> i32 {
    match write_script(shell, &mut std::io::stdout()) {
        Some(()) => 0,
        None => {
            eprintln!("strata completion: unsupported shell '{shell}'");
            eprintln!("expected one of: bash, elvish, fish, powershell, zsh");
            2
        }
    }
}

fn write_script(shell: &str, out: &mut dyn Write) -> Option<()> {
    let shell = shell_named(shell)?;
    generate(shell, &mut Cli::command(), "strata", out);
    Some(())
}
