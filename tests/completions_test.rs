#![cfg(feature = "cli")]
//! Shell completion generation smoke tests.

use clap::CommandFactory;
use ibd_usage::cli::app::Cli;

#[test]
fn test_generate_bash_completions() {
    let mut cmd = Cli::command();
    let mut out = Vec::new();
    clap_complete::generate(clap_complete::Shell::Bash, &mut cmd, "ibd-usage", &mut out);

    let script = String::from_utf8(out).expect("utf8 completions");
    assert!(script.contains("ibd-usage"));
    assert!(script.contains("usage"));
}

#[test]
fn test_generate_zsh_completions() {
    let mut cmd = Cli::command();
    let mut out = Vec::new();
    clap_complete::generate(clap_complete::Shell::Zsh, &mut cmd, "ibd-usage", &mut out);
    assert!(!out.is_empty());
}
