use super::*;
use clap::{CommandFactory, Parser};

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_up_defaults_to_latest() {
    let cli = Cli::try_parse_from(["tm", "up"]).unwrap();
    match cli.command {
        Commands::Up(args) => {
            assert_eq!(args.to, "latest");
            assert!(!args.dry_run);
        }
        other => panic!("expected up, got {other:?}"),
    }
}

#[test]
fn test_down_requires_target_or_steps() {
    assert!(Cli::try_parse_from(["tm", "down"]).is_err());
    assert!(Cli::try_parse_from(["tm", "down", "--to", "none", "--steps", "1"]).is_err());

    let cli = Cli::try_parse_from(["tm", "down", "--steps", "2"]).unwrap();
    match cli.command {
        Commands::Down(args) => assert_eq!(args.steps, Some(2)),
        other => panic!("expected down, got {other:?}"),
    }
}

#[test]
fn test_global_args_after_subcommand() {
    let cli = Cli::try_parse_from([
        "tm",
        "status",
        "--json",
        "--project-dir",
        "/srv/app",
        "--lock-timeout",
        "0",
        "-t",
        "prod",
    ])
    .unwrap();
    assert_eq!(cli.global.project_dir, "/srv/app");
    assert_eq!(cli.global.lock_timeout, Some(0));
    assert_eq!(cli.global.target.as_deref(), Some("prod"));
}
