use clap::{Parser, Subcommand};
use std::path::PathBuf;

fn about_message() -> String {
    format!(
        "Switches scheduler and TuneD profiles while matching programs run\nVersion: {}",
        env!("CARGO_PKG_VERSION")
    )
}

#[derive(Parser, Clone, Debug)]
#[clap(name = "pillz", about = about_message(), version)]
pub struct Cli {
    /// Configuration file [default: <config dir>/process_pillz.yaml]
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[clap(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log debug messages
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Watch processes and switch pills (the default)
    #[default]
    Run,

    /// Validate the configuration and print what it defines
    Check,

    /// Apply the default pill once and exit
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::bare(&["pillz"], Command::Run)]
    #[case::run(&["pillz", "run"], Command::Run)]
    #[case::check(&["pillz", "check"], Command::Check)]
    #[case::reset(&["pillz", "reset"], Command::Reset)]
    fn test_subcommands(#[case] args: &[&str], #[case] expected: Command) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.command.unwrap_or_default(), expected);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["pillz", "check", "--config", "/tmp/p.yaml", "-v"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.yaml")));
        assert!(cli.verbose);
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["pillz", "daemonize"]).is_err());
    }
}
