use std::path::PathBuf;

use clap::Parser;

use crate::model::ProjectId;
use crate::tui::LaunchOptions;

#[derive(Parser)]
#[command(name = "lanes", about = concat!("lanes v", env!("CARGO_PKG_VERSION"), " - a kanban board for the terminal"), version)]
pub struct Cli {
    /// Database file (default: from config, then the data directory)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Project to open on start
    #[arg(short = 'p', long)]
    pub project: Option<ProjectId>,

    /// Do not listen for changes made by other instances
    #[arg(long)]
    pub no_feed: bool,

    /// Write the log here instead of the data directory
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn launch_options(self) -> LaunchOptions {
        LaunchOptions {
            config: self.config,
            db: self.db,
            project: self.project,
            feed: !self.no_feed,
            log_file: self.log_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_map_onto_launch_options() {
        let cli = Cli::try_parse_from([
            "lanes",
            "--db",
            "/tmp/board.db",
            "--project",
            "3",
            "--no-feed",
        ])
        .unwrap();
        let opts = cli.launch_options();
        assert_eq!(opts.db, Some(PathBuf::from("/tmp/board.db")));
        assert_eq!(opts.project, Some(3));
        assert!(!opts.feed);
        assert_eq!(opts.config, None);
    }

    #[test]
    fn feed_is_on_by_default() {
        let opts = Cli::try_parse_from(["lanes"]).unwrap().launch_options();
        assert!(opts.feed);
        assert_eq!(opts.project, None);
    }

    #[test]
    fn rejects_non_numeric_project() {
        assert!(Cli::try_parse_from(["lanes", "--project", "web"]).is_err());
    }
}
