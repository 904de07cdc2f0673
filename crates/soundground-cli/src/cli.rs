//! Command-line argument parsing for Soundground.

use std::path::PathBuf;

use clap::Parser;


/// Soundground - browse and play a SoundCloud catalog from the terminal.
#[derive( Parser, Debug )]
#[command( name = "soundground" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// Catalog list to load on startup (e.g. `you/likes`, `someone/sets/name`).
    #[arg( short, long )]
    pub list: Option<String>,

    /// Number of concurrent metadata fetches.
    #[arg( short, long )]
    pub workers: Option<usize>,

    /// Log file; defaults to `soundground.log` in the local data directory.
    #[arg( long )]
    pub log_file: Option<PathBuf>,

    /// Settings file; defaults to `soundground/settings.json` in the config
    /// directory.
    #[arg( short, long )]
    pub config: Option<PathBuf>,
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_all_flags() {
        let args = Args::parse_from([
            "soundground", "--list", "you/likes", "-w", "2", "--log-file", "/tmp/sg.log", "-c", "/tmp/sg.json",
        ]);
        assert_eq!( args.list.as_deref(), Some( "you/likes" ) );
        assert_eq!( args.workers, Some( 2 ) );
        assert_eq!( args.log_file, Some( PathBuf::from( "/tmp/sg.log" ) ) );
        assert_eq!( args.config, Some( PathBuf::from( "/tmp/sg.json" ) ) );
    }


    #[test]
    fn test_defaults() {
        let args = Args::parse_from([ "soundground" ]);
        assert!( args.list.is_none() );
        assert!( args.workers.is_none() );
        assert!( args.config.is_none() );
    }
}
