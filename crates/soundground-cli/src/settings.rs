//! Application settings.
//!
//! Read once at startup from `settings.json` in the config directory.
//! Missing or unreadable files fall back to the defaults.

use std::fs;
use std::path::{ Path, PathBuf };

use serde::Deserialize;
use soundground_core::fetch::DEFAULT_WORKERS;
use soundground_core::metadata::DEFAULT_CATALOG_BASE;


/// Application settings.
#[derive( Debug, Clone, PartialEq, Deserialize )]
#[serde( default )]
pub struct Settings {
    /// Concurrent metadata fetches
    pub fetch_workers: usize,

    /// Prefix for catalog paths given to `list`
    pub catalog_base: String,

    /// Metadata extractor executable
    pub extractor_program: String,

    /// Audio player executable
    pub player_program: String,

    /// Starting volume, 0 to 150
    pub volume: i32,
}


impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch_workers: DEFAULT_WORKERS,
            catalog_base: DEFAULT_CATALOG_BASE.to_string(),
            extractor_program: "yt-dlp".to_string(),
            player_program: "mpv".to_string(),
            volume: 100,
        }
    }
}


impl Settings {
    /// Returns the path to the settings file.
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "soundground" ).join( "settings.json" ) )
    }


    /// Loads settings from `path`, or the default location when `None`.
    /// Returns the defaults if the file is missing.
    pub fn load( path: Option<&Path> ) -> Self {
        let path = match path.map( Path::to_path_buf ).or_else( Self::settings_path ) {
            Some( p ) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            return Self::default();
        }

        tracing::debug!( "Reading settings from {}", path.display() );
        match fs::read_to_string( &path ) {
            Ok( contents ) => Self::parse( &contents ),
            Err( e ) => {
                tracing::warn!( "Failed to read settings: {}", e );
                Self::default()
            }
        }
    }


    /// Parses settings JSON. Absent fields take their defaults; invalid
    /// JSON yields the defaults entirely.
    pub fn parse( contents: &str ) -> Self {
        match serde_json::from_str::<Self>( contents ) {
            Ok( mut settings ) => {
                settings.fetch_workers = settings.fetch_workers.max( 1 );
                settings
            }
            Err( e ) => {
                tracing::warn!( "Ignoring malformed settings: {}", e );
                Self::default()
            }
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::parse( r#"{ "fetch_workers": 8, "player_program": "/opt/mpv" }"# );
        assert_eq!( settings.fetch_workers, 8 );
        assert_eq!( settings.player_program, "/opt/mpv" );
        assert_eq!( settings.extractor_program, "yt-dlp" );
        assert_eq!( settings.catalog_base, "https://soundcloud.com/" );
        assert_eq!( settings.volume, 100 );
    }


    #[test]
    fn test_malformed_file_is_ignored() {
        assert_eq!( Settings::parse( "{ not json" ), Settings::default() );
    }


    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load( Some( dir.path().join( "absent.json" ).as_path() ) );
        assert_eq!( settings, Settings::default() );
    }


    #[test]
    fn test_load_reads_given_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "settings.json" );
        std::fs::write( &path, r#"{ "volume": 60 }"# ).unwrap();
        assert_eq!( Settings::load( Some( path.as_path() ) ).volume, 60 );
    }


    #[test]
    fn test_zero_workers_is_raised() {
        assert_eq!( Settings::parse( r#"{ "fetch_workers": 0 }"# ).fetch_workers, 1 );
    }
}
