//! Metadata extraction through `yt-dlp`.
//!
//! Each call runs the extractor once with `-J` and parses the JSON dump it
//! prints. Calls block; the fetch pool keeps them off the UI thread.

use std::process::{ Command, Output, Stdio };
use std::sync::{ Arc, PoisonError, RwLock };

use soundground_core::metadata::catalog_url;
use soundground_core::{ Credentials, ExtractError, MetadataSource, TrackInfo };


/// [`MetadataSource`] backed by an external `yt-dlp` executable.
pub struct YtDlp {
    program: String,
    catalog_base: String,
    credentials: Arc<RwLock<Credentials>>,
}


impl YtDlp {
    /// @param program - Executable name or path
    /// @param catalog_base - Prefix for catalog paths that are not full URLs
    /// @param credentials - Login passed along when present
    pub fn new(
        program: impl Into<String>,
        catalog_base: impl Into<String>,
        credentials: Arc<RwLock<Credentials>>,
    ) -> Self {
        Self {
            program: program.into(),
            catalog_base: catalog_base.into(),
            credentials,
        }
    }


    /// Builds the argument list for one invocation.
    fn get_args( &self, url: &str, flat: bool ) -> Vec<String> {
        let mut args = vec![ "-J".to_string(), "--no-warnings".to_string() ];
        if flat {
            args.push( "--flat-playlist".into() );
        }

        let credentials = self.credentials.read().unwrap_or_else( PoisonError::into_inner );
        if credentials.is_logged_in() {
            args.extend([
                "--username".to_string(),
                credentials.username.clone(),
                "--password".to_string(),
                credentials.password.clone(),
            ]);
        }

        args.push( catalog_url( &self.catalog_base, url ) );
        args
    }


    fn dump( &self, url: &str, flat: bool ) -> Result<TrackInfo, ExtractError> {
        tracing::debug!( "Running {} for {} (flat: {})", self.program, url, flat );

        let output = Command::new( &self.program )
            .args( self.get_args( url, flat ) )
            .stdin( Stdio::null() )
            .output()
            .map_err( |e| ExtractError::Unavailable( format!( "{}: {}", self.program, e ) ) )?;

        parse_output( &output )
    }
}


impl MetadataSource for YtDlp {
    fn extract( &self, url: &str ) -> Result<TrackInfo, ExtractError> {
        self.dump( url, false )
    }


    fn list( &self, url: &str ) -> Result<Vec<String>, ExtractError> {
        let info = self.dump( url, true )?;
        if info.entries.is_some() {
            return Ok( info.child_urls() );
        }

        // A single track lists as itself.
        let page = info.playable_source()
            .map( str::to_string )
            .unwrap_or_else( || catalog_url( &self.catalog_base, url ) );
        Ok( vec![ page ] )
    }
}


fn parse_output( output: &Output ) -> Result<TrackInfo, ExtractError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy( &output.stderr );
        let message = stderr
            .lines()
            .map( str::trim )
            .filter( |line| !line.is_empty() )
            .last()
            .map( str::to_string )
            .unwrap_or_else( || format!( "Extractor exited with {}", output.status ) );
        return Err( ExtractError::Failed( message ) );
    }

    serde_json::from_slice( &output.stdout ).map_err( |e| ExtractError::Malformed( e.to_string() ) )
}


#[cfg( test )]
mod tests {
    use super::*;


    fn extractor( credentials: Credentials ) -> YtDlp {
        YtDlp::new( "yt-dlp", "https://soundcloud.com/", Arc::new( RwLock::new( credentials ) ) )
    }


    #[test]
    fn test_args_for_anonymous_extract() {
        let args = extractor( Credentials::default() ).get_args( "bob/one", false );
        assert_eq!( args, vec![ "-J", "--no-warnings", "https://soundcloud.com/bob/one" ] );
    }


    #[test]
    fn test_args_for_logged_in_listing() {
        let args = extractor( Credentials::new( "bob", "pw" ) ).get_args( "https://soundcloud.com/bob/likes", true );
        assert_eq!(
            args,
            vec![
                "-J", "--no-warnings", "--flat-playlist",
                "--username", "bob", "--password", "pw",
                "https://soundcloud.com/bob/likes",
            ]
        );
    }


    #[test]
    fn test_missing_program_is_unavailable() {
        let source = YtDlp::new(
            "soundground-no-such-extractor",
            "https://soundcloud.com/",
            Arc::new( RwLock::new( Credentials::default() ) ),
        );
        assert!( matches!( source.extract( "bob/one" ), Err( ExtractError::Unavailable( _ ) ) ) );
    }


    #[cfg( unix )]
    #[test]
    fn test_failure_reports_last_stderr_line() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        let output = Output {
            status: ExitStatus::from_raw( 1 << 8 ),
            stdout: Vec::new(),
            stderr: b"WARNING: something\nERROR: Unable to download JSON metadata\n\n".to_vec(),
        };
        assert_eq!(
            parse_output( &output ),
            Err( ExtractError::Failed( "ERROR: Unable to download JSON metadata".into() ) )
        );
    }


    #[cfg( unix )]
    #[test]
    fn test_parses_dump() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        let output = Output {
            status: ExitStatus::from_raw( 0 ),
            stdout: br#"{"title": "One", "uploader": "Bob", "webpage_url": "https://soundcloud.com/bob/one", "duration": 61.5}"#.to_vec(),
            stderr: Vec::new(),
        };
        let info = parse_output( &output ).unwrap();
        assert_eq!( info.caption(), "Bob - One" );
        assert_eq!( info.duration, Some( 61.5 ) );

        let garbage = Output { stdout: b"not json".to_vec(), ..output };
        assert!( matches!( parse_output( &garbage ), Err( ExtractError::Malformed( _ ) ) ) );
    }
}
