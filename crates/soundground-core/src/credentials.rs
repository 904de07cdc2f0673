//! Catalog credentials and their persistence.

use std::fs;
use std::io;
use std::path::{ Path, PathBuf };

use serde::{ Deserialize, Serialize };
use thiserror::Error;


/// Errors that can occur while loading or saving credentials.
#[derive( Debug, Error )]
pub enum CredentialError {
    #[error( "No stored credentials" )]
    NotFound,

    #[error( "IO error: {0}" )]
    Io( #[from] io::Error ),

    #[error( "Invalid credentials file: {0}" )]
    Format( #[from] serde_json::Error ),
}


/// Username and password pair. Empty username means logged out.
#[derive( Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize )]
pub struct Credentials {
    #[serde( rename = "u", default )]
    pub username: String,

    #[serde( rename = "p", default )]
    pub password: String,
}


impl Credentials {
    pub fn new( username: impl Into<String>, password: impl Into<String> ) -> Self {
        Self { username: username.into(), password: password.into() }
    }


    pub fn is_logged_in( &self ) -> bool {
        !self.username.is_empty()
    }


    /// The username, if logged in.
    pub fn username( &self ) -> Option<&str> {
        Some( self.username.as_str() ).filter( |u| !u.is_empty() )
    }


    pub fn clear( &mut self ) {
        self.username.clear();
        self.password.clear();
    }
}


/// Durable storage for a credential pair.
pub trait CredentialStore {
    fn load( &self ) -> Result<Credentials, CredentialError>;

    fn save( &self, credentials: &Credentials ) -> Result<(), CredentialError>;
}


/// Credentials stored as `{"u": ..., "p": ...}` in a JSON file.
#[derive( Debug, Clone )]
pub struct JsonCredentialFile {
    path: PathBuf,
}


impl JsonCredentialFile {
    pub fn new( path: impl Into<PathBuf> ) -> Self {
        Self { path: path.into() }
    }


    /// Default location: `<config dir>/soundground/credentials.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map( |d| d.join( "soundground" ).join( "credentials.json" ) )
    }


    pub fn path( &self ) -> &Path {
        &self.path
    }
}


impl CredentialStore for JsonCredentialFile {
    fn load( &self ) -> Result<Credentials, CredentialError> {
        let contents = match fs::read_to_string( &self.path ) {
            Ok( c ) => c,
            Err( e ) if e.kind() == io::ErrorKind::NotFound => return Err( CredentialError::NotFound ),
            Err( e ) => return Err( e.into() ),
        };
        Ok( serde_json::from_str( &contents )? )
    }


    fn save( &self, credentials: &Credentials ) -> Result<(), CredentialError> {
        if let Some( parent ) = self.path.parent() {
            fs::create_dir_all( parent )?;
        }
        let json = serde_json::to_string( credentials )?;
        fs::write( &self.path, json )?;
        tracing::debug!( "Saved credentials to {:?}", self.path );
        Ok(())
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCredentialFile::new( dir.path().join( "credentials.json" ) );
        assert!( matches!( store.load(), Err( CredentialError::NotFound ) ) );
    }


    #[test]
    fn test_save_creates_parent_and_uses_short_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "nested" ).join( "credentials.json" );
        let store = JsonCredentialFile::new( &path );

        store.save( &Credentials::new( "bob", "hunter2" ) ).unwrap();

        let raw = fs::read_to_string( &path ).unwrap();
        assert_eq!( raw, r#"{"u":"bob","p":"hunter2"}"# );
        assert_eq!( store.load().unwrap(), Credentials::new( "bob", "hunter2" ) );
    }


    #[test]
    fn test_load_garbage_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "credentials.json" );
        fs::write( &path, "not json" ).unwrap();
        let store = JsonCredentialFile::new( path );
        assert!( matches!( store.load(), Err( CredentialError::Format( _ ) ) ) );
    }


    #[test]
    fn test_logged_out_after_clear() {
        let mut creds = Credentials::new( "bob", "pw" );
        assert_eq!( creds.username(), Some( "bob" ) );
        creds.clear();
        assert!( !creds.is_logged_in() );
        assert_eq!( creds.username(), None );
    }
}
