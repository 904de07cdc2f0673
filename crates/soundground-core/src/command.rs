//! Command line parsing.
//!
//! Commands are typed at the `:` prompt and routed by the first
//! whitespace-delimited token. The vocabulary is fixed; anything else is
//! reported back to the user as an unknown command.

use thiserror::Error;


/// Errors that can occur while parsing a command line.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum CommandError {
    #[error( "Unknown command `{0}`" )]
    Unknown( String ),

    #[error( "Missing argument: {0}" )]
    MissingArgument( String ),
}


/// Parsed command.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum Command {
    Quit,
    PlayUrl { url: String },
    Login,
    Logout,
    List { path: String },
}


impl Command {
    /// Parses a command line.
    ///
    /// Leading `:` (as echoed by the prompt) and surrounding whitespace are
    /// ignored. Extra arguments after the ones a command needs are dropped.
    ///
    /// @param input - The command line to parse
    ///
    /// @returns The parsed command or an error
    pub fn parse( input: &str ) -> Result<Self, CommandError> {
        let input = input.trim().trim_start_matches( ':' );
        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or( "" );
        let arg = parts.next();

        match cmd {
            "quit" | "q" => Ok( Command::Quit ),
            "playurl" => {
                let url = arg
                    .ok_or_else( || CommandError::MissingArgument( "url".into() ) )?;
                Ok( Command::PlayUrl { url: url.to_string() } )
            }
            "login" => Ok( Command::Login ),
            "logout" => Ok( Command::Logout ),
            "list" => {
                let path = arg
                    .ok_or_else( || CommandError::MissingArgument( "list path".into() ) )?;
                Ok( Command::List { path: path.to_string() } )
            }

            "" => Err( CommandError::Unknown( String::new() ) ),
            other => Err( CommandError::Unknown( other.to_string() ) ),
        }
    }
}


/// Expands a `you/...` list path to the logged-in user's path.
///
/// Returns `None` when the path refers to the current user but nobody is
/// logged in. Other paths are returned unchanged.
pub fn expand_list_path( path: &str, username: Option<&str> ) -> Option<String> {
    match path.strip_prefix( "you/" ) {
        Some( rest ) => username
            .filter( |u| !u.is_empty() )
            .map( |u| format!( "{}/{}", u, rest ) ),
        None => Some( path.to_string() ),
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_quit_alias() {
        assert_eq!( Command::parse( "q" ).unwrap(), Command::Quit );
        assert_eq!( Command::parse( ":quit" ).unwrap(), Command::Quit );
    }


    #[test]
    fn test_parse_playurl() {
        let cmd = Command::parse( "playurl https://example.com/a.mp3" ).unwrap();
        assert_eq!( cmd, Command::PlayUrl { url: "https://example.com/a.mp3".into() } );
    }


    #[test]
    fn test_parse_list_extra_whitespace() {
        let cmd = Command::parse( "  list   you/likes  " ).unwrap();
        assert_eq!( cmd, Command::List { path: "you/likes".into() } );
    }


    #[test]
    fn test_parse_unknown() {
        let result = Command::parse( "foobar baz" );
        assert_eq!( result, Err( CommandError::Unknown( "foobar".into() ) ) );
    }


    #[test]
    fn test_parse_missing_arg() {
        let result = Command::parse( "list" );
        assert!( matches!( result, Err( CommandError::MissingArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_empty() {
        assert!( matches!( Command::parse( "   " ), Err( CommandError::Unknown( _ ) ) ) );
    }


    #[test]
    fn test_expand_list_path() {
        assert_eq!( expand_list_path( "you/likes", Some( "bob" ) ), Some( "bob/likes".into() ) );
        assert_eq!( expand_list_path( "you/likes", None ), None );
        assert_eq!( expand_list_path( "you/likes", Some( "" ) ), None );
        assert_eq!( expand_list_path( "alice/sets/x", None ), Some( "alice/sets/x".into() ) );
    }
}
