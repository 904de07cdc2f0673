//! Soundground - terminal dashboard for a SoundCloud catalog

mod app;
mod cli;
mod extractor;
mod input;
mod layout;
mod list;
#[cfg( unix )]
mod mpv;
mod settings;
mod status;
mod window;

#[cfg( test )]
mod test_utils;

use std::fs::{ self, OpenOptions };
use std::io;
use std::path::PathBuf;
use std::sync::{ Arc, Mutex, RwLock };
use std::time::Duration;

use anyhow::{ Context, Result };
use clap::Parser;
use crossterm::{
    terminal::{ disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen },
    ExecutableCommand,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

use soundground_core::{
    CredentialError, CredentialStore, Credentials, JsonCredentialFile, NullPlayback, Playback,
    PlaybackError, RedrawSignal,
};

use app::{ App, Services, Ui };
use cli::Args;
use extractor::YtDlp;
use input::TerminalEvents;
use settings::Settings;


/// Environment variable holding the log filter.
const LOG_ENV: &str = "SOUNDGROUND_LOG";


fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else( std::env::temp_dir )
        .join( "soundground" )
        .join( "soundground.log" )
}


/// Sends tracing output to a file; the terminal belongs to the UI.
fn init_logging( path: Option<PathBuf> ) -> Result<()> {
    let path = path.unwrap_or_else( default_log_path );
    if let Some( parent ) = path.parent() {
        fs::create_dir_all( parent )
            .with_context( || format!( "Failed to create log directory {}", parent.display() ) )?;
    }

    let log_file = OpenOptions::new()
        .create( true )
        .append( true )
        .open( &path )
        .with_context( || format!( "Failed to open log file {}", path.display() ) )?;

    let filter = EnvFilter::try_from_env( LOG_ENV ).unwrap_or_else( |_| EnvFilter::new( "info" ) );
    tracing_subscriber::fmt()
        .with_writer( Mutex::new( log_file ) )
        .with_ansi( false )
        .with_env_filter( filter )
        .init();
    Ok(())
}


/// Loads stored credentials. A missing file means logged out; any other
/// failure is reported and the session starts logged out.
fn load_credentials( store: &dyn CredentialStore, notices: &mut Vec<String> ) -> Credentials {
    match store.load() {
        Ok( credentials ) => credentials,
        Err( CredentialError::NotFound ) => Credentials::default(),
        Err( e ) => {
            tracing::warn!( "Failed to load credentials: {}", e );
            notices.push( format!( "Could not load credentials: {}", e ) );
            Credentials::default()
        }
    }
}


#[cfg( unix )]
fn spawn_player( settings: &Settings ) -> Result<Box<dyn Playback>, PlaybackError> {
    let player = mpv::MpvPlayback::spawn( &settings.player_program, settings.volume )?;
    Ok( Box::new( player ) )
}


#[cfg( not( unix ) )]
fn spawn_player( _settings: &Settings ) -> Result<Box<dyn Playback>, PlaybackError> {
    Err( PlaybackError::Unavailable( "mpv IPC needs a Unix socket".into() ) )
}


fn start_playback( settings: &Settings, notices: &mut Vec<String> ) -> Box<dyn Playback> {
    spawn_player( settings ).unwrap_or_else( |e| {
        tracing::warn!( "Continuing without playback: {}", e );
        notices.push( e.to_string() );
        Box::new( NullPlayback )
    })
}


/// Starts logging, then reads the settings so their warnings are recorded.
fn startup( args: &Args ) -> Result<Settings> {
    init_logging( args.log_file.clone() )?;
    tracing::info!( "Starting soundground v{}", env!( "CARGO_PKG_VERSION" ) );
    Ok( Settings::load( args.config.as_deref() ) )
}


fn run( args: &Args, services: Services, playback: Box<dyn Playback>, runtime: Handle, notices: Vec<String> ) -> Result<()> {
    let redraw = RedrawSignal::new();
    let terminal = Terminal::new( CrosstermBackend::new( io::stdout() ) )?;
    let ui = Ui::new( terminal, TerminalEvents, playback, redraw.clone() )?;
    let mut app = App::new( ui, services, runtime, redraw );

    for notice in notices {
        app.status_mut().notify( notice );
    }
    if let Some( list ) = &args.list {
        app.load_list( list );
    }

    app.run()?;
    Ok(())
}


fn main() -> Result<()> {
    let args = Args::parse();
    let settings = startup( &args )?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context( "Failed to start async runtime" )?;

    let mut notices = Vec::new();
    let store = JsonCredentialFile::new(
        JsonCredentialFile::default_path().unwrap_or_else( || PathBuf::from( "credentials.json" ) ),
    );
    tracing::debug!( "Credentials file: {}", store.path().display() );
    let credentials = Arc::new( RwLock::new( load_credentials( &store, &mut notices ) ) );
    let source = YtDlp::new(
        settings.extractor_program.as_str(),
        settings.catalog_base.as_str(),
        Arc::clone( &credentials ),
    );
    let services = Services {
        store: Box::new( store ),
        credentials,
        source: Arc::new( source ),
        workers: args.workers.unwrap_or( settings.fetch_workers ).max( 1 ),
        catalog_base: settings.catalog_base.clone(),
    };
    let playback = start_playback( &settings, &mut notices );

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute( EnterAlternateScreen )?;

    let result = run( &args, services, playback, runtime.handle().clone(), notices );

    // Cleanup runs even when the app failed.
    let restored = disable_raw_mode()
        .and_then( |()| io::stdout().execute( LeaveAlternateScreen ).map( |_| () ) );

    // Extractor calls still running are abandoned.
    runtime.shutdown_timeout( Duration::from_millis( 500 ) );

    if let Err( e ) = &result {
        tracing::warn!( "Exiting with error: {:#}", e );
    }
    result?;
    restored?;
    tracing::info!( "Exited normally" );
    Ok(())
}


#[cfg( test )]
mod tests {
    use std::ffi::OsString;

    use super::*;


    #[test]
    fn test_settings_warnings_reach_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join( "logs" ).join( "soundground.log" );
        let config = dir.path().join( "settings.json" );
        fs::write( &config, "{ not json" ).unwrap();

        let args = Args::parse_from([
            OsString::from( "soundground" ),
            OsString::from( "--log-file" ),
            log.clone().into_os_string(),
            OsString::from( "--config" ),
            config.clone().into_os_string(),
        ]);
        let settings = startup( &args ).unwrap();
        assert_eq!( settings, Settings::default() );

        let written = fs::read_to_string( &log ).unwrap();
        assert!( written.contains( "Starting soundground" ) );
        assert!( written.contains( "Ignoring malformed settings" ) );
    }
}
