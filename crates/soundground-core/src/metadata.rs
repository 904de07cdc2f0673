//! Remote metadata extraction interface.
//!
//! The extractor itself (network, authentication, catalog format) lives
//! outside the core. The core only needs a synchronous `extract` for single
//! tracks and a shallow `list` for collections.

use serde::Deserialize;
use thiserror::Error;


/// Default catalog prefix for bare paths such as `user/sets/name`.
pub const DEFAULT_CATALOG_BASE: &str = "https://soundcloud.com/";


/// Errors reported by a metadata source.
#[derive( Debug, Clone, Error, PartialEq, Eq )]
pub enum ExtractError {
    #[error( "{0}" )]
    Failed( String ),

    #[error( "Extractor unavailable: {0}" )]
    Unavailable( String ),

    #[error( "Malformed extractor output: {0}" )]
    Malformed( String ),
}


/// A child reference inside a collection result.
#[derive( Debug, Clone, Default, PartialEq, Deserialize )]
pub struct ListingEntry {
    #[serde( default )]
    pub url: Option<String>,

    #[serde( default )]
    pub title: Option<String>,
}


/// Structured metadata for a track or collection.
#[derive( Debug, Clone, Default, PartialEq, Deserialize )]
#[serde( default )]
pub struct TrackInfo {
    pub title: String,
    pub uploader: Option<String>,
    pub webpage_url: Option<String>,
    /// Direct media URL, when the extractor resolved one.
    pub url: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    pub entries: Option<Vec<ListingEntry>>,
}


impl TrackInfo {
    /// Display caption: `uploader - title`.
    ///
    /// Without an uploader the user segment of the page URL stands in
    /// (`https://soundcloud.com/<user>/<track>`), and failing that the title
    /// alone.
    pub fn caption( &self ) -> String {
        let who = self.uploader.clone()
            .filter( |u| !u.is_empty() )
            .or_else( || self.webpage_url.as_deref().and_then( user_from_page_url ) );

        match who {
            Some( who ) => format!( "{} - {}", who, self.title ),
            None => self.title.clone(),
        }
    }


    /// The identifier a player should be given for this track.
    pub fn playable_source( &self ) -> Option<&str> {
        self.webpage_url.as_deref().or( self.url.as_deref() )
    }


    /// Child URLs of a collection, skipping children without one.
    pub fn child_urls( &self ) -> Vec<String> {
        self.entries.iter()
            .flatten()
            .filter_map( |e| e.url.clone() )
            .collect()
    }
}


fn user_from_page_url( url: &str ) -> Option<String> {
    url.split( '/' )
        .nth( 3 )
        .filter( |s| !s.is_empty() )
        .map( str::to_string )
}


/// Prefixes `base` onto catalog paths that are not already absolute URLs.
pub fn catalog_url( base: &str, path: &str ) -> String {
    if path.starts_with( "https://" ) || path.starts_with( "http://" ) {
        path.to_string()
    } else {
        format!( "{}{}", base, path.trim_start_matches( '/' ) )
    }
}


/// Source of remote metadata.
///
/// Both calls block the current thread; the fetch pool runs them on
/// blocking threads so the UI never waits on the network.
pub trait MetadataSource: Send + Sync {
    /// Fully resolves a single URL.
    fn extract( &self, url: &str ) -> Result<TrackInfo, ExtractError>;

    /// Lists the child URLs of a collection without resolving each child.
    fn list( &self, url: &str ) -> Result<Vec<String>, ExtractError>;
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_caption_with_uploader() {
        let info = TrackInfo {
            title: "Night Drive".into(),
            uploader: Some( "Bob".into() ),
            ..Default::default()
        };
        assert_eq!( info.caption(), "Bob - Night Drive" );
    }


    #[test]
    fn test_caption_falls_back_to_page_user() {
        let info = TrackInfo {
            title: "Night Drive".into(),
            webpage_url: Some( "https://soundcloud.com/bobby/night-drive".into() ),
            ..Default::default()
        };
        assert_eq!( info.caption(), "bobby - Night Drive" );
    }


    #[test]
    fn test_caption_title_only() {
        let info = TrackInfo { title: "Loose".into(), ..Default::default() };
        assert_eq!( info.caption(), "Loose" );
    }


    #[test]
    fn test_catalog_url() {
        assert_eq!( catalog_url( DEFAULT_CATALOG_BASE, "bob/likes" ), "https://soundcloud.com/bob/likes" );
        assert_eq!( catalog_url( DEFAULT_CATALOG_BASE, "https://x.org/a" ), "https://x.org/a" );
    }


    #[test]
    fn test_deserialize_extractor_json() {
        let json = r#"{
            "title": "Sets",
            "uploader": null,
            "webpage_url": "https://soundcloud.com/bob/sets/a",
            "entries": [ { "url": "https://soundcloud.com/bob/one" }, { "title": "no url" } ],
            "extractor": "soundcloud:set"
        }"#;
        let info: TrackInfo = serde_json::from_str( json ).unwrap();
        assert_eq!( info.child_urls(), vec![ "https://soundcloud.com/bob/one".to_string() ] );
        assert_eq!( info.caption(), "bob - Sets" );
    }
}
