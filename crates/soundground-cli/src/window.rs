//! Window group: named panes composited onto one screen.
//!
//! Widgets draw into their pane's private surface. [`WindowGroup::draw`]
//! then copies every surface into ratatui's back buffer, lets overlays paint
//! on top, and flushes the whole frame once, so no pane is ever shown
//! half-drawn.

use std::io;

use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::{ Position, Rect, Size };
use ratatui::style::{ Modifier, Style };
use ratatui::Terminal;
use thiserror::Error;
use unicode_width::UnicodeWidthStr;

use crate::layout::{ LayoutValue, Pane };


/// Errors raised while building the layout.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum LayoutError {
    #[error( "Pane `{0}` already exists" )]
    DuplicatePane( String ),
}


/// Something painted directly onto the composed screen after all panes.
pub trait Overlay {
    fn draw( &self, buf: &mut Buffer );
}


/// Owns the panes and overlays that make up the screen.
pub struct WindowGroup {
    panes: Vec<( String, Pane )>,
    overlays: Vec<Box<dyn Overlay>>,
    size: Size,
}


impl WindowGroup {
    /// Creates an empty group for a terminal of the given size.
    pub fn new( size: Size ) -> Self {
        Self {
            panes: Vec::new(),
            overlays: Vec::new(),
            size,
        }
    }


    /// Registers a pane and lays it out for the current size.
    ///
    /// Panes registered later draw over earlier ones.
    pub fn create_pane(
        &mut self,
        name: &str,
        y: LayoutValue,
        x: LayoutValue,
        h: LayoutValue,
        w: LayoutValue,
    ) -> Result<(), LayoutError> {
        if self.pane( name ).is_some() {
            return Err( LayoutError::DuplicatePane( name.to_string() ) );
        }

        let mut pane = Pane::new( y, x, h, w );
        pane.compute_geometry( self.size.height, self.size.width );
        self.panes.push(( name.to_string(), pane ));
        Ok(())
    }


    /// Registers an overlay, drawn after all panes in registration order.
    pub fn add_overlay( &mut self, overlay: impl Overlay + 'static ) {
        self.overlays.push( Box::new( overlay ) );
    }


    pub fn pane( &self, name: &str ) -> Option<&Pane> {
        self.panes.iter().find( |( n, _ )| n == name ).map( |( _, p )| p )
    }


    pub fn pane_mut( &mut self, name: &str ) -> Option<&mut Pane> {
        self.panes.iter_mut().find( |( n, _ )| n == name ).map( |( _, p )| p )
    }


    /// Recomputes every pane for a new terminal size.
    ///
    /// Pane surfaces come back blank; widgets must repaint them.
    pub fn relayout( &mut self, size: Size ) {
        self.size = size;
        for ( _, pane ) in &mut self.panes {
            pane.compute_geometry( size.height, size.width );
        }
        tracing::debug!( "Relayout to {}x{}", size.width, size.height );
    }


    /// Re-reads the terminal size, lays out again and redraws everything.
    ///
    /// `repaint` runs between layout and compositing so widgets can fill
    /// their fresh surfaces.
    pub fn resize<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        repaint: impl FnOnce( &mut Self ),
    ) -> io::Result<()> {
        let size = terminal.size()?;
        self.relayout( size );
        terminal.resize( Rect::new( 0, 0, size.width, size.height ) )?;
        repaint( self );
        self.draw( terminal )
    }


    /// Copies pane surfaces and overlays into `buf`.
    pub fn composite( &self, buf: &mut Buffer ) {
        for ( _, pane ) in &self.panes {
            let area = pane.area().intersection( buf.area );
            if area.is_empty() {
                continue;
            }

            let surface = pane.surface();
            for y in area.top()..area.bottom() {
                for x in area.left()..area.right() {
                    let position = Position::new( x, y );
                    if let ( Some( src ), Some( dst ) ) = ( surface.cell( position ), buf.cell_mut( position ) ) {
                        *dst = src.clone();
                    }
                }
            }
        }

        for overlay in &self.overlays {
            overlay.draw( buf );
        }
    }


    /// Composites the screen and flushes it in one terminal update.
    pub fn draw<B: Backend>( &self, terminal: &mut Terminal<B> ) -> io::Result<()> {
        terminal.draw( |frame| self.composite( frame.buffer_mut() ) )?;
        Ok(())
    }
}


/// Centered application title on the top row.
#[derive( Debug )]
pub struct TitleBar {
    text: String,
}


impl TitleBar {
    pub fn new() -> Self {
        Self { text: format!( "Soundground v{}", env!( "CARGO_PKG_VERSION" ) ) }
    }
}


impl Overlay for TitleBar {
    fn draw( &self, buf: &mut Buffer ) {
        let area = buf.area;
        if area.is_empty() {
            return;
        }

        let width = u16::try_from( self.text.width() ).unwrap_or( u16::MAX );
        let x = area.x + area.width.saturating_sub( width ) / 2;
        buf.set_stringn(
            x,
            area.y,
            &self.text,
            usize::from( area.right() - x ),
            Style::default().add_modifier( Modifier::BOLD ),
        );
    }
}


#[cfg( test )]
mod tests {
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::layout::row_text;


    fn full() -> LayoutValue {
        LayoutValue::percent( 100.0 )
    }


    struct Stamp( &'static str );

    impl Overlay for Stamp {
        fn draw( &self, buf: &mut Buffer ) {
            buf.set_string( 0, 0, self.0, Style::default() );
        }
    }


    #[test]
    fn test_duplicate_pane_is_rejected() {
        let mut group = WindowGroup::new( Size::new( 20, 5 ) );
        group.create_pane( "main", 0.into(), 0.into(), full(), full() ).unwrap();

        let err = group.create_pane( "main", 1.into(), 0.into(), 1.into(), full() ).unwrap_err();
        assert_eq!( err, LayoutError::DuplicatePane( "main".into() ) );
    }


    #[test]
    fn test_pane_laid_out_on_creation() {
        let mut group = WindowGroup::new( Size::new( 40, 10 ) );
        group.create_pane( "status", full().offset( -1 ), 0.into(), 1.into(), full() ).unwrap();
        assert_eq!( group.pane( "status" ).unwrap().area(), Rect::new( 0, 9, 40, 1 ) );
    }


    #[test]
    fn test_later_panes_draw_on_top() {
        let backend = TestBackend::new( 10, 3 );
        let mut terminal = Terminal::new( backend ).unwrap();
        let mut group = WindowGroup::new( Size::new( 10, 3 ) );
        group.create_pane( "under", 0.into(), 0.into(), full(), full() ).unwrap();
        group.create_pane( "over", 1.into(), 5.into(), 1.into(), 5.into() ).unwrap();

        group.pane_mut( "under" ).unwrap().put_line( 1, "aaaaaaaaaa", Style::default() );
        group.pane_mut( "over" ).unwrap().put_line( 0, "bbbbb", Style::default() );
        group.draw( &mut terminal ).unwrap();

        assert_eq!( row_text( terminal.backend().buffer(), 1 ), "aaaaabbbbb" );
    }


    #[test]
    fn test_overlays_draw_after_panes() {
        let backend = TestBackend::new( 10, 2 );
        let mut terminal = Terminal::new( backend ).unwrap();
        let mut group = WindowGroup::new( Size::new( 10, 2 ) );
        group.create_pane( "main", 0.into(), 0.into(), full(), full() ).unwrap();
        group.add_overlay( Stamp( "XY" ) );

        group.pane_mut( "main" ).unwrap().put_line( 0, "0123456789", Style::default() );
        group.draw( &mut terminal ).unwrap();

        assert_eq!( row_text( terminal.backend().buffer(), 0 ), "XY23456789" );
    }


    #[test]
    fn test_resize_recomputes_and_repaints() {
        let backend = TestBackend::new( 20, 6 );
        let mut terminal = Terminal::new( backend ).unwrap();
        let mut group = WindowGroup::new( Size::new( 20, 6 ) );
        group.create_pane( "status", full().offset( -1 ), 0.into(), 1.into(), full() ).unwrap();

        terminal.backend_mut().resize( 12, 4 );
        group.resize( &mut terminal, |group| {
            group.pane_mut( "status" ).unwrap().put_line( 0, "ready", Style::default() );
        }).unwrap();

        assert_eq!( group.size, Size::new( 12, 4 ) );
        assert_eq!( group.pane( "status" ).unwrap().area(), Rect::new( 0, 3, 12, 1 ) );
        assert_eq!( row_text( terminal.backend().buffer(), 3 ), "ready       " );
    }


    #[test]
    fn test_collapsed_pane_is_skipped() {
        let backend = TestBackend::new( 8, 2 );
        let mut terminal = Terminal::new( backend ).unwrap();
        let mut group = WindowGroup::new( Size::new( 8, 2 ) );
        group.create_pane( "gone", 0.into(), 0.into(), 0.into(), 0.into() ).unwrap();
        group.draw( &mut terminal ).unwrap();

        assert_eq!( row_text( terminal.backend().buffer(), 0 ), "        " );
    }


    #[test]
    fn test_title_is_centered() {
        let mut buf = Buffer::empty( Rect::new( 0, 0, 40, 1 ) );
        let title = TitleBar::new();
        title.draw( &mut buf );

        let row = row_text( &buf, 0 );
        let start = row.find( "Soundground v" ).unwrap();
        let end = start + title.text.len();
        assert!( ( start as i32 - ( 40 - end ) as i32 ).abs() <= 1 );
    }
}
