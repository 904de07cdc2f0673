//! Pane geometry.
//!
//! Panes are placed with [`LayoutValue`]s that mix absolute cell counts with
//! percentages of the terminal size, so a single description adapts to any
//! terminal. Every resize recomputes the geometry from scratch.

use ratatui::buffer::Buffer;
use ratatui::layout::{ Position, Rect };
use ratatui::style::Style;


/// A coordinate or extent, either fixed or relative to the terminal.
#[derive( Debug, Clone, Copy, PartialEq )]
pub struct LayoutValue {
    magnitude: f64,
    bias: i32,
    relative: bool,
}


impl LayoutValue {
    /// An absolute number of cells.
    pub fn fixed( cells: i32 ) -> Self {
        Self { magnitude: cells as f64, bias: 0, relative: false }
    }


    /// A percentage of the parent extent.
    pub fn percent( percent: f64 ) -> Self {
        Self { magnitude: percent, bias: 0, relative: true }
    }


    /// Adds a cell offset applied after resolving a percentage. Fixed
    /// values ignore it.
    pub fn offset( self, bias: i32 ) -> Self {
        Self { bias, ..self }
    }


    /// Resolves against `extent` cells.
    ///
    /// Relative values yield `round(magnitude / 100 * extent) + bias`,
    /// fixed ones `round(magnitude)`. The result may be negative or exceed
    /// the extent; clamping is the pane's job.
    pub fn resolve( &self, extent: u16 ) -> i32 {
        if self.relative {
            let base = ( self.magnitude / 100.0 * f64::from( extent ) ).round();
            ( base as i32 ).saturating_add( self.bias )
        } else {
            self.magnitude.round() as i32
        }
    }
}


impl From<i32> for LayoutValue {
    fn from( cells: i32 ) -> Self {
        Self::fixed( cells )
    }
}


/// Rectangular region of the terminal with its own drawing surface.
#[derive( Debug, Clone )]
pub struct Pane {
    y: LayoutValue,
    x: LayoutValue,
    h: LayoutValue,
    w: LayoutValue,
    area: Rect,
    surface: Buffer,
}


impl Pane {
    pub fn new( y: LayoutValue, x: LayoutValue, h: LayoutValue, w: LayoutValue ) -> Self {
        Self {
            y,
            x,
            h,
            w,
            area: Rect::default(),
            surface: Buffer::empty( Rect::new( 0, 0, 1, 1 ) ),
        }
    }


    /// Recomputes the pane's area for a terminal of `height` x `width`.
    ///
    /// The result is clamped inside the terminal. A zero-sized result is
    /// kept as an empty area backed by a 1x1 surface, so drawing on it is
    /// harmless and the compositor skips it. The surface is replaced in one
    /// step; callers never see old and new geometry mixed.
    pub fn compute_geometry( &mut self, height: u16, width: u16 ) {
        let y = self.y.resolve( height ).clamp( 0, i32::from( height ) );
        let x = self.x.resolve( width ).clamp( 0, i32::from( width ) );
        let h = self.h.resolve( height ).clamp( 0, i32::from( height ) - y );
        let w = self.w.resolve( width ).clamp( 0, i32::from( width ) - x );

        // All four values are within 0..=u16::MAX after clamping.
        let area = Rect::new( x as u16, y as u16, w as u16, h as u16 );
        let surface_area = if area.is_empty() {
            Rect::new( area.x, area.y, 1, 1 )
        } else {
            area
        };

        self.surface = Buffer::empty( surface_area );
        self.area = area;
    }


    /// Screen area covered by the pane. Empty when collapsed.
    pub fn area( &self ) -> Rect {
        self.area
    }


    pub fn height( &self ) -> u16 {
        self.area.height
    }


    pub fn surface( &self ) -> &Buffer {
        &self.surface
    }


    /// Blanks the surface.
    pub fn clear( &mut self ) {
        self.surface.reset();
    }


    /// Writes `text` on pane row `row`, styling the whole row with `style`.
    ///
    /// Text wider than the pane is truncated. Rows outside the pane are not
    /// written and return false.
    pub fn put_line( &mut self, row: u16, text: &str, style: Style ) -> bool {
        if row >= self.area.height || self.area.width == 0 {
            return false;
        }

        let y = self.area.y + row;
        if !self.surface.area.contains( Position::new( self.area.x, y ) ) {
            return false;
        }

        let line = Rect::new( self.area.x, y, self.area.width, 1 );
        self.surface.set_style( line, style );
        self.surface.set_stringn( self.area.x, y, text, usize::from( self.area.width ), style );
        true
    }


    /// Restyles the single cell at pane-relative `row`, `col`.
    pub fn style_cell( &mut self, row: u16, col: u16, style: Style ) -> bool {
        if row >= self.area.height || col >= self.area.width {
            return false;
        }

        let position = Position::new( self.area.x + col, self.area.y + row );
        match self.surface.cell_mut( position ) {
            Some( cell ) => {
                cell.set_style( style );
                true
            }
            None => false,
        }
    }
}


#[cfg( test )]
pub( crate ) fn row_text( buf: &Buffer, y: u16 ) -> String {
    let area = buf.area;
    ( area.x..area.x + area.width )
        .filter_map( |x| buf.cell( Position::new( x, y ) ) )
        .map( |cell| cell.symbol() )
        .collect()
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_resolve_fixed_and_relative() {
        assert_eq!( LayoutValue::fixed( 3 ).resolve( 80 ), 3 );
        assert_eq!( LayoutValue::percent( 50.0 ).resolve( 81 ), 41 );
        assert_eq!( LayoutValue::percent( 100.0 ).offset( -2 ).resolve( 24 ), 22 );
        assert_eq!( LayoutValue::from( 7 ).resolve( 0 ), 7 );
    }


    #[test]
    fn test_fixed_value_ignores_offset() {
        assert_eq!( LayoutValue::fixed( 3 ).offset( 2 ).resolve( 80 ), 3 );
        assert_eq!( LayoutValue::fixed( -4 ).offset( 10 ).resolve( 0 ), -4 );
        assert_eq!( LayoutValue::percent( 0.0 ).offset( 2 ).resolve( 80 ), 2 );
    }


    #[test]
    fn test_resolve_is_idempotent() {
        let value = LayoutValue::percent( 33.3 ).offset( 1 );
        for extent in [ 0, 1, 17, 80, 200, u16::MAX ] {
            assert_eq!( value.resolve( extent ), value.resolve( extent ) );
        }
    }


    #[test]
    fn test_geometry_is_clamped_inside_terminal() {
        let mut pane = Pane::new(
            LayoutValue::percent( 90.0 ),
            LayoutValue::fixed( -4 ),
            LayoutValue::percent( 50.0 ),
            LayoutValue::percent( 150.0 ),
        );
        pane.compute_geometry( 20, 40 );

        let area = pane.area();
        assert_eq!( area.y, 18 );
        assert_eq!( area.x, 0 );
        assert_eq!( area.height, 2 );
        assert_eq!( area.width, 40 );
        assert_eq!( pane.surface().area, area );
    }


    #[test]
    fn test_zero_size_collapses_without_panic() {
        let mut pane = Pane::new(
            LayoutValue::fixed( 0 ),
            LayoutValue::fixed( 0 ),
            LayoutValue::fixed( 0 ),
            LayoutValue::percent( 100.0 ),
        );
        pane.compute_geometry( 10, 10 );

        assert!( pane.area().is_empty() );
        assert_eq!( pane.surface().area, Rect::new( 0, 0, 1, 1 ) );
        assert!( !pane.put_line( 0, "clipped", Style::default() ) );
    }


    #[test]
    fn test_recompute_on_resize() {
        let mut pane = Pane::new(
            LayoutValue::percent( 100.0 ).offset( -1 ),
            LayoutValue::fixed( 0 ),
            LayoutValue::fixed( 1 ),
            LayoutValue::percent( 100.0 ),
        );
        pane.compute_geometry( 24, 80 );
        assert_eq!( pane.area(), Rect::new( 0, 23, 80, 1 ) );

        pane.compute_geometry( 10, 30 );
        assert_eq!( pane.area(), Rect::new( 0, 9, 30, 1 ) );
    }


    #[test]
    fn test_put_line_truncates_and_clips_rows() {
        let mut pane = Pane::new(
            LayoutValue::fixed( 1 ),
            LayoutValue::fixed( 2 ),
            LayoutValue::fixed( 2 ),
            LayoutValue::fixed( 5 ),
        );
        pane.compute_geometry( 10, 10 );

        assert!( pane.put_line( 1, "abcdefgh", Style::default() ) );
        assert_eq!( row_text( pane.surface(), 2 ), "abcde" );
        assert!( !pane.put_line( 2, "off the end", Style::default() ) );
    }
}
