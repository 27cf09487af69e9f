//! The graphics context contract and a recording test double.
//!
//! Painting operators delegate here; the core never inspects raster pixels.
//! A real backend rasterizes, walks TrueType outlines, and measures text.
//! `RecordingDevice` mirrors enough state to answer the query operators and
//! logs every drawing call for inspection.

use crate::matrix::{Matrix, Point};

/// What `setfont` hands the backend: the font's name, its effective matrix,
/// and a handle into the interpreter's parsed-font collection when the font
/// carried an sfnt program
#[derive(Debug, Clone, PartialEq)]
pub struct FontInfo {
    pub name: Vec<u8>,
    pub matrix: Matrix,
    pub font_id: Option<i64>,
}

/// Abstract capability set supplied by an external backend
pub trait GraphicsContext {
    fn save(&mut self);
    fn restore(&mut self);

    fn transformation_matrix(&self) -> Matrix;
    fn set_transformation_matrix(&mut self, m: Matrix);
    fn concat(&mut self, m: Matrix);

    fn line_width(&self) -> f64;
    fn set_line_width(&mut self, width: f64);
    fn line_cap(&self) -> i64;
    fn set_line_cap(&mut self, cap: i64);
    fn line_join(&self) -> i64;
    fn set_line_join(&mut self, join: i64);
    fn miter_limit(&self) -> f64;
    fn set_miter_limit(&mut self, limit: f64);
    fn dash(&self) -> (Vec<f64>, f64);
    fn set_dash(&mut self, pattern: Vec<f64>, offset: f64);

    /// Components are already clamped to [0, 1]
    fn set_rgb_color(&mut self, r: f64, g: f64, b: f64);
    fn rgb_color(&self) -> (f64, f64, f64);

    fn new_path(&mut self);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);
    fn bezier_curve_to(&mut self, c1: Point, c2: Point, end: Point);
    /// Angles in degrees, counterclockwise from the positive x axis
    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64, anticlockwise: bool);
    fn close_path(&mut self);
    fn current_point(&self) -> Option<Point>;

    fn stroke(&mut self);
    fn fill(&mut self);
    fn eo_fill(&mut self);
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn clip(&mut self);
    fn even_odd_clip(&mut self);
    fn rect_clip(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn set_font(&mut self, font: &FontInfo);
    fn fill_text(&mut self, text: &[u8], at: Point);
    fn char_path(&mut self, text: &[u8], at: Point);
    fn string_width(&self, text: &[u8]) -> f64;
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Save,
    Restore,
    SetMatrix(Matrix),
    Concat(Matrix),
    NewPath,
    MoveTo(Point),
    LineTo(Point),
    BezierCurveTo(Point, Point, Point),
    Arc {
        center: Point,
        radius: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    },
    ClosePath,
    Stroke,
    Fill,
    EoFill,
    StrokeRect(f64, f64, f64, f64),
    FillRect(f64, f64, f64, f64),
    Clip,
    EvenOddClip,
    RectClip(f64, f64, f64, f64),
    SetRgbColor(f64, f64, f64),
    SetFont(Vec<u8>),
    FillText(Vec<u8>, Point),
    CharPath(Vec<u8>, Point),
}

#[derive(Debug, Clone)]
struct DeviceState {
    ctm: Matrix,
    line_width: f64,
    line_cap: i64,
    line_join: i64,
    miter_limit: f64,
    dash: (Vec<f64>, f64),
    rgb: (f64, f64, f64),
    font: Option<FontInfo>,
    current_point: Option<Point>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            ctm: Matrix::identity(),
            line_width: 1.0,
            line_cap: 0,
            line_join: 0,
            miter_limit: 10.0,
            dash: (Vec::new(), 0.0),
            rgb: (0.0, 0.0, 0.0),
            font: None,
            current_point: None,
        }
    }
}

/// A backend that records calls instead of rasterizing. Text metrics are
/// nominal: each glyph advances 0.6 em through the font matrix
#[derive(Debug, Default)]
pub struct RecordingDevice {
    state: DeviceState,
    saved: Vec<DeviceState>,
    pub calls: Vec<DeviceCall>,
}

const NOMINAL_GLYPH_ADVANCE: f64 = 0.6;

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn font(&self) -> Option<&FontInfo> {
        self.state.font.as_ref()
    }
}

impl GraphicsContext for RecordingDevice {
    fn save(&mut self) {
        self.saved.push(self.state.clone());
        self.calls.push(DeviceCall::Save);
    }

    fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
        self.calls.push(DeviceCall::Restore);
    }

    fn transformation_matrix(&self) -> Matrix {
        self.state.ctm
    }

    fn set_transformation_matrix(&mut self, m: Matrix) {
        self.state.ctm = m;
        self.calls.push(DeviceCall::SetMatrix(m));
    }

    fn concat(&mut self, m: Matrix) {
        self.state.ctm = m.multiply(self.state.ctm);
        self.calls.push(DeviceCall::Concat(m));
    }

    fn line_width(&self) -> f64 {
        self.state.line_width
    }

    fn set_line_width(&mut self, width: f64) {
        self.state.line_width = width;
    }

    fn line_cap(&self) -> i64 {
        self.state.line_cap
    }

    fn set_line_cap(&mut self, cap: i64) {
        self.state.line_cap = cap;
    }

    fn line_join(&self) -> i64 {
        self.state.line_join
    }

    fn set_line_join(&mut self, join: i64) {
        self.state.line_join = join;
    }

    fn miter_limit(&self) -> f64 {
        self.state.miter_limit
    }

    fn set_miter_limit(&mut self, limit: f64) {
        self.state.miter_limit = limit;
    }

    fn dash(&self) -> (Vec<f64>, f64) {
        self.state.dash.clone()
    }

    fn set_dash(&mut self, pattern: Vec<f64>, offset: f64) {
        self.state.dash = (pattern, offset);
    }

    fn set_rgb_color(&mut self, r: f64, g: f64, b: f64) {
        self.state.rgb = (r, g, b);
        self.calls.push(DeviceCall::SetRgbColor(r, g, b));
    }

    fn rgb_color(&self) -> (f64, f64, f64) {
        self.state.rgb
    }

    fn new_path(&mut self) {
        self.state.current_point = None;
        self.calls.push(DeviceCall::NewPath);
    }

    fn move_to(&mut self, p: Point) {
        self.state.current_point = Some(p);
        self.calls.push(DeviceCall::MoveTo(p));
    }

    fn line_to(&mut self, p: Point) {
        self.state.current_point = Some(p);
        self.calls.push(DeviceCall::LineTo(p));
    }

    fn bezier_curve_to(&mut self, c1: Point, c2: Point, end: Point) {
        self.state.current_point = Some(end);
        self.calls.push(DeviceCall::BezierCurveTo(c1, c2, end));
    }

    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64, anticlockwise: bool) {
        let (sin, cos) = end.to_radians().sin_cos();
        self.state.current_point = Some(Point::new(
            center.x + radius * cos,
            center.y + radius * sin,
        ));
        self.calls.push(DeviceCall::Arc {
            center,
            radius,
            start,
            end,
            anticlockwise,
        });
    }

    fn close_path(&mut self) {
        self.calls.push(DeviceCall::ClosePath);
    }

    fn current_point(&self) -> Option<Point> {
        self.state.current_point
    }

    fn stroke(&mut self) {
        self.state.current_point = None;
        self.calls.push(DeviceCall::Stroke);
    }

    fn fill(&mut self) {
        self.state.current_point = None;
        self.calls.push(DeviceCall::Fill);
    }

    fn eo_fill(&mut self) {
        self.state.current_point = None;
        self.calls.push(DeviceCall::EoFill);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(DeviceCall::StrokeRect(x, y, width, height));
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(DeviceCall::FillRect(x, y, width, height));
    }

    fn clip(&mut self) {
        self.calls.push(DeviceCall::Clip);
    }

    fn even_odd_clip(&mut self) {
        self.calls.push(DeviceCall::EvenOddClip);
    }

    fn rect_clip(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(DeviceCall::RectClip(x, y, width, height));
    }

    fn set_font(&mut self, font: &FontInfo) {
        self.state.font = Some(font.clone());
        self.calls.push(DeviceCall::SetFont(font.name.clone()));
    }

    fn fill_text(&mut self, text: &[u8], at: Point) {
        let advance = self.string_width(text);
        self.state.current_point = Some(Point::new(at.x + advance, at.y));
        self.calls.push(DeviceCall::FillText(text.to_vec(), at));
    }

    fn char_path(&mut self, text: &[u8], at: Point) {
        let advance = self.string_width(text);
        self.state.current_point = Some(Point::new(at.x + advance, at.y));
        self.calls.push(DeviceCall::CharPath(text.to_vec(), at));
    }

    fn string_width(&self, text: &[u8]) -> f64 {
        let em = self
            .state
            .font
            .as_ref()
            .map_or(1.0, |font| font.matrix.a * 1000.0);

        text.len() as f64 * NOMINAL_GLYPH_ADVANCE * em
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn save_restore_round_trips_state() {
        let mut device = RecordingDevice::new();

        device.set_line_width(4.0);
        device.save();
        device.set_line_width(9.0);
        device.restore();

        assert_eq!(device.line_width(), 4.0);
    }

    #[test]
    fn concat_composes_with_ctm() {
        let mut device = RecordingDevice::new();

        device.set_transformation_matrix(Matrix::translation(5.0, 0.0));
        device.concat(Matrix::scaling(2.0, 2.0));

        let p = device.transformation_matrix().apply(Point::new(1.0, 1.0));
        assert_eq!(p, Point::new(7.0, 2.0));
    }

    #[test]
    fn path_calls_track_current_point() {
        let mut device = RecordingDevice::new();

        assert_eq!(device.current_point(), None);

        device.move_to(Point::new(1.0, 2.0));
        device.line_to(Point::new(3.0, 4.0));

        assert_eq!(device.current_point(), Some(Point::new(3.0, 4.0)));
        assert_eq!(
            device.calls,
            vec![
                DeviceCall::MoveTo(Point::new(1.0, 2.0)),
                DeviceCall::LineTo(Point::new(3.0, 4.0)),
            ]
        );
    }

    #[test]
    fn fill_text_advances_current_point() {
        let mut device = RecordingDevice::new();

        device.set_font(&FontInfo {
            name: b"Nominal".to_vec(),
            matrix: Matrix::scaling(0.012, 0.012),
            font_id: None,
        });
        device.fill_text(b"ab", Point::new(10.0, 10.0));

        let p = device.current_point().unwrap();
        assert!((p.x - (10.0 + 2.0 * 0.6 * 12.0)).abs() < 1e-9);
        assert_eq!(p.y, 10.0);
    }
}
