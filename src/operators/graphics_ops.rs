//! Path construction, painting, graphics state, and coordinate-system
//! operators. All drawing is delegated to the backend's graphics context;
//! the interpreter only mirrors the state it owns (the current font).

use crate::{
    error::{PostScriptError, PsResult},
    interpreter::Interpreter,
    matrix::{Matrix, Point},
    object::{ArraySlice, Object, Value},
};

fn pop_point(interp: &mut Interpreter) -> PsResult<Point> {
    let y = interp.pop_number()?;
    let x = interp.pop_number()?;

    Ok(Point::new(x, y))
}

fn current_point(interp: &Interpreter) -> PsResult<Point> {
    interp
        .ctx
        .current_point()
        .ok_or(anyhow::anyhow!(PostScriptError::NoCurrentPoint))
}

pub(crate) fn matrix_from_slice(interp: &Interpreter, slice: ArraySlice) -> PsResult<Matrix> {
    if slice.len != 6 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let mut values = [0.0f64; 6];

    for (i, value) in values.iter_mut().enumerate() {
        *value = match interp.array_get(slice, i)?.value {
            Value::Integer(n) => n as f64,
            Value::Real(r) => r,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };
    }

    Ok(Matrix::from_array(values))
}

pub(crate) fn write_matrix(
    interp: &mut Interpreter,
    slice: ArraySlice,
    matrix: Matrix,
) -> PsResult<()> {
    if slice.len != 6 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let values = matrix.as_array();

    for (i, value) in values.iter().enumerate() {
        interp.array_put(slice, i, Object::real(*value))?;
    }

    Ok(())
}

pub(crate) fn newpath(interp: &mut Interpreter) -> PsResult<()> {
    interp.ctx.new_path();

    Ok(())
}

pub(crate) fn moveto(interp: &mut Interpreter) -> PsResult<()> {
    let p = pop_point(interp)?;

    interp.ctx.move_to(p);

    Ok(())
}

pub(crate) fn rmoveto(interp: &mut Interpreter) -> PsResult<()> {
    let d = pop_point(interp)?;
    let cp = current_point(interp)?;

    interp.ctx.move_to(Point::new(cp.x + d.x, cp.y + d.y));

    Ok(())
}

pub(crate) fn lineto(interp: &mut Interpreter) -> PsResult<()> {
    let p = pop_point(interp)?;

    if interp.ctx.current_point().is_none() {
        anyhow::bail!(PostScriptError::NoCurrentPoint);
    }

    interp.ctx.line_to(p);

    Ok(())
}

pub(crate) fn rlineto(interp: &mut Interpreter) -> PsResult<()> {
    let d = pop_point(interp)?;
    let cp = current_point(interp)?;

    interp.ctx.line_to(Point::new(cp.x + d.x, cp.y + d.y));

    Ok(())
}

/// `x y r ang1 ang2 arc`: counterclockwise, with an implicit line from the
/// current point to the arc's start
fn arc_common(interp: &mut Interpreter, anticlockwise: bool) -> PsResult<()> {
    let end = interp.pop_number()?;
    let start = interp.pop_number()?;
    let radius = interp.pop_number()?;
    let center = pop_point(interp)?;

    if radius < 0.0 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let (sin, cos) = start.to_radians().sin_cos();
    let arc_start = Point::new(center.x + radius * cos, center.y + radius * sin);

    match interp.ctx.current_point() {
        Some(..) => interp.ctx.line_to(arc_start),
        None => interp.ctx.move_to(arc_start),
    }

    interp.ctx.arc(center, radius, start, end, anticlockwise);

    Ok(())
}

pub(crate) fn arc(interp: &mut Interpreter) -> PsResult<()> {
    arc_common(interp, true)
}

pub(crate) fn arcn(interp: &mut Interpreter) -> PsResult<()> {
    arc_common(interp, false)
}

/// `x1 y1 x2 y2 r arct`: round the corner at (x1, y1) with a tangent arc
pub(crate) fn arct(interp: &mut Interpreter) -> PsResult<()> {
    let radius = interp.pop_number()?;
    let p2 = pop_point(interp)?;
    let p1 = pop_point(interp)?;
    let p0 = current_point(interp)?;

    if radius < 0.0 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let v1 = normalize(Point::new(p0.x - p1.x, p0.y - p1.y));
    let v2 = normalize(Point::new(p2.x - p1.x, p2.y - p1.y));

    let (v1, v2) = match (v1, v2) {
        (Some(v1), Some(v2)) => (v1, v2),
        // degenerate corner: collapse to a straight line
        _ => {
            interp.ctx.line_to(p1);
            return Ok(());
        }
    };

    let cos_theta = (v1.x * v2.x + v1.y * v2.y).clamp(-1.0, 1.0);
    let theta = cos_theta.acos();

    if theta.sin().abs() < 1e-9 {
        interp.ctx.line_to(p1);
        return Ok(());
    }

    let tangent = radius / (theta / 2.0).tan();
    let t1 = Point::new(p1.x + v1.x * tangent, p1.y + v1.y * tangent);
    let t2 = Point::new(p1.x + v2.x * tangent, p1.y + v2.y * tangent);

    let bisector = match normalize(Point::new(v1.x + v2.x, v1.y + v2.y)) {
        Some(bisector) => bisector,
        // the arms point in opposite directions; no corner to round
        None => {
            interp.ctx.line_to(p1);
            return Ok(());
        }
    };
    let center_distance = radius / (theta / 2.0).sin();
    let center = Point::new(
        p1.x + bisector.x * center_distance,
        p1.y + bisector.y * center_distance,
    );

    let start = (t1.y - center.y).atan2(t1.x - center.x).to_degrees();
    let end = (t2.y - center.y).atan2(t2.x - center.x).to_degrees();

    // sweep the short way around
    let mut delta = (end - start) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }

    interp.ctx.line_to(t1);
    interp.ctx.arc(center, radius, start, end, delta > 0.0);

    Ok(())
}

fn normalize(v: Point) -> Option<Point> {
    let len = (v.x * v.x + v.y * v.y).sqrt();

    if len < 1e-12 {
        return None;
    }

    Some(Point::new(v.x / len, v.y / len))
}

pub(crate) fn curveto(interp: &mut Interpreter) -> PsResult<()> {
    let p3 = pop_point(interp)?;
    let p2 = pop_point(interp)?;
    let p1 = pop_point(interp)?;

    if interp.ctx.current_point().is_none() {
        anyhow::bail!(PostScriptError::NoCurrentPoint);
    }

    interp.ctx.bezier_curve_to(p1, p2, p3);

    Ok(())
}

pub(crate) fn rcurveto(interp: &mut Interpreter) -> PsResult<()> {
    let d3 = pop_point(interp)?;
    let d2 = pop_point(interp)?;
    let d1 = pop_point(interp)?;
    let cp = current_point(interp)?;

    interp.ctx.bezier_curve_to(
        Point::new(cp.x + d1.x, cp.y + d1.y),
        Point::new(cp.x + d2.x, cp.y + d2.y),
        Point::new(cp.x + d3.x, cp.y + d3.y),
    );

    Ok(())
}

pub(crate) fn closepath(interp: &mut Interpreter) -> PsResult<()> {
    interp.ctx.close_path();

    Ok(())
}

pub(crate) fn clip(interp: &mut Interpreter) -> PsResult<()> {
    interp.ctx.clip();

    Ok(())
}

pub(crate) fn eoclip(interp: &mut Interpreter) -> PsResult<()> {
    interp.ctx.even_odd_clip();

    Ok(())
}

pub(crate) fn rectclip(interp: &mut Interpreter) -> PsResult<()> {
    let height = interp.pop_number()?;
    let width = interp.pop_number()?;
    let p = pop_point(interp)?;

    interp.ctx.rect_clip(p.x, p.y, width, height);

    Ok(())
}

pub(crate) fn stroke(interp: &mut Interpreter) -> PsResult<()> {
    interp.ctx.stroke();

    Ok(())
}

pub(crate) fn fill(interp: &mut Interpreter) -> PsResult<()> {
    interp.ctx.fill();

    Ok(())
}

pub(crate) fn eofill(interp: &mut Interpreter) -> PsResult<()> {
    interp.ctx.eo_fill();

    Ok(())
}

pub(crate) fn rectstroke(interp: &mut Interpreter) -> PsResult<()> {
    let height = interp.pop_number()?;
    let width = interp.pop_number()?;
    let p = pop_point(interp)?;

    interp.ctx.stroke_rect(p.x, p.y, width, height);

    Ok(())
}

pub(crate) fn rectfill(interp: &mut Interpreter) -> PsResult<()> {
    let height = interp.pop_number()?;
    let width = interp.pop_number()?;
    let p = pop_point(interp)?;

    interp.ctx.fill_rect(p.x, p.y, width, height);

    Ok(())
}

pub(crate) fn gsave(interp: &mut Interpreter) -> PsResult<()> {
    interp.ctx.save();
    interp.gstate_stack.push(interp.gstate.clone());

    Ok(())
}

pub(crate) fn grestore(interp: &mut Interpreter) -> PsResult<()> {
    interp.ctx.restore();

    if let Some(state) = interp.gstate_stack.pop() {
        interp.gstate = state;
    }

    Ok(())
}

pub(crate) fn setlinewidth(interp: &mut Interpreter) -> PsResult<()> {
    let width = interp.pop_number()?;

    interp.ctx.set_line_width(width);

    Ok(())
}

pub(crate) fn currentlinewidth(interp: &mut Interpreter) -> PsResult<()> {
    let width = interp.ctx.line_width();

    interp.push(Object::real(width));

    Ok(())
}

pub(crate) fn setlinecap(interp: &mut Interpreter) -> PsResult<()> {
    let cap = interp.pop_int()?;

    if !(0..=2).contains(&cap) {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    interp.ctx.set_line_cap(cap);

    Ok(())
}

pub(crate) fn currentlinecap(interp: &mut Interpreter) -> PsResult<()> {
    let cap = interp.ctx.line_cap();

    interp.push(Object::integer(cap));

    Ok(())
}

pub(crate) fn setlinejoin(interp: &mut Interpreter) -> PsResult<()> {
    let join = interp.pop_int()?;

    if !(0..=2).contains(&join) {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    interp.ctx.set_line_join(join);

    Ok(())
}

pub(crate) fn currentlinejoin(interp: &mut Interpreter) -> PsResult<()> {
    let join = interp.ctx.line_join();

    interp.push(Object::integer(join));

    Ok(())
}

pub(crate) fn setmiterlimit(interp: &mut Interpreter) -> PsResult<()> {
    let limit = interp.pop_number()?;

    if limit < 1.0 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    interp.ctx.set_miter_limit(limit);

    Ok(())
}

pub(crate) fn currentmiterlimit(interp: &mut Interpreter) -> PsResult<()> {
    let limit = interp.ctx.miter_limit();

    interp.push(Object::real(limit));

    Ok(())
}

pub(crate) fn setdash(interp: &mut Interpreter) -> PsResult<()> {
    let offset = interp.pop_number()?;
    let slice = interp.pop_array()?;

    let mut pattern = Vec::with_capacity(slice.len);
    for element in interp.array_elements(slice)? {
        let value = match element.value {
            Value::Integer(n) => n as f64,
            Value::Real(r) => r,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        if value < 0.0 {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        pattern.push(value);
    }

    interp.ctx.set_dash(pattern, offset);

    Ok(())
}

pub(crate) fn currentdash(interp: &mut Interpreter) -> PsResult<()> {
    let (pattern, offset) = interp.ctx.dash();

    let elements: Vec<Object> = pattern.into_iter().map(Object::real).collect();
    let slice = interp.new_array(elements);

    interp.push(Object::literal(Value::Array(slice)));
    interp.push(Object::real(offset));

    Ok(())
}

/// Only the device color spaces survive the non-goals; everything else is
/// reported as undefined
pub(crate) fn setcolorspace(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    let name = match &obj.value {
        Value::Name(name) => name.clone(),
        Value::Array(slice) => match interp.array_get(*slice, 0)?.value {
            Value::Name(name) => name,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        },
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    };

    match name.as_bytes() {
        b"DeviceRGB" | b"DeviceGray" => Ok(()),
        _ => {
            log::warn!("unsupported color space {:?}", name);
            anyhow::bail!(PostScriptError::Undefined { name })
        }
    }
}

pub(crate) fn setrgbcolor(interp: &mut Interpreter) -> PsResult<()> {
    let b = interp.pop_number()?.clamp(0.0, 1.0);
    let g = interp.pop_number()?.clamp(0.0, 1.0);
    let r = interp.pop_number()?.clamp(0.0, 1.0);

    interp.ctx.set_rgb_color(r, g, b);

    Ok(())
}

pub(crate) fn currentrgbcolor(interp: &mut Interpreter) -> PsResult<()> {
    let (r, g, b) = interp.ctx.rgb_color();

    interp.push(Object::real(r));
    interp.push(Object::real(g));
    interp.push(Object::real(b));

    Ok(())
}

pub(crate) fn setgray(interp: &mut Interpreter) -> PsResult<()> {
    let gray = interp.pop_number()?.clamp(0.0, 1.0);

    interp.ctx.set_rgb_color(gray, gray, gray);

    Ok(())
}

/// NTSC luminosity weighting
pub(crate) fn currentgray(interp: &mut Interpreter) -> PsResult<()> {
    let (r, g, b) = interp.ctx.rgb_color();

    interp.push(Object::real(0.3 * r + 0.59 * g + 0.11 * b));

    Ok(())
}

pub(crate) fn currentpoint(interp: &mut Interpreter) -> PsResult<()> {
    let cp = current_point(interp)?;

    interp.push(Object::real(cp.x));
    interp.push(Object::real(cp.y));

    Ok(())
}

/// Pushes a fresh identity matrix array
pub(crate) fn matrix(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.new_array(
        Matrix::identity()
            .as_array()
            .iter()
            .map(|&v| Object::real(v))
            .collect(),
    );

    interp.push(Object::literal(Value::Array(slice)));

    Ok(())
}

pub(crate) fn identmatrix(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_array()?;

    write_matrix(interp, slice, Matrix::identity())?;
    interp.push(Object::literal(Value::Array(slice)));

    Ok(())
}

pub(crate) fn currentmatrix(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_array()?;

    let ctm = interp.ctx.transformation_matrix();
    write_matrix(interp, slice, ctm)?;
    interp.push(Object::literal(Value::Array(slice)));

    Ok(())
}

pub(crate) fn setmatrix(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_array()?;

    let matrix = matrix_from_slice(interp, slice)?;
    interp.ctx.set_transformation_matrix(matrix);

    Ok(())
}

pub(crate) fn concat(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_array()?;

    let matrix = matrix_from_slice(interp, slice)?;
    interp.ctx.concat(matrix);

    Ok(())
}

pub(crate) fn translate(interp: &mut Interpreter) -> PsResult<()> {
    let p = pop_point(interp)?;

    interp.ctx.concat(Matrix::translation(p.x, p.y));

    Ok(())
}

/// `tx ty matrix translate` fills the matrix instead of touching the CTM
pub(crate) fn translate_matrix(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_array()?;
    let p = pop_point(interp)?;

    write_matrix(interp, slice, Matrix::translation(p.x, p.y))?;
    interp.push(Object::literal(Value::Array(slice)));

    Ok(())
}

pub(crate) fn scale(interp: &mut Interpreter) -> PsResult<()> {
    let p = pop_point(interp)?;

    interp.ctx.concat(Matrix::scaling(p.x, p.y));

    Ok(())
}

pub(crate) fn scale_matrix(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_array()?;
    let p = pop_point(interp)?;

    write_matrix(interp, slice, Matrix::scaling(p.x, p.y))?;
    interp.push(Object::literal(Value::Array(slice)));

    Ok(())
}

pub(crate) fn rotate(interp: &mut Interpreter) -> PsResult<()> {
    let degrees = interp.pop_number()?;

    interp.ctx.concat(Matrix::rotation(degrees));

    Ok(())
}

pub(crate) fn rotate_matrix(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_array()?;
    let degrees = interp.pop_number()?;

    write_matrix(interp, slice, Matrix::rotation(degrees))?;
    interp.push(Object::literal(Value::Array(slice)));

    Ok(())
}

#[cfg(test)]
mod test {
    use crate::{
        graphics::{DeviceCall, GraphicsContext, RecordingDevice},
        interpreter::Interpreter,
        matrix::Point,
        object::Object,
    };

    fn run_device(source: &[u8]) -> RecordingDevice {
        let mut device = RecordingDevice::new();

        {
            let mut interp = Interpreter::new(source, &mut device);
            interp.run().unwrap();
        }

        device
    }

    #[test]
    fn path_construction_reaches_device() {
        let device = run_device(b"newpath 10 20 moveto 5 5 rlineto closepath stroke");

        assert_eq!(
            device.calls,
            vec![
                DeviceCall::NewPath,
                DeviceCall::MoveTo(Point::new(10.0, 20.0)),
                DeviceCall::LineTo(Point::new(15.0, 25.0)),
                DeviceCall::ClosePath,
                DeviceCall::Stroke,
            ]
        );
    }

    #[test]
    fn rmoveto_requires_current_point() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(b"1 2 rmoveto", &mut device);

        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<crate::error::PostScriptError>()
                .unwrap()
                .name(),
            "nocurrentpoint"
        );
    }

    #[test]
    fn arc_emits_initial_move() {
        let device = run_device(b"newpath 0 0 10 0 90 arc");

        assert!(matches!(
            device.calls[1],
            DeviceCall::MoveTo(p) if (p.x - 10.0).abs() < 1e-9 && p.y.abs() < 1e-9
        ));
        assert!(matches!(
            device.calls[2],
            DeviceCall::Arc { anticlockwise: true, .. }
        ));
    }

    #[test]
    fn graphics_state_queries_round_trip() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(
            b"4 setlinewidth currentlinewidth
              1 setlinecap currentlinecap
              2 setlinejoin currentlinejoin
              3.5 setmiterlimit currentmiterlimit",
            &mut device,
        );

        interp.run().unwrap();

        assert_eq!(
            interp.operand_stack,
            vec![
                Object::real(4.0),
                Object::integer(1),
                Object::integer(2),
                Object::real(3.5),
            ]
        );
    }

    #[test]
    fn gsave_grestore_restores_color() {
        let device = run_device(b"0.5 setgray gsave 1 0 0 setrgbcolor grestore");

        assert_eq!(device.rgb_color(), (0.5, 0.5, 0.5));
    }

    #[test]
    fn translate_concats_ctm() {
        let device = run_device(b"10 20 translate 2 2 scale");

        let p = device.transformation_matrix().apply(Point::new(1.0, 1.0));
        assert_eq!(p, Point::new(12.0, 22.0));
    }

    #[test]
    fn matrix_operator_pushes_identity() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(b"matrix aload pop", &mut device);

        interp.run().unwrap();

        assert_eq!(
            interp.operand_stack,
            vec![
                Object::real(1.0),
                Object::real(0.0),
                Object::real(0.0),
                Object::real(1.0),
                Object::real(0.0),
                Object::real(0.0),
            ]
        );
    }

    #[test]
    fn setdash_rejects_negative_elements() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(b"[-1] 0 setdash", &mut device);

        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<crate::error::PostScriptError>()
                .unwrap()
                .name(),
            "rangecheck"
        );
    }

    #[test]
    fn setcolorspace_accepts_device_spaces_only() {
        run_device(b"/DeviceRGB setcolorspace /DeviceGray setcolorspace");

        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(b"/DeviceCMYK setcolorspace", &mut device);
        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<crate::error::PostScriptError>()
                .unwrap()
                .name(),
            "undefined"
        );
    }

    #[test]
    fn rect_painting() {
        let device = run_device(b"1 2 30 40 rectfill 5 6 7 8 rectstroke 0 0 10 10 rectclip");

        assert_eq!(
            device.calls,
            vec![
                DeviceCall::FillRect(1.0, 2.0, 30.0, 40.0),
                DeviceCall::StrokeRect(5.0, 6.0, 7.0, 8.0),
                DeviceCall::RectClip(0.0, 0.0, 10.0, 10.0),
            ]
        );
    }
}
