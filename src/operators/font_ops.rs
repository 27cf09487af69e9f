//! Font operators: lookup, scaling, definition, and text showing. Type 42
//! (sfnt) font programs are parsed out of the `/sfnts` entry; glyph
//! rasterization belongs to the backend.

use crate::{
    context::{ExecutionContext, KShowContext},
    error::{PostScriptError, PsResult},
    font::true_type::TrueTypeFontFile,
    graphics::FontInfo,
    interpreter::{ExecutionItem, Interpreter},
    matrix::{Matrix, Point},
    object::{DictKey, DictionaryIndex, Name, Object, PsDictionary, Value},
    operators::graphics_ops::matrix_from_slice,
};

fn name_key(name: &str) -> DictKey {
    DictKey::Name(Name::new(name))
}

/// A nominal Type 1-style matrix for substituted fonts: glyph space is
/// 1000 units per em
fn default_font_matrix(interp: &mut Interpreter) -> Object {
    let slice = interp.new_array(
        [0.001, 0.0, 0.0, 0.001, 0.0, 0.0]
            .iter()
            .map(|&v| Object::real(v))
            .collect(),
    );

    Object::literal(Value::Array(slice))
}

fn font_matrix(interp: &Interpreter, dict: DictionaryIndex) -> PsResult<Matrix> {
    match interp.dict_get(dict, &name_key("FontMatrix"))? {
        Some(Object {
            value: Value::Array(slice),
            ..
        }) => matrix_from_slice(interp, slice),
        _ => anyhow::bail!(PostScriptError::InvalidFont),
    }
}

pub(crate) fn font_info(interp: &Interpreter, dict: DictionaryIndex) -> PsResult<FontInfo> {
    let name = match interp.dict_get(dict, &name_key("FontName"))? {
        Some(Object {
            value: Value::Name(name),
            ..
        }) => name.as_bytes().to_vec(),
        Some(Object {
            value: Value::String(slice),
            ..
        }) => interp.string_bytes(slice)?,
        _ => b"Unknown".to_vec(),
    };

    let font_id = match interp.dict_get(dict, &name_key("FID"))? {
        Some(Object {
            value: Value::FontId(id),
            ..
        }) => Some(id),
        _ => None,
    };

    Ok(FontInfo {
        name,
        matrix: font_matrix(interp, dict)?,
        font_id,
    })
}

/// Looks a font up in FontDirectory, synthesizing a substitute entry for
/// unknown names so standalone documents keep rendering
fn find_font_dict(interp: &mut Interpreter, key_obj: &Object) -> PsResult<Object> {
    let key = interp.key_for(key_obj)?;

    if let Some(existing) = interp.dict_get(interp.font_directory, &key)? {
        return Ok(existing);
    }

    let font_name = match &key {
        DictKey::Name(name) => name.clone(),
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    };

    log::warn!("substituting nominal font for {:?}", font_name);

    let matrix = default_font_matrix(interp);
    let mut dict = PsDictionary::new(8);
    dict.force_insert(name_key("FontName"), Object::literal_name(font_name));
    dict.force_insert(name_key("FontType"), Object::integer(42));
    dict.force_insert(name_key("FontMatrix"), matrix);

    let index = interp.new_dict(dict);
    let font = Object::literal(Value::Dictionary(index));

    let directory = interp.font_directory;
    interp.dict_ref_mut(directory).force_insert(key, font.clone());

    Ok(font)
}

pub(crate) fn findfont(interp: &mut Interpreter) -> PsResult<()> {
    let key_obj = interp.pop()?;

    let font = find_font_dict(interp, &key_obj)?;
    interp.push(font);

    Ok(())
}

/// Shallow-copies the font dictionary with a transformed FontMatrix
fn derive_font(
    interp: &mut Interpreter,
    dict: DictionaryIndex,
    transform: Matrix,
) -> PsResult<Object> {
    let matrix = font_matrix(interp, dict)?.multiply(transform);

    let copy_index = {
        let copy = interp.dict_ref(dict).clone();
        interp.new_dict(copy)
    };

    let matrix_obj = {
        let slice = interp.new_array(
            matrix.as_array().iter().map(|&v| Object::real(v)).collect(),
        );
        Object::literal(Value::Array(slice))
    };

    interp
        .dict_ref_mut(copy_index)
        .force_insert(name_key("FontMatrix"), matrix_obj);

    Ok(Object::literal(Value::Dictionary(copy_index)))
}

pub(crate) fn scalefont(interp: &mut Interpreter) -> PsResult<()> {
    let scale = interp.pop_number()?;
    let dict = interp.pop_dict()?;

    let derived = derive_font(interp, dict, Matrix::scaling(scale, scale))?;
    interp.push(derived);

    Ok(())
}

pub(crate) fn makefont(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_array()?;
    let dict = interp.pop_dict()?;

    let transform = matrix_from_slice(interp, slice)?;
    let derived = derive_font(interp, dict, transform)?;
    interp.push(derived);

    Ok(())
}

pub(crate) fn setfont(interp: &mut Interpreter) -> PsResult<()> {
    let dict = interp.pop_dict()?;

    if !interp.dict_ref(dict).is_font_dictionary() {
        anyhow::bail!(PostScriptError::InvalidFont);
    }

    let info = font_info(interp, dict)?;
    interp.gstate.font = Some(Object::literal(Value::Dictionary(dict)));
    interp.ctx.set_font(&info);

    Ok(())
}

pub(crate) fn currentfont(interp: &mut Interpreter) -> PsResult<()> {
    match interp.gstate.font.clone() {
        Some(font) => {
            interp.push(font);
            Ok(())
        }
        None => anyhow::bail!(PostScriptError::InvalidFont),
    }
}

/// `key font definefont font`: registers the font, assigning an FID and
/// parsing the embedded sfnt program for Type 42 fonts
pub(crate) fn definefont(interp: &mut Interpreter) -> PsResult<()> {
    let dict = interp.pop_dict()?;
    let key_obj = interp.pop()?;
    let key = interp.key_for(&key_obj)?;

    if !interp.dict_ref(dict).is_font_dictionary() {
        anyhow::bail!(PostScriptError::InvalidFont);
    }

    match interp.dict_get(dict, &name_key("FontType"))? {
        Some(Object {
            value: Value::Integer(42),
            ..
        }) => {}
        // only sfnt-backed fonts are parsed; Type 1 and Type 3 are out of
        // scope
        _ => anyhow::bail!(PostScriptError::InvalidFont),
    }

    let program = sfnt_program(interp, dict)?;
    let parsed = TrueTypeFontFile::parse(&program)?;

    let id = interp.next_font_id;
    interp.next_font_id += 1;
    interp.fonts.insert(id, parsed);

    interp
        .dict_ref_mut(dict)
        .force_insert(name_key("FID"), Object::literal(Value::FontId(id)));

    let font = Object::literal(Value::Dictionary(dict));
    let directory = interp.font_directory;
    interp.dict_ref_mut(directory).force_insert(key, font.clone());

    interp.push(font);

    Ok(())
}

/// `/sfnts` is an array of strings concatenated into one byte buffer
fn sfnt_program(interp: &Interpreter, dict: DictionaryIndex) -> PsResult<Vec<u8>> {
    let slice = match interp.dict_get(dict, &name_key("sfnts"))? {
        Some(Object {
            value: Value::Array(slice),
            ..
        }) => slice,
        _ => anyhow::bail!(PostScriptError::InvalidFont),
    };

    let mut program = Vec::new();

    for chunk in interp.array_elements(slice)? {
        match chunk.value {
            Value::String(string) => program.extend_from_slice(&interp.string_bytes(string)?),
            _ => anyhow::bail!(PostScriptError::InvalidFont),
        }
    }

    Ok(program)
}

/// `key scale|matrix selectfont`: findfont + scalefont/makefont + setfont
pub(crate) fn selectfont(interp: &mut Interpreter) -> PsResult<()> {
    let scale_or_matrix = interp.pop()?;
    let key_obj = interp.pop()?;

    let font = find_font_dict(interp, &key_obj)?;
    let Value::Dictionary(dict) = font.value else {
        anyhow::bail!(PostScriptError::InvalidFont);
    };

    let transform = match scale_or_matrix.value {
        Value::Integer(n) => Matrix::scaling(n as f64, n as f64),
        Value::Real(r) => Matrix::scaling(r, r),
        Value::Array(slice) => matrix_from_slice(interp, slice)?,
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    };

    let derived = derive_font(interp, dict, transform)?;
    interp.push(derived);

    setfont(interp)
}

pub(crate) fn stringwidth(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let bytes = interp.string_bytes(slice)?;

    let width = interp.ctx.string_width(&bytes);
    interp.push(Object::real(width));
    interp.push(Object::real(0.0));

    Ok(())
}

/// Renders text at the current point; the backend advances the point
pub(crate) fn show_bytes(interp: &mut Interpreter, bytes: &[u8]) -> PsResult<()> {
    let at = interp
        .ctx
        .current_point()
        .ok_or(anyhow::anyhow!(PostScriptError::NoCurrentPoint))?;

    interp.ctx.fill_text(bytes, at);

    Ok(())
}

pub(crate) fn show(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let bytes = interp.string_bytes(slice)?;

    show_bytes(interp, &bytes)
}

/// Per-glyph spacing adjustments shared by the `*show` family
fn show_adjusted(
    interp: &mut Interpreter,
    bytes: &[u8],
    extra: impl Fn(u8) -> (f64, f64),
) -> PsResult<()> {
    let mut at = interp
        .ctx
        .current_point()
        .ok_or(anyhow::anyhow!(PostScriptError::NoCurrentPoint))?;

    for &byte in bytes {
        interp.ctx.fill_text(&[byte], at);

        let advanced = interp.ctx.current_point().unwrap_or(at);
        let (dx, dy) = extra(byte);
        at = Point::new(advanced.x + dx, advanced.y + dy);
    }

    interp.ctx.move_to(at);

    Ok(())
}

/// `ax ay string ashow`: add (ax, ay) after every glyph
pub(crate) fn ashow(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let ay = interp.pop_number()?;
    let ax = interp.pop_number()?;

    let bytes = interp.string_bytes(slice)?;
    show_adjusted(interp, &bytes, |_| (ax, ay))
}

/// `cx cy char string widthshow`: add (cx, cy) after each occurrence of the
/// character code
pub(crate) fn widthshow(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let char_code = interp.pop_int()?;
    let cy = interp.pop_number()?;
    let cx = interp.pop_number()?;

    let bytes = interp.string_bytes(slice)?;
    show_adjusted(interp, &bytes, |byte| {
        if i64::from(byte) == char_code {
            (cx, cy)
        } else {
            (0.0, 0.0)
        }
    })
}

/// `cx cy char ax ay string awidthshow`: both adjustments combined
pub(crate) fn awidthshow(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let ay = interp.pop_number()?;
    let ax = interp.pop_number()?;
    let char_code = interp.pop_int()?;
    let cy = interp.pop_number()?;
    let cx = interp.pop_number()?;

    let bytes = interp.string_bytes(slice)?;
    show_adjusted(interp, &bytes, |byte| {
        if i64::from(byte) == char_code {
            (ax + cx, ay + cy)
        } else {
            (ax, ay)
        }
    })
}

/// `proc string kshow`: the procedure runs between glyphs with the two
/// surrounding character codes on the operand stack
pub(crate) fn kshow(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let proc = interp.pop_procedure()?;

    if !interp.string_access(slice).readable() {
        anyhow::bail!(PostScriptError::InvalidAccess);
    }

    interp.push_execution_item(ExecutionItem::Context(ExecutionContext::KShow(
        KShowContext::new(slice, proc),
    )))
}

/// `string bool charpath`: append the text's outlines to the current path
pub(crate) fn charpath(interp: &mut Interpreter) -> PsResult<()> {
    let _stroke_path = interp.pop_bool()?;
    let slice = interp.pop_string()?;

    let bytes = interp.string_bytes(slice)?;
    let at = interp
        .ctx
        .current_point()
        .ok_or(anyhow::anyhow!(PostScriptError::NoCurrentPoint))?;

    interp.ctx.char_path(&bytes, at);

    Ok(())
}

/// `key category findresource`, stubbed to the font category
pub(crate) fn findresource(interp: &mut Interpreter) -> PsResult<()> {
    let category = interp.pop_name()?;
    let key_obj = interp.pop()?;

    if category.as_bytes() != b"Font" {
        anyhow::bail!(PostScriptError::UndefinedResource);
    }

    let font = find_font_dict(interp, &key_obj)?;
    interp.push(font);

    Ok(())
}

/// `key instance category defineresource instance`, stubbed to the font
/// category
pub(crate) fn defineresource(interp: &mut Interpreter) -> PsResult<()> {
    let category = interp.pop_name()?;
    let instance = interp.pop()?;
    let key_obj = interp.pop()?;

    if category.as_bytes() != b"Font" {
        anyhow::bail!(PostScriptError::UndefinedResource);
    }

    let key = interp.key_for(&key_obj)?;
    let directory = interp.font_directory;
    interp
        .dict_ref_mut(directory)
        .force_insert(key, instance.clone());

    interp.push(instance);

    Ok(())
}

#[cfg(test)]
mod test {
    use crate::{
        graphics::{DeviceCall, RecordingDevice},
        interpreter::Interpreter,
        object::{Object, Value},
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
    fn findfont_substitutes_unknown_names() {
        let device = run_device(b"/Helvetica findfont 12 scalefont setfont");

        let font = device.font().unwrap();
        assert_eq!(font.name, b"Helvetica");
        assert!((font.matrix.a - 0.012).abs() < 1e-9);
    }

    #[test]
    fn findfont_is_idempotent_per_name() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(
            b"/Helvetica findfont /Helvetica findfont eq",
            &mut device,
        );

        interp.run().unwrap();

        assert_eq!(interp.operand_stack, vec![Object::boolean(true)]);
    }

    #[test]
    fn scalefont_leaves_original_untouched() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(
            b"/F /Helvetica findfont def
              /G F 10 scalefont def
              F /FontMatrix get 0 get
              G /FontMatrix get 0 get",
            &mut device,
        );

        interp.run().unwrap();

        let stack = interp.operand_stack.clone();
        let Value::Real(original) = stack[0].value else {
            panic!("expected real");
        };
        let Value::Real(scaled) = stack[1].value else {
            panic!("expected real");
        };

        assert!((original - 0.001).abs() < 1e-12);
        assert!((scaled - 0.01).abs() < 1e-12);
    }

    #[test]
    fn show_renders_at_current_point() {
        let device = run_device(
            b"/Helvetica findfont 10 scalefont setfont
              100 200 moveto (Hi) show",
        );

        assert!(device
            .calls
            .iter()
            .any(|call| matches!(call, DeviceCall::FillText(text, at)
                if text == b"Hi" && at.x == 100.0 && at.y == 200.0)));
    }

    #[test]
    fn show_without_current_point_fails() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(b"(Hi) show", &mut device);

        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<crate::error::PostScriptError>()
                .unwrap()
                .name(),
            "nocurrentpoint"
        );
    }

    #[test]
    fn kshow_runs_proc_between_glyphs() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(
            b"/Helvetica findfont 10 scalefont setfont
              0 0 moveto
              { } (abc) kshow",
            &mut device,
        );

        interp.run().unwrap();

        // two inter-glyph invocations leave two pairs of character codes
        assert_eq!(
            interp.operand_stack,
            vec![
                Object::integer(b'a' as i64),
                Object::integer(b'b' as i64),
                Object::integer(b'b' as i64),
                Object::integer(b'c' as i64),
            ]
        );
    }

    #[test]
    fn stringwidth_pushes_width_pair() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(
            b"/Helvetica findfont 10 scalefont setfont (abcd) stringwidth",
            &mut device,
        );

        interp.run().unwrap();

        assert_eq!(interp.operand_stack.len(), 2);
        assert_eq!(interp.operand_stack[1], Object::real(0.0));
    }

    #[test]
    fn selectfont_combines_lookup_and_set() {
        let device = run_device(b"/Courier 14 selectfont");

        assert_eq!(device.font().unwrap().name, b"Courier");
    }

    #[test]
    fn findresource_is_font_only() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(b"/x /Pattern findresource", &mut device);

        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<crate::error::PostScriptError>()
                .unwrap()
                .name(),
            "undefinedresource"
        );
    }

    #[test]
    fn definefont_rejects_non_sfnt_fonts() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(
            b"/Bad 5 dict dup begin
                /FontName /Bad def
                /FontType 1 def
                /FontMatrix [0.001 0 0 0.001 0 0] def
              end definefont",
            &mut device,
        );

        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<crate::error::PostScriptError>()
                .unwrap()
                .name(),
            "invalidfont"
        );
    }
}
