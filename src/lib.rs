#![allow(
    dead_code,
    // the object model intentionally mirrors PostScript's type names
    clippy::enum_variant_names,
    clippy::large_enum_variant,
)]

//! An interpreter for the PostScript language (PLRM level 2 subset), aimed
//! at rendering Encapsulated PostScript onto a caller-supplied 2D surface.
//!
//! The core is the execution engine: lexer, scanner, typed object model,
//! the multi-stack interpreter loop with deferred execution contexts, and a
//! TrueType (sfnt) parser backing Type 42 fonts. Rasterization is the
//! caller's job, through the [`GraphicsContext`] trait.

mod builtin;
mod context;
mod error;
mod file;
mod font;
mod graphics;
mod interpreter;
mod lexer;
mod matrix;
mod object;
mod operators;
mod scanner;
mod stream;

pub use crate::{
    error::{PostScriptError, PsResult},
    font::{true_type::TrueTypeFontFile, walk_glyph_outline, OutlineSegment},
    graphics::{DeviceCall, FontInfo, GraphicsContext, RecordingDevice},
    interpreter::{Interpreter, MAX_DICT_CAPACITY, MAX_EXECUTION_STACK_SIZE, MAX_STEPS},
    lexer::Span,
    matrix::{Matrix, Point},
    object::{Access, Name, Object, TypeMask, Value},
    scanner::{BoundingBox, DocumentMetadata},
};

#[cfg(test)]
mod tests {
    use super::*;

    /// A program exercising most subsystems at once: definitions, loops,
    /// strings, dictionaries, graphics, and output
    #[test]
    fn end_to_end_smoke() {
        let source = br#"
            %!PS-Adobe-3.0 EPSF-3.0
            %%BoundingBox: 0 0 200 100
            %%EndComments
            /box { % x y w h
                4 2 roll moveto
                exch dup 0 rlineto
                exch 0 exch rlineto
                neg 0 rlineto
                closepath
            } bind def
            gsave
            0.2 setgray
            10 10 50 30 box fill
            grestore
            1 0 0 setrgbcolor
            3 { (tick) print } repeat
            count =
        "#;

        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(source, &mut device);

        interp.run().unwrap();

        assert!(interp.operand_stack.is_empty());
        assert_eq!(interp.stdout(), b"tickticktick0\n");
        assert_eq!(interp.bounding_box().unwrap().upper_right_x, 200);

        let fills = device
            .calls
            .iter()
            .filter(|call| matches!(call, DeviceCall::Fill))
            .count();
        assert_eq!(fills, 1);
    }
}
