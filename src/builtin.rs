//! The operator binding table and the constants of the execution
//! environment.
//!
//! Operators are enumerated once in a flat table of
//! (name, stack pattern, implementation) rows and grouped into a
//! process-wide immutable registry. A name may appear several times with
//! different patterns; the first row whose pattern matches the top of the
//! operand stack wins, so tie-breaks are deterministic by table order.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::{
    error::{PostScriptError, PsResult},
    interpreter::Interpreter,
    object::{DictKey, Name, Object, Operator, PsArray, PsDictionary, TypeMask, Value},
    operators::{
        arithmetic, array, control, conversion, dictionary, file_ops, font_ops, graphics_ops,
        relational, stack, string_ops, vm,
    },
};

pub(crate) type OpFn = fn(&mut Interpreter) -> PsResult<()>;

pub(crate) struct OperatorVariant {
    pub pattern: &'static [TypeMask],
    pub run: OpFn,
}

const ANY: TypeMask = TypeMask::ANY;
const INT: TypeMask = TypeMask::INTEGER;
const NUM: TypeMask = TypeMask::NUMERIC;
const BOOL: TypeMask = TypeMask::BOOLEAN;
const ARR: TypeMask = TypeMask::ARRAY;
const DICT: TypeMask = TypeMask::DICTIONARY;
const STR: TypeMask = TypeMask::STRING;
const NAME: TypeMask = TypeMask::NAME;
const FILE: TypeMask = TypeMask::FILE;
const SAVE: TypeMask = TypeMask::SAVE;

const NUM_OR_STR: TypeMask = NUM.union(STR);
const BOOL_OR_INT: TypeMask = BOOL.union(INT);
const COMPOSITE: TypeMask = ARR.union(STR).union(FILE).union(DICT);

/// Every built-in, in PLRM chapter order. Overloads of one name are listed
/// most-specific first; their relative order is the tie-break
#[rustfmt::skip]
static BINDINGS: &[(&str, &[TypeMask], OpFn)] = &[
    // operand stack
    ("pop", &[ANY], stack::pop),
    ("exch", &[ANY, ANY], stack::exch),
    ("dup", &[ANY], stack::dup),
    ("copy", &[INT], stack::copy_n),
    ("copy", &[ARR, ARR], stack::copy_array),
    ("copy", &[DICT, DICT], stack::copy_dict),
    ("copy", &[STR, STR], stack::copy_string),
    ("index", &[INT], stack::index),
    ("roll", &[INT, INT], stack::roll),
    ("clear", &[], stack::clear),
    ("count", &[], stack::count),
    ("mark", &[], stack::mark),
    ("[", &[], stack::mark),
    ("<<", &[], stack::mark),
    ("cleartomark", &[], stack::cleartomark),
    ("counttomark", &[], stack::counttomark),

    // arithmetic and math
    ("add", &[NUM, NUM], arithmetic::add),
    ("sub", &[NUM, NUM], arithmetic::sub),
    ("mul", &[NUM, NUM], arithmetic::mul),
    ("div", &[NUM, NUM], arithmetic::div),
    ("idiv", &[INT, INT], arithmetic::idiv),
    ("mod", &[INT, INT], arithmetic::mod_op),
    ("abs", &[NUM], arithmetic::abs),
    ("neg", &[NUM], arithmetic::neg),
    ("ceiling", &[NUM], arithmetic::ceiling),
    ("floor", &[NUM], arithmetic::floor),
    ("round", &[NUM], arithmetic::round),
    ("truncate", &[NUM], arithmetic::truncate),
    ("sqrt", &[NUM], arithmetic::sqrt),
    ("atan", &[NUM, NUM], arithmetic::atan),
    ("cos", &[NUM], arithmetic::cos),
    ("sin", &[NUM], arithmetic::sin),
    ("exp", &[NUM, NUM], arithmetic::exp),
    ("ln", &[NUM], arithmetic::ln),
    ("log", &[NUM], arithmetic::log),
    ("rand", &[], arithmetic::rand),
    ("srand", &[INT], arithmetic::srand),
    ("rrand", &[], arithmetic::rrand),

    // relational, boolean, bitwise
    ("eq", &[ANY, ANY], relational::eq),
    ("ne", &[ANY, ANY], relational::ne),
    ("ge", &[NUM_OR_STR, NUM_OR_STR], relational::ge),
    ("gt", &[NUM_OR_STR, NUM_OR_STR], relational::gt),
    ("le", &[NUM_OR_STR, NUM_OR_STR], relational::le),
    ("lt", &[NUM_OR_STR, NUM_OR_STR], relational::lt),
    ("and", &[BOOL_OR_INT, BOOL_OR_INT], relational::and),
    ("or", &[BOOL_OR_INT, BOOL_OR_INT], relational::or),
    ("xor", &[BOOL_OR_INT, BOOL_OR_INT], relational::xor),
    ("not", &[BOOL_OR_INT], relational::not),
    ("bitshift", &[INT, INT], relational::bitshift),
    ("true", &[], relational::push_true),
    ("false", &[], relational::push_false),
    ("null", &[], relational::push_null),

    // arrays and the polymorphic container family
    ("array", &[INT], array::array),
    ("]", &[], array::array_close),
    ("astore", &[ARR], array::astore),
    ("aload", &[ARR], array::aload),
    ("length", &[ARR], array::length_array),
    ("length", &[DICT], array::length_dict),
    ("length", &[STR], array::length_string),
    ("length", &[NAME], array::length_name),
    ("get", &[ARR, INT], array::get_array),
    ("get", &[DICT, ANY], array::get_dict),
    ("get", &[STR, INT], array::get_string),
    ("put", &[ARR, INT, ANY], array::put_array),
    ("put", &[DICT, ANY, ANY], array::put_dict),
    ("put", &[STR, INT, INT], array::put_string),
    ("getinterval", &[ARR, INT, INT], array::getinterval_array),
    ("getinterval", &[STR, INT, INT], array::getinterval_string),
    ("putinterval", &[ARR, INT, ARR], array::putinterval_array),
    ("putinterval", &[STR, INT, STR], array::putinterval_string),
    ("forall", &[ARR, ARR], array::forall_array),
    ("forall", &[DICT, ARR], array::forall_dict),
    ("forall", &[STR, ARR], array::forall_string),

    // dictionaries
    ("dict", &[INT], dictionary::dict),
    (">>", &[], dictionary::dict_close),
    ("maxlength", &[DICT], dictionary::maxlength),
    ("begin", &[DICT], dictionary::begin),
    ("end", &[], dictionary::end),
    ("def", &[ANY, ANY], dictionary::def),
    ("load", &[ANY], dictionary::load),
    ("store", &[ANY, ANY], dictionary::store),
    ("undef", &[DICT, ANY], dictionary::undef),
    ("known", &[DICT, ANY], dictionary::known),
    ("where", &[ANY], dictionary::where_op),
    ("currentdict", &[], dictionary::currentdict),
    ("countdictstack", &[], dictionary::countdictstack),
    ("dictstack", &[ARR], dictionary::dictstack),
    ("cleardictstack", &[], dictionary::cleardictstack),

    // strings
    ("string", &[INT], string_ops::string),
    ("anchorsearch", &[STR, STR], string_ops::anchorsearch),
    ("search", &[STR, STR], string_ops::search),
    ("token", &[STR], string_ops::token_string),
    ("token", &[FILE], file_ops::token_file),

    // control
    ("exec", &[ANY], control::exec),
    ("if", &[BOOL, ARR], control::if_op),
    ("ifelse", &[BOOL, ARR, ARR], control::ifelse),
    ("for", &[NUM, NUM, NUM, ARR], control::for_op),
    ("repeat", &[INT, ARR], control::repeat),
    ("loop", &[ARR], control::loop_op),
    ("exit", &[], control::exit),
    ("stop", &[], control::stop),
    ("stopped", &[ANY], control::stopped),
    ("countexecstack", &[], control::countexecstack),
    ("quit", &[], control::quit),

    // types, attributes, conversions
    ("type", &[ANY], conversion::type_op),
    ("cvlit", &[ANY], conversion::cvlit),
    ("cvx", &[ANY], conversion::cvx),
    ("xcheck", &[ANY], conversion::xcheck),
    ("executeonly", &[ARR.union(STR).union(FILE)], conversion::executeonly),
    ("noaccess", &[COMPOSITE], conversion::noaccess),
    ("readonly", &[COMPOSITE], conversion::readonly),
    ("rcheck", &[COMPOSITE], conversion::rcheck),
    ("wcheck", &[COMPOSITE], conversion::wcheck),
    ("cvi", &[NUM_OR_STR], conversion::cvi),
    ("cvn", &[STR], conversion::cvn),
    ("cvr", &[NUM_OR_STR], conversion::cvr),
    ("cvrs", &[NUM, INT, STR], conversion::cvrs),
    ("cvs", &[ANY, STR], conversion::cvs),

    // files and debug output
    ("=", &[ANY], file_ops::print_brief),
    ("==", &[ANY], file_ops::print_verbose),
    ("stack", &[], file_ops::stack_op),
    ("pstack", &[], file_ops::pstack),
    ("print", &[STR], file_ops::print),
    ("write", &[FILE, INT], file_ops::write),
    ("writestring", &[FILE, STR], file_ops::writestring),
    ("writehexstring", &[FILE, STR], file_ops::writehexstring),
    ("read", &[FILE], file_ops::read),
    ("readstring", &[FILE, STR], file_ops::readstring),
    ("readline", &[FILE, STR], file_ops::readline),
    ("readhexstring", &[FILE, STR], file_ops::readhexstring),
    ("currentfile", &[], file_ops::currentfile),
    ("closefile", &[FILE], file_ops::closefile),
    ("file", &[STR, STR], file_ops::file),
    ("filter", &[FILE, NAME], file_ops::filter),
    ("run", &[STR], file_ops::run_file),
    ("flush", &[], file_ops::flush),

    // path construction and painting
    ("newpath", &[], graphics_ops::newpath),
    ("moveto", &[NUM, NUM], graphics_ops::moveto),
    ("rmoveto", &[NUM, NUM], graphics_ops::rmoveto),
    ("lineto", &[NUM, NUM], graphics_ops::lineto),
    ("rlineto", &[NUM, NUM], graphics_ops::rlineto),
    ("arc", &[NUM, NUM, NUM, NUM, NUM], graphics_ops::arc),
    ("arcn", &[NUM, NUM, NUM, NUM, NUM], graphics_ops::arcn),
    ("arct", &[NUM, NUM, NUM, NUM, NUM], graphics_ops::arct),
    ("curveto", &[NUM, NUM, NUM, NUM, NUM, NUM], graphics_ops::curveto),
    ("rcurveto", &[NUM, NUM, NUM, NUM, NUM, NUM], graphics_ops::rcurveto),
    ("closepath", &[], graphics_ops::closepath),
    ("clip", &[], graphics_ops::clip),
    ("eoclip", &[], graphics_ops::eoclip),
    ("rectclip", &[NUM, NUM, NUM, NUM], graphics_ops::rectclip),
    ("stroke", &[], graphics_ops::stroke),
    ("fill", &[], graphics_ops::fill),
    ("eofill", &[], graphics_ops::eofill),
    ("rectstroke", &[NUM, NUM, NUM, NUM], graphics_ops::rectstroke),
    ("rectfill", &[NUM, NUM, NUM, NUM], graphics_ops::rectfill),

    // graphics state
    ("gsave", &[], graphics_ops::gsave),
    ("grestore", &[], graphics_ops::grestore),
    ("setlinewidth", &[NUM], graphics_ops::setlinewidth),
    ("currentlinewidth", &[], graphics_ops::currentlinewidth),
    ("setlinecap", &[INT], graphics_ops::setlinecap),
    ("currentlinecap", &[], graphics_ops::currentlinecap),
    ("setlinejoin", &[INT], graphics_ops::setlinejoin),
    ("currentlinejoin", &[], graphics_ops::currentlinejoin),
    ("setmiterlimit", &[NUM], graphics_ops::setmiterlimit),
    ("currentmiterlimit", &[], graphics_ops::currentmiterlimit),
    ("setdash", &[ARR, NUM], graphics_ops::setdash),
    ("currentdash", &[], graphics_ops::currentdash),
    ("setcolorspace", &[NAME.union(ARR)], graphics_ops::setcolorspace),
    ("setrgbcolor", &[NUM, NUM, NUM], graphics_ops::setrgbcolor),
    ("currentrgbcolor", &[], graphics_ops::currentrgbcolor),
    ("setgray", &[NUM], graphics_ops::setgray),
    ("currentgray", &[], graphics_ops::currentgray),
    ("currentpoint", &[], graphics_ops::currentpoint),

    // coordinate system
    ("matrix", &[], graphics_ops::matrix),
    ("identmatrix", &[ARR], graphics_ops::identmatrix),
    ("currentmatrix", &[ARR], graphics_ops::currentmatrix),
    ("setmatrix", &[ARR], graphics_ops::setmatrix),
    ("concat", &[ARR], graphics_ops::concat),
    ("translate", &[NUM, NUM], graphics_ops::translate),
    ("translate", &[NUM, NUM, ARR], graphics_ops::translate_matrix),
    ("scale", &[NUM, NUM], graphics_ops::scale),
    ("scale", &[NUM, NUM, ARR], graphics_ops::scale_matrix),
    ("rotate", &[NUM], graphics_ops::rotate),
    ("rotate", &[NUM, ARR], graphics_ops::rotate_matrix),

    // fonts and resources
    ("findfont", &[ANY], font_ops::findfont),
    ("scalefont", &[DICT, NUM], font_ops::scalefont),
    ("makefont", &[DICT, ARR], font_ops::makefont),
    ("setfont", &[DICT], font_ops::setfont),
    ("currentfont", &[], font_ops::currentfont),
    ("definefont", &[ANY, DICT], font_ops::definefont),
    ("selectfont", &[ANY, NUM.union(ARR)], font_ops::selectfont),
    ("stringwidth", &[STR], font_ops::stringwidth),
    ("show", &[STR], font_ops::show),
    ("ashow", &[NUM, NUM, STR], font_ops::ashow),
    ("widthshow", &[NUM, NUM, INT, STR], font_ops::widthshow),
    ("awidthshow", &[NUM, NUM, INT, NUM, NUM, STR], font_ops::awidthshow),
    ("kshow", &[ARR, STR], font_ops::kshow),
    ("charpath", &[STR, BOOL], font_ops::charpath),
    ("findresource", &[ANY, NAME], font_ops::findresource),
    ("defineresource", &[ANY, ANY, NAME], font_ops::defineresource),

    // virtual memory
    ("save", &[], vm::save),
    ("restore", &[SAVE], vm::restore),
    ("bind", &[ARR], vm::bind),
];

/// Name → ordered overload list, assembled once per process
pub(crate) static REGISTRY: Lazy<IndexMap<&'static str, Vec<OperatorVariant>>> =
    Lazy::new(|| {
        let mut registry: IndexMap<&'static str, Vec<OperatorVariant>> = IndexMap::new();

        for &(name, pattern, run) in BINDINGS {
            registry
                .entry(name)
                .or_default()
                .push(OperatorVariant { pattern, run });
        }

        registry
    });

/// Overload resolution: the first variant whose type masks all match the
/// stack top wins. A stack too short for every variant is `stackunderflow`;
/// a deep-enough stack with no match is `typecheck`
pub(crate) fn invoke(interp: &mut Interpreter, op: Operator) -> PsResult<()> {
    let variants = REGISTRY
        .get(op.name)
        .ok_or(anyhow::anyhow!(PostScriptError::Unregistered))?;

    let depth = interp.operand_stack.len();
    let mut min_arity = usize::MAX;

    for variant in variants {
        min_arity = usize::min(min_arity, variant.pattern.len());

        if depth < variant.pattern.len() {
            continue;
        }

        let base = depth - variant.pattern.len();
        let matched = variant.pattern.iter().enumerate().all(|(i, mask)| {
            interp.operand_stack[base + i].type_mask().matches(*mask)
        });

        if matched {
            return (variant.run)(interp);
        }
    }

    if depth < min_arity {
        anyhow::bail!(PostScriptError::StackUnderflow);
    }

    anyhow::bail!(PostScriptError::TypeCheck)
}

/// Binds every operator into the system dictionary
pub(crate) fn install_operators(dict: &mut PsDictionary) {
    for &name in REGISTRY.keys() {
        dict.force_insert(
            DictKey::Name(Name::new(name)),
            Object::executable(Value::Operator(Operator { name })),
        );
    }
}

#[rustfmt::skip]
static STANDARD_ENCODING: &[Option<&str>] = &[
    /*\00x*/ None, None, None, None, None, None, None, None,
    /*\01x*/ None, None, None, None, None, None, None, None,
    /*\02x*/ None, None, None, None, None, None, None, None,
    /*\03x*/ None, None, None, None, None, None, None, None,
    /*\04x*/ Some("space"), Some("exclam"), Some("quotedbl"), Some("numbersign"),
             Some("dollar"), Some("percent"), Some("ampersand"), Some("quoteright"),
    /*\05x*/ Some("parenleft"), Some("parenright"), Some("asterisk"), Some("plus"),
             Some("comma"), Some("hyphen"), Some("period"), Some("slash"),
    /*\06x*/ Some("zero"), Some("one"), Some("two"), Some("three"),
             Some("four"), Some("five"), Some("six"), Some("seven"),
    /*\07x*/ Some("eight"), Some("nine"), Some("colon"), Some("semicolon"),
             Some("less"), Some("equal"), Some("greater"), Some("question"),
    /*\10x*/ Some("at"), Some("A"), Some("B"), Some("C"),
             Some("D"), Some("E"), Some("F"), Some("G"),
    /*\11x*/ Some("H"), Some("I"), Some("J"), Some("K"),
             Some("L"), Some("M"), Some("N"), Some("O"),
    /*\12x*/ Some("P"), Some("Q"), Some("R"), Some("S"),
             Some("T"), Some("U"), Some("V"), Some("W"),
    /*\13x*/ Some("X"), Some("Y"), Some("Z"), Some("bracketleft"),
             Some("backslash"), Some("bracketright"), Some("asciicircum"), Some("underscore"),
    /*\14x*/ Some("quoteleft"), Some("a"), Some("b"), Some("c"),
             Some("d"), Some("e"), Some("f"), Some("g"),
    /*\15x*/ Some("h"), Some("i"), Some("j"), Some("k"),
             Some("l"), Some("m"), Some("n"), Some("o"),
    /*\16x*/ Some("p"), Some("q"), Some("r"), Some("s"),
             Some("t"), Some("u"), Some("v"), Some("w"),
    /*\17x*/ Some("x"), Some("y"), Some("z"), Some("braceleft"),
             Some("bar"), Some("braceright"), Some("asciitilde"), None,
    /*\20x*/ None, None, None, None, None, None, None, None,
    /*\21x*/ None, None, None, None, None, None, None, None,
    /*\22x*/ None, None, None, None, None, None, None, None,
    /*\23x*/ None, None, None, None, None, None, None, None,
    /*\24x*/ None, Some("exclamdown"), Some("cent"), Some("sterling"),
             Some("fraction"), Some("yen"), Some("florin"), Some("section"),
    /*\25x*/ Some("currency"), Some("quotesingle"), Some("quotedblleft"), Some("guillemotleft"),
             Some("guilsinglleft"), Some("guilsinglright"), Some("fi"), Some("fl"),
    /*\26x*/ None, Some("endash"), Some("dagger"), Some("daggerdbl"),
             Some("periodcentered"), None, Some("paragraph"), Some("bullet"),
    /*\27x*/ Some("quotesinglbase"), Some("quotedblbase"), Some("quotedblright"), Some("guillemotright"),
             Some("ellipsis"), Some("perthousand"), None, Some("questiondown"),
    /*\30x*/ None, Some("grave"), Some("acute"), Some("circumflex"),
             Some("tilde"), Some("macron"), Some("breve"), Some("dotaccent"),
    /*\31x*/ Some("dieresis"), None, Some("ring"), Some("cedilla"),
             None, Some("hungarumlaut"), Some("ogonek"), Some("caron"),
    /*\32x*/ Some("emdash"), None, None, None, None, None, None, None,
    /*\33x*/ None, None, None, None, None, None, None, None,
    /*\34x*/ None, Some("AE"), None, Some("ordfeminine"), None, None, None, None,
    /*\35x*/ Some("Lslash"), Some("Oslash"), Some("OE"), Some("ordmasculine"), None, None, None, None,
    /*\36x*/ None, Some("ae"), None, None, None, Some("dotlessi"), None, None,
    /*\37x*/ Some("lslash"), Some("oslash"), Some("oe"), Some("germandbls"), None, None, None, None,
];

/// The 256-entry StandardEncoding vector of literal glyph names
pub(crate) fn standard_encoding_array() -> PsArray {
    PsArray::from_objects(
        STANDARD_ENCODING
            .iter()
            .map(|entry| match entry {
                Some(glyph) => Object::literal_name(Name::new(glyph)),
                None => Object::null(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registry_groups_overloads_in_table_order() {
        let copy = REGISTRY.get("copy").unwrap();

        assert_eq!(copy.len(), 4);
        assert_eq!(copy[0].pattern, [INT].as_slice());
        assert_eq!(copy[1].pattern, [ARR, ARR].as_slice());
    }

    #[test]
    fn every_binding_is_reachable_by_name() {
        for (name, _, _) in BINDINGS {
            assert!(REGISTRY.contains_key(name), "{} missing", name);
        }
    }

    #[test]
    fn standard_encoding_has_256_entries() {
        let encoding = standard_encoding_array();

        assert_eq!(encoding.len(), 256);
        assert_eq!(
            *encoding.get(0x41).unwrap(),
            Object::literal_name(Name::new("A"))
        );
        assert_eq!(*encoding.get(0).unwrap(), Object::null());
    }

    #[test]
    fn short_stack_is_stackunderflow_not_typecheck() {
        let mut device = crate::graphics::RecordingDevice::new();
        let mut interp = crate::interpreter::Interpreter::new(b"1 add", &mut device);

        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<PostScriptError>().unwrap().name(),
            "stackunderflow"
        );
    }

    #[test]
    fn wrong_types_on_deep_stack_is_typecheck() {
        let mut device = crate::graphics::RecordingDevice::new();
        let mut interp = crate::interpreter::Interpreter::new(b"(a) (b) add", &mut device);

        let err = interp.run().unwrap_err();
        assert_eq!(err.downcast::<PostScriptError>().unwrap().name(), "typecheck");
    }
}
