//! Parser integration tests: statement forms, literals, collections,
//! control constructs and the macro pipeline.

use pretty_assertions::assert_eq;

use newlang_parser::term::{Term, TermKind};
use newlang_parser::token::AssignKind;
use newlang_parser::{parse, parse_with_macros, MacroStore, ParseError};

fn parse_ok(source: &str) -> Term {
    parse(source).unwrap_or_else(|e| panic!("parse failed for {source:?}: {e}"))
}

#[test]
fn create_only_assignment() {
    let term = parse_ok("var1 ::= 123");
    assert_eq!(term.kind, TermKind::Assign);
    assert_eq!(term.assign_kind, Some(AssignKind::CreateOnly));
    assert_eq!(term.left.as_ref().unwrap().kind, TermKind::Name);
    assert_eq!(term.left.as_ref().unwrap().text, "var1");
    assert_eq!(term.right.as_ref().unwrap().kind, TermKind::Integer);
    assert_eq!(term.right.as_ref().unwrap().text, "123");
}

#[test]
fn assignment_is_right_associative() {
    let term = parse_ok("a := b := 1");
    assert_eq!(term.kind, TermKind::Assign);
    let rhs = term.right.as_ref().unwrap();
    assert_eq!(rhs.kind, TermKind::Assign);
    assert_eq!(rhs.left.as_ref().unwrap().text, "b");
}

#[test]
fn pure_assignment_markers() {
    let term = parse_ok("f(x) :- { x }");
    assert_eq!(term.assign_kind, Some(AssignKind::PureCreateOrAssign));
    let term = parse_ok("g(x) ::- { x }");
    assert_eq!(term.assign_kind, Some(AssignKind::PureCreateOnly));
}

#[test]
fn compound_assignment() {
    let term = parse_ok("count += 1");
    assert_eq!(term.assign_kind, Some(AssignKind::Compound('+')));
}

#[test]
fn literal_type_suffix_checks_bounds() {
    assert!(parse("100:Int8").is_ok());
    let err = parse("300:Int8").unwrap_err();
    assert!(
        matches!(err, ParseError::LiteralOutOfRange { ref type_name, .. } if type_name == "Int8"),
        "{err:?}"
    );
    assert!(parse("300:Int16").is_ok());
    assert!(parse("2:Bool").is_err());
}

#[test]
fn precedence_mul_over_add() {
    let term = parse_ok("1 + 2 * 3");
    assert_eq!(term.kind, TermKind::Operator);
    assert_eq!(term.text, "+");
    let rhs = term.right.as_ref().unwrap();
    assert_eq!(rhs.text, "*");
}

#[test]
fn power_is_right_associative() {
    let term = parse_ok("2 ** 3 ** 2");
    assert_eq!(term.text, "**");
    assert_eq!(term.right.as_ref().unwrap().text, "**");
    assert_eq!(term.left.as_ref().unwrap().text, "2");
}

#[test]
fn comparison_and_predicates() {
    let term = parse_ok("a ~ :Int8");
    assert_eq!(term.kind, TermKind::Operator);
    assert_eq!(term.text, "~");
    assert_eq!(term.right.as_ref().unwrap().kind, TermKind::TypeName);

    let term = parse_ok("x <=> y");
    assert_eq!(term.text, "<=>");
}

#[test]
fn dict_literal_requires_trailing_comma() {
    let term = parse_ok("(10, 2, 3, 4,)");
    assert_eq!(term.kind, TermKind::Dict);
    assert_eq!(term.args.len(), 4);

    // Without the trailing comma this is an error, not a dict.
    assert!(parse("(10, 2)").is_err());

    // Plain grouping still works.
    let term = parse_ok("(10)");
    assert_eq!(term.kind, TermKind::Integer);
}

#[test]
fn empty_dict() {
    let term = parse_ok("(,)");
    assert_eq!(term.kind, TermKind::Dict);
    assert!(term.args.is_empty());
}

#[test]
fn dict_with_string_names() {
    let term = parse_ok("('1'=1, \"22\"=2, '333'=3, 4, \"555\"=5,)");
    assert_eq!(term.kind, TermKind::Dict);
    assert_eq!(term.args.len(), 5);
    assert_eq!(term.args[0].0.as_deref(), Some("1"));
    assert_eq!(term.args[1].0.as_deref(), Some("22"));
    assert_eq!(term.args[3].0, None);
}

#[test]
fn tensor_literal_and_suffix() {
    let term = parse_ok("[1, 1, 0, 0,]");
    assert_eq!(term.kind, TermKind::Tensor);
    assert_eq!(term.args.len(), 4);
    assert!(term.annotation.is_none());

    let term = parse_ok("[1, 2,]:Int32");
    assert_eq!(term.annotation.as_ref().unwrap().name, "Int32");

    assert!(parse("[1, 2]").is_err());
}

#[test]
fn nested_tensor_literal() {
    let term = parse_ok("[ [1, 2,], [3, 4,], ]");
    assert_eq!(term.kind, TermKind::Tensor);
    assert_eq!(term.args.len(), 2);
    assert_eq!(term.args[0].1.kind, TermKind::Tensor);
}

#[test]
fn range_terms() {
    let term = parse_ok("1..5");
    assert_eq!(term.kind, TermKind::Range);
    assert_eq!(term.args.len(), 2);
    assert_eq!(term.args[0].0.as_deref(), Some("start"));
    assert_eq!(term.args[1].0.as_deref(), Some("stop"));

    let term = parse_ok("1..10..2");
    assert_eq!(term.args.len(), 3);
    assert_eq!(term.args[2].0.as_deref(), Some("step"));
}

#[test]
fn call_with_named_arguments() {
    let term = parse_ok("func(200, arg2=10)");
    assert_eq!(term.kind, TermKind::Call);
    assert_eq!(term.text, "func");
    assert_eq!(term.args.len(), 2);
    assert_eq!(term.args[0].0, None);
    assert_eq!(term.args[1].0.as_deref(), Some("arg2"));
}

#[test]
fn function_definition_with_defaults_and_variadic() {
    let term = parse_ok("func(arg1:Int64, arg2=100, ...) := { arg1 }");
    assert_eq!(term.kind, TermKind::Assign);
    let proto = term.left.as_ref().unwrap();
    assert_eq!(proto.kind, TermKind::Call);
    assert_eq!(proto.args.len(), 3);
    assert_eq!(
        proto.args[0].1.annotation.as_ref().unwrap().name,
        "Int64"
    );
    assert_eq!(proto.args[1].0.as_deref(), Some("arg2"));
    assert_eq!(proto.args[2].1.kind, TermKind::Ellipsis);
    assert_eq!(term.right.as_ref().unwrap().kind, TermKind::Block);
}

#[test]
fn function_result_type_annotation() {
    let term = parse_ok("f(x) :Int32 := { x }");
    let proto = term.left.as_ref().unwrap();
    assert_eq!(proto.annotation.as_ref().unwrap().name, "Int32");
}

#[test]
fn field_and_index_chains() {
    let term = parse_ok("obj.name[0]");
    assert_eq!(term.kind, TermKind::Index);
    let field = term.left.as_ref().unwrap();
    assert_eq!(field.kind, TermKind::Field);
    assert_eq!(field.text, "name");
}

#[test]
fn iterator_postfix_forms() {
    let term = parse_ok("dict?");
    assert_eq!(term.kind, TermKind::Iterator);
    assert_eq!(term.text, "?");

    let term = parse_ok("iter!(-3)");
    assert_eq!(term.text, "!");
    assert_eq!(term.args.len(), 1);

    let term = parse_ok("dict?('.')");
    assert_eq!(term.text, "?");
    assert_eq!(term.args.len(), 1);

    let term = parse_ok("iter??");
    assert_eq!(term.text, "??");

    let term = parse_ok("dict!?");
    assert_eq!(term.text, "!?");
}

#[test]
fn follow_chain() {
    let term = parse_ok("[a > 1] --> 1, [a > 0] --> 2, [_] --> 3");
    assert_eq!(term.kind, TermKind::Follow);
    assert_eq!(term.args.len(), 3);
    let last = &term.args[2].1;
    assert_eq!(last.left.as_ref().unwrap().kind, TermKind::None);
}

#[test]
fn repeat_statement() {
    let term = parse_ok("[count < 10] <-> { count += 1; }");
    assert_eq!(term.kind, TermKind::Repeat);
    assert_eq!(term.left.as_ref().unwrap().text, "<");
    assert_eq!(term.right.as_ref().unwrap().kind, TermKind::Block);
}

#[test]
fn return_and_break_brackets() {
    let term = parse_ok("--42--");
    assert_eq!(term.kind, TermKind::Return);
    assert_eq!(term.left.as_ref().unwrap().text, "42");

    let term = parse_ok("--");
    assert_eq!(term.kind, TermKind::Return);
    assert!(term.left.is_none());

    let term = parse_ok("++7++");
    assert_eq!(term.kind, TermKind::Break);
    assert_eq!(term.left.as_ref().unwrap().text, "7");
}

#[test]
fn block_kinds() {
    assert_eq!(parse_ok("{ 1; 2 }").kind, TermKind::Block);
    assert_eq!(parse_ok("{* f() *}").kind, TermKind::BlockTry);
    assert_eq!(parse_ok("{- a; b -}").kind, TermKind::BlockAnd);
    assert_eq!(parse_ok("{+ a; b +}").kind, TermKind::BlockOr);
    assert_eq!(parse_ok("{! a; b !}").kind, TermKind::BlockXor);
}

#[test]
fn sigil_lookups() {
    assert_eq!(parse_ok("$name").kind, TermKind::Local);
    assert_eq!(parse_ok("$name").text, "name");
    assert_eq!(parse_ok("@global").kind, TermKind::Module);
    assert_eq!(parse_ok("%native").kind, TermKind::Native);
    assert_eq!(parse_ok("$1").kind, TermKind::Argument);
    assert_eq!(parse_ok("$").kind, TermKind::ArgsDict);
    assert_eq!(parse_ok("$.name").text, ".name");
    assert_eq!(parse_ok("@.name").text, ".name");
}

#[test]
fn type_call_with_shape() {
    let term = parse_ok(":Int32[2,2]((1,2,3,4,))");
    assert_eq!(term.kind, TermKind::TypeCall);
    assert_eq!(term.text, "Int32");
    let annotation = term.annotation.as_ref().unwrap();
    assert_eq!(annotation.dims.len(), 2);
    assert_eq!(term.args.len(), 1);
    assert_eq!(term.args[0].1.kind, TermKind::Dict);
}

#[test]
fn type_call_with_ellipsis_dim() {
    let term = parse_ok(":Int8[...](1, 2, 3,)");
    let annotation = term.annotation.as_ref().unwrap();
    assert_eq!(annotation.dims[0].kind, TermKind::Ellipsis);
}

#[test]
fn strings_decode_escapes() {
    let term = parse_ok(r"'a\nb'");
    assert_eq!(term.kind, TermKind::StrChar);
    assert_eq!(term.text, "a\nb");

    let term = parse_ok(r#""wide\sstring""#);
    assert_eq!(term.kind, TermKind::StrWide);
    assert_eq!(term.text, "wide string");
}

#[test]
fn templates_are_multiline_strings() {
    let term = parse_ok("'''line1\nline2'''");
    assert_eq!(term.kind, TermKind::StrChar);
    assert_eq!(term.text, "line1\nline2");

    let term = parse_ok("\"\"\"a\nb\"\"\"");
    assert_eq!(term.kind, TermKind::StrWide);
}

#[test]
fn raw_source_block() {
    let term = parse_ok("{% return 42; %}");
    assert_eq!(term.kind, TermKind::Source);
    assert_eq!(term.text, " return 42; ");
}

#[test]
fn fraction_literal() {
    let term = parse_ok(r"100\1");
    assert_eq!(term.kind, TermKind::Fraction);
    assert_eq!(term.text, r"100\1");
}

#[test]
fn statement_sequence_becomes_block() {
    let term = parse_ok("a := 1; b := 2; a + b");
    assert_eq!(term.kind, TermKind::Block);
    assert_eq!(term.block.len(), 3);
}

#[test]
fn empty_statements_are_skipped() {
    let term = parse_ok(";;; a := 1 ;;");
    assert_eq!(term.kind, TermKind::Assign);
}

#[test]
fn shebang_is_ignored() {
    let term = parse_ok("#!/usr/bin/env nlc\n1 + 1");
    assert_eq!(term.kind, TermKind::Operator);
}

#[test]
fn doc_comment_binds_to_next_statement() {
    let term = parse_ok("/// doubles the input\nf(x) := { x * 2 }");
    assert_eq!(term.doc.as_deref(), Some("doubles the input"));
}

#[test]
fn macro_pipeline_end_to_end() {
    let mut store = MacroStore::new();
    let source = r"\\if(cond) [\$cond]-->\\\ \if(a > 1){ 2 }";
    let term = parse_with_macros(source, &mut store).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(term.kind, TermKind::Follow);
}

#[test]
fn unknown_macro_is_a_parse_error() {
    let err = parse(r"\nosuch(1)").unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { .. }), "{err:?}");
}

#[test]
fn unterminated_string_position() {
    let err = parse("x := 'abc").unwrap_err();
    match err {
        ParseError::UnterminatedString { span } => assert_eq!(span.start, 5),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn guard_requires_an_arrow() {
    assert!(parse("[a > 1] + 2").is_err());
}
