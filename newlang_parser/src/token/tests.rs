use logos::Logos;
use pretty_assertions::assert_eq;

use super::Token;

fn lex(source: &str) -> Vec<Token> {
    Token::lexer(source).filter_map(Result::ok).collect()
}

#[test]
fn sigil_identifiers() {
    assert_eq!(
        lex("name $local @global %native :Int8"),
        vec![
            Token::Name,
            Token::Local,
            Token::Module,
            Token::Native,
            Token::TypeName,
        ]
    );
}

#[test]
fn dotted_module_name() {
    let mut lexer = Token::lexer("@pkg.mod");
    assert_eq!(lexer.next(), Some(Ok(Token::Module)));
    assert_eq!(lexer.slice(), "@pkg.mod");
}

#[test]
fn assign_family_longest_match() {
    assert_eq!(
        lex(":= ::= = :- ::- += -="),
        vec![
            Token::CreateOrAssign,
            Token::CreateOnly,
            Token::Assign,
            Token::PureCreateOrAssign,
            Token::PureCreateOnly,
            Token::PlusAssign,
            Token::MinusAssign,
        ]
    );
}

#[test]
fn arrows_and_brackets() {
    assert_eq!(
        lex("--> <-> -- ++"),
        vec![
            Token::FollowArrow,
            Token::RepeatArrow,
            Token::MinusMinus,
            Token::PlusPlus,
        ]
    );
}

#[test]
fn predicates_and_comparison() {
    assert_eq!(
        lex("~ ~~ ~~~ !~ !~~ == === != <=>"),
        vec![
            Token::Tilde,
            Token::TildeTilde,
            Token::TildeTildeTilde,
            Token::NotTilde,
            Token::NotTildeTilde,
            Token::EqEq,
            Token::EqEqEq,
            Token::NotEq,
            Token::Spaceship,
        ]
    );
}

#[test]
fn fraction_literal_beats_integer() {
    let mut lexer = Token::lexer(r"100\1");
    assert_eq!(lexer.next(), Some(Ok(Token::Fraction)));
    assert_eq!(lexer.slice(), r"100\1");
}

#[test]
fn numbers_and_ranges() {
    assert_eq!(
        lex("1..5 1.5..2.5 1_000 2e10"),
        vec![
            Token::Integer,
            Token::DotDot,
            Token::Integer,
            Token::Number,
            Token::DotDot,
            Token::Number,
            Token::Integer,
            Token::Number,
        ]
    );
}

#[test]
fn underscore_is_not_a_name() {
    assert_eq!(lex("_"), vec![Token::Underscore]);
    assert_eq!(lex("_tail"), vec![Token::Name]);
}

#[test]
fn macro_tokens() {
    assert_eq!(lex(r"\\"), vec![Token::MacroDefStart]);
    assert_eq!(lex(r"\while"), vec![Token::MacroUse]);
    assert_eq!(
        lex("$1 $* $name $"),
        vec![
            Token::Argument,
            Token::ArgumentAll,
            Token::Local,
            Token::Dollar,
        ]
    );
}

#[test]
fn block_delimiters() {
    assert_eq!(
        lex("{* *} {- -} {+ +} {! !} {%"),
        vec![
            Token::TryStart,
            Token::TryEnd,
            Token::AndStart,
            Token::AndEnd,
            Token::OrStart,
            Token::OrEnd,
            Token::XorStart,
            Token::XorEnd,
            Token::SourceStart,
        ]
    );
}

#[test]
fn iterator_postfix_ops() {
    assert_eq!(
        lex("? ! ?? !? ?!"),
        vec![
            Token::Quest,
            Token::Bang,
            Token::QuestQuest,
            Token::BangQuest,
            Token::QuestBang,
        ]
    );
}

#[test]
fn doc_comment_kinds() {
    assert_eq!(lex("/// doc line"), vec![Token::DocLine]);
    assert_eq!(lex("///< trailing doc"), vec![Token::DocAfter]);
    assert_eq!(lex("# plain comment"), vec![Token::LineComment]);
}
