use crate::{
    lexer, parser, semantic,
    token::Spanned,
    util::{
        self,
        fmt::{tree, Show},
        intern::Interner,
    },
};

pub fn format_error<E>(i: &Interner, e: &Spanned<E>) -> String
where
    Spanned<E>: Show,
{
    let ctx = util::fmt::Context { ident_interner: i };
    format!("{:#}", e.display(&ctx))
}

/// Each variant contains the input, which is primed before running.
pub enum Test {
    ParserProgram(&'static str),
    ParserExpr(&'static str),
    SemanticProgram(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    TreeError(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let interner = &mut Interner::with_capacity(128);

    match test {
        Test::ParserProgram(input) => {
            let src = lexer::prime(input);
            match parser::parse_program(&src, interner) {
                Ok(program) => (tree::print_program_string(interner, &program), vec![]),
                Err(error) => (String::new(), vec![format_error(interner, &error)]),
            }
        }
        Test::ParserExpr(input) => {
            let src = lexer::prime(input);
            match parser::parse_expr(&src, interner) {
                Ok(expr) => (tree::print_node_string(interner, &expr), vec![]),
                Err(error) => (String::new(), vec![format_error(interner, &error)]),
            }
        }
        Test::SemanticProgram(input) => {
            let src = lexer::prime(input);
            let mut program = match parser::parse_program(&src, interner) {
                Ok(program) => program,
                Err(error) => return (String::new(), vec![format_error(interner, &error)]),
            };
            let errors = match semantic::analyze(&mut program) {
                Ok(()) => vec![],
                Err(error) => vec![format_error(interner, &error)],
            };
            (tree::print_program_string(interner, &program), errors)
        }
    }
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::TreeError(expected_tree) => {
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, tree_error, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeError(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser, program), $source:expr) => {
        crate::util::test_utils::Test::ParserProgram($source)
    };
    (@@get_test(parser, expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
    (@@get_test(semantic, program), $source:expr) => {
        crate::util::test_utils::Test::SemanticProgram($source)
    };
}
pub(crate) use tree_tests;
