//! Integration tests for the grading engine
//!
//! The end-to-end tests compile and run real C programs and are skipped when
//! the tools are not installed.

use cgrade_ast::{ClangFrontEnd, FrontEnd, NodeKind, SyntaxNode, SyntaxTree};
use cgrade_core::{BehaviorConfig, DiagnosticCode, StructureConfig, VariableSpec};
use cgrade_engine::{
    check_all, check_function, compute_expected_line, extract_variables, verify_behavior,
    verify_process, BehaviorError, ComparisonMode, ExtractionError, VariableMap,
};
use cgrade_exec::{compile, CompileOptions};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SUBMISSION: &str = r#"#include <stdio.h>

int main(void) {
    int a = 10;
    int b = 3;
    double c = 0.5;
    double d = 0.2;

    printf("a = %d\n", a);
    printf("b = %d\n", b);
    printf("a + b = %d\n", a + b);
    printf("a - b = %d\n", a - b);
    printf("a * b = %d\n", a * b);
    printf("a / b = %d\n", a / b);
    printf("==========\n");
    printf("c = %.8f\n", c);
    printf("d = %.8f\n", d);
    printf("c + d = %.8f\n", c + d);
    printf("c - d = %.8f\n", c - d);
    printf("c * d = %.8f\n", c * d);
    printf("c / d = %.8f\n", c / d);
    return 0;
}
"#;

fn tool_available(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn write_source(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("main.c");
    std::fs::write(&path, body).unwrap();
    path
}

fn function(name: &str, line: u32, body: Vec<SyntaxNode>) -> SyntaxNode {
    SyntaxNode::new(NodeKind::FunctionDecl, line)
        .named(name)
        .with_children(body)
}

#[test]
fn no_if_anywhere_means_no_required_branch() {
    let tree = SyntaxTree::new(
        "main.c",
        SyntaxNode::new(NodeKind::Other, 0).with_children(vec![function(
            "f",
            1,
            vec![SyntaxNode::new(NodeKind::Other, 2).with_children(vec![
                SyntaxNode::new(NodeKind::While, 3),
                SyntaxNode::new(NodeKind::Other, 4),
            ])],
        )]),
    );

    let verdict = check_function(&tree, "f");
    assert!(!verdict.has_required_branch);
    assert_eq!(verdict.disallowed.len(), 1);
}

#[test]
fn expected_output_examples() {
    let vars = VariableMap::arithmetic(10.0, 3.0, 0.5, 0.2);
    assert_eq!(compute_expected_line(&vars, 0).unwrap(), "a = 10\n");
    assert_eq!(compute_expected_line(&vars, 2).unwrap(), "a + b = 13\n");
    assert_eq!(compute_expected_line(&vars, 5).unwrap(), "a / b = 3\n");
    assert_eq!(compute_expected_line(&vars, 7).unwrap(), "c = 0.50000000\n");

    let negative = VariableMap::arithmetic(-5.0, 2.0, -0.1, 0.3);
    assert_eq!(compute_expected_line(&negative, 3).unwrap(), "a - b = -7\n");
}

#[test]
fn extraction_feeds_the_expected_output() {
    let vars = extract_variables(SUBMISSION, &VariableSpec::arithmetic_defaults()).unwrap();
    let expected: String = (0..=12)
        .map(|i| compute_expected_line(&vars, i).unwrap())
        .collect();

    let verdict = verify_behavior(&expected, &vars, &BehaviorConfig::default()).unwrap();
    assert!(verdict.passed());
}

#[test]
fn missing_declaration_stops_the_behavior_check() {
    let source = SUBMISSION.replace("double d = 0.2;", "double e = 0.2;");
    let err = extract_variables(&source, &VariableSpec::arithmetic_defaults()).unwrap_err();
    assert!(matches!(err, ExtractionError::MissingDeclaration { ref name, .. } if name == "d"));
}

#[test]
fn zero_divisor_is_caught_from_source() {
    let source = SUBMISSION.replace("int b = 3;", "int b = 0;");
    let vars = extract_variables(&source, &VariableSpec::arithmetic_defaults()).unwrap();

    let err = verify_behavior("", &vars, &BehaviorConfig::default()).unwrap_err();
    assert_eq!(err, BehaviorError::DivisionByZeroPrecondition { name: "b".to_string() });
}

#[tokio::test]
async fn compiled_submission_passes_behavior_check() {
    if !tool_available("cc") {
        eprintln!("skipping: cc not available");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), SUBMISSION);
    let config = BehaviorConfig::default();

    let vars = extract_variables(SUBMISSION, &config.variables).unwrap();
    let artifact = compile(&source, &CompileOptions::default()).await.unwrap();
    let output = artifact.execute(config.timeout()).await.unwrap();

    let verdict = verify_process(&output, &vars, &config).unwrap();
    assert!(verdict.passed(), "{:#?}", verdict);
}

#[tokio::test]
async fn wrong_format_is_reported_per_line() {
    if !tool_available("cc") {
        eprintln!("skipping: cc not available");
        return;
    }

    let body = SUBMISSION.replace(r#"printf("c * d = %.8f\n", c * d);"#, r#"printf("c * d = %f\n", c * d);"#);
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), &body);
    let config = BehaviorConfig::default();

    let vars = extract_variables(&body, &config.variables).unwrap();
    let artifact = compile(&source, &CompileOptions::default()).await.unwrap();
    let output = artifact.execute(Duration::from_secs(5)).await.unwrap();

    let verdict = verify_process(&output, &vars, &config).unwrap();
    let failed: Vec<_> = verdict.mismatches().map(|c| (c.index, c.mode)).collect();
    assert_eq!(failed, vec![(11, ComparisonMode::FormatPattern)]);
}

#[tokio::test]
async fn crashing_program_is_a_non_zero_exit() {
    if !tool_available("cc") {
        eprintln!("skipping: cc not available");
        return;
    }

    let body = SUBMISSION.replace("return 0;", "return 2;");
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), &body);
    let config = BehaviorConfig::default();

    let vars = extract_variables(&body, &config.variables).unwrap();
    let artifact = compile(&source, &CompileOptions::default()).await.unwrap();
    let output = artifact.execute(config.timeout()).await.unwrap();

    let codes: Vec<_> = verify_process(&output, &vars, &config)
        .unwrap()
        .to_diagnostics("main.c")
        .into_iter()
        .map(|d| d.code)
        .collect();
    assert_eq!(codes, vec![DiagnosticCode::NonZeroExit]);
}

#[tokio::test]
async fn structural_rules_on_parsed_source() {
    if !tool_available("clang") {
        eprintln!("skipping: clang not available");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        dir.path(),
        "#include <stdio.h>\n\
         \n\
         int get_sign(int x) {\n\
         \x20 if (x > 0) return 1;\n\
         \x20 if (x < 0) return -1;\n\
         \x20 return 0;\n\
         }\n\
         \n\
         int get_water_state(int t) {\n\
         \x20 return t < 0 ? 0 : (t < 100 ? 1 : 2);\n\
         }\n\
         \n\
         int main(void) {\n\
         \x20 for (int i = 0; i < 3; i++) printf(\"%d\\n\", get_sign(i));\n\
         \x20 return get_water_state(5);\n\
         }\n",
    );

    let tree = ClangFrontEnd::default().parse(&source, "c99").await.unwrap();
    let verdicts = check_all(&tree, &StructureConfig::default());

    let names: Vec<_> = verdicts.iter().map(|v| v.function_name.as_str()).collect();
    assert_eq!(names, vec!["get_sign", "get_water_state"]);

    assert!(verdicts[0].passed());

    let water = &verdicts[1];
    assert!(!water.has_required_branch);
    let lines: Vec<u32> = water.disallowed.iter().map(|o| o.line).collect();
    assert_eq!(lines, vec![10, 10]);
}
