//! Sandboxed rule execution (spec §4.F/§5/§6).
//!
//! A rule is a small guest-dialect program exposing a `main(patchList,
//! metadata)` function. [`run_rule`] parses it, binds exactly three host
//! names into its global scope (`getInput`, `setOutput`, `console`), calls
//! `main`, and turns its boolean result into an [`EvaluationRecord`]. No
//! other identifier is ever bound, so any rule that references a network
//! client, the filesystem, the process environment, or a clock fails with
//! a `RuleExecutionFailure` whose message contains "is not defined" —
//! sandboxing here is a consequence of what the global scope does *not*
//! contain, not a runtime blocklist.

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;

use crate::config::{EngineConfig, LogMode};
use crate::error::EngineError;
use crate::patch::{ChangeSetMetadata, Patch};
use indexmap::IndexMap;
use interpreter::{Interpreter, LogEntry};
use std::cell::RefCell;
use std::rc::Rc;
use value::Value;

#[derive(Debug, Clone, serde::Serialize)]
pub struct LogLine {
    pub level: String,
    pub message: String,
}

/// The result of one rule invocation: the gate decision plus whatever
/// `console.*` output was captured, per the invocation's [`LogMode`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct EvaluationRecord {
    pub approve: bool,
    pub logs: Vec<LogLine>,
}

/// Parse and run `program_text`'s `main(patchList, metadata)` against the
/// given change set, enforcing `config.max_runtime_ms` as a wall-clock
/// budget via `tokio::time::timeout`. On timeout, any logs accumulated up
/// to that point are discarded (spec §5: "a run that times out produces
/// no EvaluationRecord").
#[tracing::instrument(skip(program_text, patch_list, metadata), fields(log_mode = ?log_mode, max_runtime_ms = config.max_runtime_ms))]
pub async fn run_rule(
    program_text: &str,
    patch_list: &[Patch],
    metadata: &ChangeSetMetadata,
    config: EngineConfig,
    log_mode: LogMode,
) -> Result<EvaluationRecord, EngineError> {
    let deadline = std::time::Duration::from_millis(config.max_runtime_ms);
    match tokio::time::timeout(deadline, execute(program_text, patch_list, metadata, config, log_mode)).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout(config.max_runtime_ms)),
    }
}

async fn execute(
    program_text: &str,
    patch_list: &[Patch],
    metadata: &ChangeSetMetadata,
    config: EngineConfig,
    log_mode: LogMode,
) -> Result<EvaluationRecord, EngineError> {
    let program = parser::parse_program(program_text)?;

    let interp = Interpreter::new(config.n_steps, config.sleep_ms, log_mode);
    bind_host_functions(&interp, patch_list, metadata)?;
    interp.load_program(&program).await?;

    let main_fn = interp
        .global_scope()
        .get("main")
        .ok_or_else(|| EngineError::RuleExecutionFailure("rule does not define main".to_string()))?;

    let patches_value = json_to_guest(serde_json::to_value(patch_list).map_err(to_internal)?);
    let metadata_value = json_to_guest(serde_json::to_value(metadata).map_err(to_internal)?);

    let result = interp.call_function(main_fn, vec![patches_value, metadata_value]).await?;

    let approve = match &result {
        Value::Bool(b) => *b,
        other => return Err(EngineError::NonBooleanResult(other.to_display_string())),
    };

    let output_json = serde_json::to_string(&approve).map_err(to_internal)?;
    if let Some(set_output) = interp.global_scope().get("setOutput") {
        interp.call_function(set_output, vec![Value::str(output_json)]).await?;
    }

    let logs = interp
        .take_logs()
        .into_iter()
        .map(|LogEntry { level, msg }| LogLine {
            level: level.to_string(),
            message: msg,
        })
        .collect();

    Ok(EvaluationRecord { approve, logs })
}

fn to_internal(e: impl std::fmt::Display) -> EngineError {
    EngineError::EngineInternalError(e.to_string())
}

/// Bind `getInput`/`setOutput` per spec §4.F. `console.*` is bound by
/// [`Interpreter::new`] itself since it needs the interpreter's log sink.
fn bind_host_functions(
    interp: &Interpreter,
    patch_list: &[Patch],
    metadata: &ChangeSetMetadata,
) -> Result<(), EngineError> {
    #[derive(serde::Serialize)]
    struct HostInput<'a> {
        patches: &'a [Patch],
        metadata: &'a ChangeSetMetadata,
    }
    let input_json = serde_json::to_string(&HostInput { patches: patch_list, metadata }).map_err(to_internal)?;

    let output_slot: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));

    interp.bind_global(
        "getInput",
        Value::native("getInput", move |_args| Ok(Value::str(input_json.clone()))),
    );
    interp.bind_global(
        "setOutput",
        Value::native("setOutput", move |args| {
            let text = args.first().map(Value::to_display_string).unwrap_or_default();
            *output_slot.borrow_mut() = Some(text);
            Ok(Value::Undefined)
        }),
    );
    Ok(())
}

fn json_to_guest(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::str(s),
        serde_json::Value::Array(items) => Value::array(items.into_iter().map(json_to_guest).collect()),
        serde_json::Value::Object(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                out.insert(k, json_to_guest(v));
            }
            Value::object(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{LinkedPR, PatchOp};

    fn empty_metadata() -> ChangeSetMetadata {
        ChangeSetMetadata {
            source_branch: "feature".to_string(),
            target_branch: "main".to_string(),
            linked_prs: Vec::<LinkedPR>::new(),
        }
    }

    fn sample_patches() -> Vec<Patch> {
        vec![Patch {
            path: "README.md".to_string(),
            op: PatchOp::Modified,
            additions: 1,
            deletions: 0,
            diff: Vec::new(),
            object_diff: None,
        }]
    }

    #[tokio::test]
    async fn sanity_rule_approves_single_file_changes() {
        let program = r#"
            function main(patches, metadata) {
                return patches.length === 1;
            }
        "#;
        let record = run_rule(program, &sample_patches(), &empty_metadata(), EngineConfig::default(), LogMode::Drop)
            .await
            .unwrap();
        assert!(record.approve);
    }

    #[tokio::test]
    async fn referencing_a_forbidden_global_fails_as_not_defined() {
        let program = r#"
            function main(patches, metadata) {
                return fetch("https://example.com") !== undefined;
            }
        "#;
        let err = run_rule(program, &sample_patches(), &empty_metadata(), EngineConfig::default(), LogMode::Drop)
            .await
            .unwrap_err();
        match err {
            EngineError::RuleExecutionFailure(msg) => assert!(msg.contains("is not defined")),
            other => panic!("expected RuleExecutionFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn process_global_is_also_unreachable() {
        let program = r#"
            function main(patches, metadata) {
                return process.env.SECRET === undefined;
            }
        "#;
        let err = run_rule(program, &sample_patches(), &empty_metadata(), EngineConfig::default(), LogMode::Drop)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RuleExecutionFailure(msg) if msg.contains("is not defined")));
    }

    #[tokio::test]
    async fn infinite_loop_times_out_instead_of_hanging() {
        let program = r#"
            function main(patches, metadata) {
                while (true) {
                }
                return true;
            }
        "#;
        let mut config = EngineConfig::default();
        config.max_runtime_ms = 200;
        config.n_steps = 50;
        config.sleep_ms = 10;
        let err = run_rule(program, &sample_patches(), &empty_metadata(), config, LogMode::Drop)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));
    }

    #[tokio::test]
    async fn captured_console_logs_are_returned_in_order() {
        let program = r#"
            function main(patches, metadata) {
                console.log("first");
                console.warn("second");
                return true;
            }
        "#;
        let record = run_rule(
            program,
            &sample_patches(),
            &empty_metadata(),
            EngineConfig::default(),
            LogMode::Capture,
        )
        .await
        .unwrap();
        assert_eq!(record.logs.len(), 2);
        assert_eq!(record.logs[0].message, "first");
        assert_eq!(record.logs[1].level, "warn");
    }

    #[tokio::test]
    async fn non_boolean_main_result_is_rejected() {
        let program = r#"
            function main(patches, metadata) {
                return "yes";
            }
        "#;
        let err = run_rule(program, &sample_patches(), &empty_metadata(), EngineConfig::default(), LogMode::Drop)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NonBooleanResult(_)));
    }
}
