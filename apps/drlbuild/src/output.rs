//! Output rendering for build, problems and runtime commands.
//!
//! Supports `human` (default) and `json` outputs. The JSON form includes
//! per-artifact diagnostics and a top-level summary; unknown lines appear
//! as `-1`.

use crate::models::runtime::Runtime;
use crate::models::{BuildResult, Diagnostic};
use crate::store::ProblemList;
use crate::utils::{location, use_colors};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;

fn print_json(value: &JsonVal) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => log::warn!("cannot render JSON output: {}", e),
    }
}

fn print_diagnostic(file: &str, d: &Diagnostic, color: bool) {
    let loc = location(file, d.line);
    if color {
        println!("{} {} {} {}", "✖".red(), "⟦error⟧".red().bold(), loc.bold(), d.message);
    } else {
        println!("✖ ⟦error⟧ {} {}", loc, d.message);
    }
}

/// Print build results in the requested format.
pub fn print_build(res: &BuildResult, output: &str) {
    match output {
        "json" => print_json(&compose_build_json(res)),
        _ => {
            let color = use_colors(output);
            for a in &res.artifacts {
                if a.removed {
                    if color {
                        println!("{} {}", "removed:".bright_black(), a.artifact);
                    } else {
                        println!("removed: {}", a.artifact);
                    }
                    continue;
                }
                for d in &a.diagnostics {
                    print_diagnostic(&a.artifact, d, color);
                }
            }
            let mut summary = format!(
                "— Summary — errors={} artifacts={} removed={}",
                res.summary.errors, res.summary.artifacts, res.summary.removed
            );
            if res.summary.cancelled {
                summary.push_str(" (cancelled)");
            }
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

/// Print the stored problem list.
pub fn print_problems(list: &ProblemList, output: &str) {
    match output {
        "json" => print_json(&compose_problems_json(list)),
        _ => {
            let color = use_colors(output);
            let artifacts = list.artifacts();
            for a in &artifacts {
                for d in list.problems(a) {
                    print_diagnostic(a, &d, color);
                }
            }
            let summary = format!(
                "— Problems — errors={} artifacts={}",
                list.error_count(),
                artifacts.len()
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

/// Print configured runtimes, marking the effective one.
pub fn print_runtimes(runtimes: &[Runtime], effective: Option<&Runtime>, output: &str) {
    match output {
        "json" => print_json(&compose_runtimes_json(runtimes, effective)),
        _ => {
            let color = use_colors(output);
            if runtimes.is_empty() {
                println!("no runtimes configured");
            }
            for rt in runtimes {
                let mark = if effective.is_some_and(|e| e.name == rt.name) {
                    "*"
                } else {
                    " "
                };
                let product = rt.product.as_deref().unwrap_or("-");
                let path = rt.path.as_deref().unwrap_or("-");
                if color {
                    println!(
                        "{} {} {} ({}) {} jars={}",
                        mark.green().bold(),
                        rt.name.bold(),
                        rt.version,
                        product,
                        path,
                        rt.jars.len()
                    );
                } else {
                    println!(
                        "{} {} {} ({}) {} jars={}",
                        mark,
                        rt.name,
                        rt.version,
                        product,
                        path,
                        rt.jars.len()
                    );
                }
            }
        }
    }
}

/// Compose build JSON object (pure) for testing purposes.
pub fn compose_build_json(res: &BuildResult) -> JsonVal {
    serde_json::to_value(res).unwrap_or(JsonVal::Null)
}

/// Compose problem list JSON object (pure) for testing purposes.
pub fn compose_problems_json(list: &ProblemList) -> JsonVal {
    let artifacts = list.artifacts();
    let items: Vec<_> = artifacts
        .iter()
        .map(|a| {
            json!({
                "artifact": a,
                "diagnostics": list.problems(a),
            })
        })
        .collect();
    json!({
        "category": list.category(),
        "problems": items,
        "summary": {
            "errors": list.error_count(),
            "artifacts": artifacts.len(),
        },
    })
}

/// Compose runtimes JSON object (pure) for testing purposes.
pub fn compose_runtimes_json(runtimes: &[Runtime], effective: Option<&Runtime>) -> JsonVal {
    json!({
        "runtimes": runtimes,
        "effective": effective.map(|r| r.name.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactKind, ArtifactReport};
    use crate::store::{ProblemStore, DEFAULT_CATEGORY};

    #[test]
    fn test_compose_build_json_shape() {
        let mut res = BuildResult::default();
        res.push(ArtifactReport {
            artifact: "rules/a.drl".into(),
            kind: Some(ArtifactKind::RuleText),
            diagnostics: vec![Diagnostic::error("bad", None)],
            removed: false,
        });
        let out = compose_build_json(&res);
        assert_eq!(out["summary"]["errors"], 1);
        assert_eq!(out["summary"]["cancelled"], false);
        assert_eq!(out["artifacts"][0]["kind"], "rule-text");
        assert_eq!(out["artifacts"][0]["diagnostics"][0]["line"], -1);
        assert_eq!(out["artifacts"][0]["diagnostics"][0]["severity"], "error");
    }

    #[test]
    fn test_compose_problems_json_shape() {
        let mut list = ProblemList::new(DEFAULT_CATEGORY);
        list.add("b.xls", &Diagnostic::error("x", Some(3))).unwrap();
        list.add("a.drl", &Diagnostic::error("y", None)).unwrap();
        let out = compose_problems_json(&list);
        assert_eq!(out["category"], DEFAULT_CATEGORY);
        assert_eq!(out["summary"]["errors"], 2);
        assert_eq!(out["problems"][0]["artifact"], "a.drl");
        assert_eq!(out["problems"][1]["diagnostics"][0]["line"], 3);
    }

    #[test]
    fn test_compose_runtimes_json_marks_effective() {
        let rts = vec![Runtime {
            name: "drools-7".into(),
            version: "7.74.1".into(),
            default: true,
            ..Default::default()
        }];
        let out = compose_runtimes_json(&rts, rts.first());
        assert_eq!(out["effective"], "drools-7");
        assert_eq!(out["runtimes"][0]["version"], "7.74.1");
        let none = compose_runtimes_json(&[], None);
        assert!(none["effective"].is_null());
    }
}
