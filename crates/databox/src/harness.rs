//! Generated interpreter harness.
//!
//! The harness is the Python program the sandboxed child actually runs. It is
//! rendered per request and embodies the execution-environment contract:
//!
//! - the script sees exactly `df` (the dataset), `pd` (tabular capability),
//!   `plt` (rendering capability), the pre-declared output slots, and an
//!   allowlisted builtins set - nothing else, no ambient namespace;
//! - a wall-clock alarm raises a cancellation exception inside the script and
//!   is disarmed on every exit path (the supervising process still holds the
//!   SIGKILL deadline as the authoritative layer);
//! - after the script returns, raises, or times out, the slots are inspected
//!   in priority order (first dataframe wins, capped at [`ROW_CAP`] rows) and
//!   open figures are rasterized to the scratch charts directory in creation
//!   order;
//! - the outcome is written as `report.json`, never to stdout, so the
//!   script's own console output stays clean.
//!
//! Script exceptions are reported with a depth-bounded description (exception
//! text plus the last few script lines) - host paths and interpreter
//! internals never leak into the diagnostic.

/// Result tables are truncated to this many rows.
pub const ROW_CAP: usize = 200;

const TEMPLATE: &str = r##"# Generated analysis runner. Argv: dataset, script, report, charts dir.
import json
import signal
import sys
import traceback

import builtins as _builtins
import pandas as pd
import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt

WALL_SECONDS = @WALL_SECONDS@
ROW_CAP = @ROW_CAP@
OUTPUT_SLOTS = @OUTPUT_SLOTS@
FRAME_DEPTH = 3

_ALLOWED_BUILTINS = (
    "abs", "all", "any", "bool", "dict", "divmod", "enumerate", "filter",
    "float", "format", "frozenset", "int", "isinstance", "len", "list",
    "map", "max", "min", "print", "range", "repr", "reversed", "round",
    "set", "sorted", "str", "sum", "tuple", "zip",
    "Exception", "ArithmeticError", "IndexError", "KeyError",
    "StopIteration", "TypeError", "ValueError", "ZeroDivisionError",
)
SAFE_BUILTINS = {name: getattr(_builtins, name) for name in _ALLOWED_BUILTINS}


def _capabilities(dataset_path):
    env = {
        "__builtins__": SAFE_BUILTINS,
        "pd": pd,
        "plt": plt,
        "df": pd.read_csv(dataset_path),
    }
    for name in OUTPUT_SLOTS:
        env[name] = None
    return env


def _alarm_handler(signum, frame):
    raise TimeoutError("Execution exceeded the time limit")


def _describe(exc):
    frames = [
        f for f in traceback.extract_tb(exc.__traceback__)
        if f.filename == "<script>"
    ]
    lines = [
        "line {}: {}".format(f.lineno, (f.line or "").strip())
        for f in frames[-FRAME_DEPTH:]
    ]
    head = "".join(traceback.format_exception_only(type(exc), exc)).strip()
    if lines:
        return head + "\n" + "\n".join(lines)
    return head


def _extract_table(env):
    for name in OUTPUT_SLOTS:
        obj = env.get(name)
        if isinstance(obj, pd.DataFrame):
            sample = obj.head(ROW_CAP)
            table = json.loads(sample.to_json(orient="records", date_format="iso"))
            columns = [str(c) for c in sample.columns]
            return table, columns
    return None, None


def _save_figures(charts_dir):
    saved = 0
    for num in plt.get_fignums():
        fig = plt.figure(num)
        try:
            fig.savefig(
                "{}/fig_{:04d}.png".format(charts_dir, saved + 1),
                format="png",
                bbox_inches="tight",
            )
            saved += 1
        except Exception:
            pass
        finally:
            plt.close(fig)
    return saved


def main():
    dataset_path, script_path, report_path, charts_dir = sys.argv[1:5]
    with open(script_path) as fh:
        code = fh.read()

    report = {
        "status": "completed",
        "error": None,
        "table": None,
        "columns": None,
        "figures": 0,
    }

    env = None
    signal.signal(signal.SIGALRM, _alarm_handler)
    signal.alarm(WALL_SECONDS)
    try:
        env = _capabilities(dataset_path)
        exec(compile(code, "<script>", "exec"), env, env)
    except TimeoutError as exc:
        report["status"] = "timeout"
        report["error"] = {"kind": "timeout", "message": str(exc)}
    except MemoryError:
        report["status"] = "error"
        report["error"] = {
            "kind": "memory",
            "message": "Execution exceeded the memory limit",
        }
    except BaseException as exc:
        report["status"] = "error"
        report["error"] = {"kind": "exception", "message": _describe(exc)}
    finally:
        signal.alarm(0)

    if env is not None:
        try:
            table, columns = _extract_table(env)
            report["table"] = table
            report["columns"] = columns
        except Exception:
            pass
        try:
            report["figures"] = _save_figures(charts_dir)
        except Exception:
            pass

    try:
        payload = json.dumps(report, allow_nan=False, default=str)
    except ValueError:
        report["table"] = None
        report["columns"] = None
        payload = json.dumps(report, allow_nan=False, default=str)
    with open(report_path, "w") as fh:
        fh.write(payload)


if __name__ == "__main__":
    main()
"##;

/// Render the harness for one request.
pub fn render(wall_seconds: u64, output_slots: &[String]) -> String {
    TEMPLATE
        .replace("@WALL_SECONDS@", &wall_seconds.to_string())
        .replace("@ROW_CAP@", &ROW_CAP.to_string())
        .replace("@OUTPUT_SLOTS@", &python_list(output_slots))
}

/// Render a slot-name list as a Python tuple literal. Names that are not
/// plain identifiers are dropped - they could never be assigned by a script
/// anyway, and interpolating them would corrupt the generated source.
fn python_list(slots: &[String]) -> String {
    let safe: Vec<String> = slots
        .iter()
        .filter(|s| {
            let valid = is_identifier(s);
            if !valid {
                tracing::warn!(slot = %s, "dropping non-identifier output slot");
            }
            valid
        })
        .map(|s| format!("\"{s}\""))
        .collect();
    if safe.is_empty() {
        return "()".to_string();
    }
    format!("({},)", safe.join(", "))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
