use std::fmt::Write;

use common::SymbolOutcome;

use crate::batch::RunReport;

/// Human-readable run summary: header, counts, one block per symbol in
/// input order, then any execution results.
pub fn format_summary(report: &RunReport) -> String {
    let counts = report.batch.counts();
    let mut out = String::new();

    let _ = writeln!(out, "Trading signals for {}", report.started_at.format("%Y-%m-%d"));
    let _ = writeln!(
        out,
        "BUY {} | SELL {} | HOLD {} | FAILED {}",
        counts.buy, counts.sell, counts.hold, counts.failed
    );

    for outcome in report.batch.iter() {
        out.push('\n');
        match outcome {
            SymbolOutcome::Succeeded(decision) => {
                let _ = writeln!(out, "{}: {} ({})", decision.symbol, decision.action, decision.method);
                for signal in &decision.signals {
                    let _ = write!(
                        out,
                        "  - {}: {} {:.2}",
                        signal.strategy(),
                        signal.action(),
                        signal.strength()
                    );
                    match signal.rationale() {
                        Some(rationale) => {
                            let _ = writeln!(out, " ({rationale})");
                        }
                        None => out.push('\n'),
                    }
                }
                for failure in &decision.ignored {
                    let _ = writeln!(out, "  - {}: skipped ({})", failure.strategy, failure.reason);
                }
            }
            SymbolOutcome::Failed { symbol, error } => {
                let _ = writeln!(out, "{symbol}: FAILED ({error})");
            }
        }
    }

    if !report.executions.is_empty() {
        out.push_str("\nOrders:\n");
        for exec in &report.executions {
            let _ = write!(out, "  - {} {} {}", exec.side, exec.quantity, exec.symbol);
            match &exec.result {
                Ok(fill) => match fill.fill_price {
                    Some(price) => {
                        let _ = writeln!(out, " filled @ {price:.2}");
                    }
                    None => out.push_str(" accepted\n"),
                },
                Err(e) => {
                    let _ = writeln!(out, " rejected: {e}");
                }
            }
        }
    }

    out.trim_end().to_string()
}
