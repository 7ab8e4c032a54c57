use autopilot_sync::{load_report, CycleReport};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::Workspace;

pub fn execute(ws: &Workspace, json: bool) -> anyhow::Result<()> {
    let Some(report) = load_report(&ws.paths)? else {
        println!("No cycle recorded yet.");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print!("{}", render(&report, OffsetDateTime::now_utc()));
    Ok(())
}

fn render(report: &CycleReport, now: OffsetDateTime) -> String {
    let mut out = format!("Repository: {}\n", report.root);
    let age = age_label(&report.finished_at, now)
        .map(|a| format!(" ({a})"))
        .unwrap_or_default();
    out.push_str(&format!("Last cycle: {}{age}\n", report.finished_at));
    out.push_str(&format!("Result:     {}\n", report.result));
    out.push_str(&format!(
        "Assistant:  {}\n",
        if report.assistant { "yes" } else { "no" }
    ));
    if !report.resolved.is_empty() {
        out.push_str(&format!("Resolved:   {}\n", report.resolved.join(", ")));
    }
    for c in &report.commits {
        out.push_str(&format!("  {c}\n"));
    }
    out
}

/// "42s ago", "5m ago", "3h ago" or "2d ago"; `None` for an unparsable stamp.
fn age_label(stamp: &str, now: OffsetDateTime) -> Option<String> {
    let then = OffsetDateTime::parse(stamp, &Rfc3339).ok()?;
    let secs = (now - then).whole_seconds().max(0);
    Some(match secs {
        s if s < 60 => format!("{s}s ago"),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86_400),
    })
}
