use autopilot_sync::preview_groups;

use crate::Workspace;

pub fn execute(ws: &Workspace, json: bool) -> anyhow::Result<()> {
    let assistant = ws.assistant();
    let grouping = preview_groups(&ws.gw, crate::as_dyn(&assistant), &ws.settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&grouping.groups)?);
        return Ok(());
    }

    if grouping.groups.is_empty() {
        println!("No local changes.");
        return Ok(());
    }
    println!(
        "{} commit(s) planned ({:?} grouping):",
        grouping.groups.len(),
        grouping.source
    );
    for (i, group) in grouping.groups.iter().enumerate() {
        println!("  [{}] {}", i + 1, group.message);
        for f in &group.files {
            println!("        {f}");
        }
    }
    Ok(())
}
